// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./marshal_test.rs"]
mod marshal_test;

use crate::Result;
use crate::encoder::{encode, encode_in_place};
use crate::value::Value;

/// Returned by [`SizeCache::size`] when the value cannot be encoded. No valid encoding is empty.
pub const INVALID_SIZE: usize = 0;

/// Supports the size-then-fill marshaling pattern, where a caller asks for the encoded size,
/// allocates a destination of exactly that size and then asks for it to be filled.
///
/// The exact size is only known after encoding, so `size` keeps the encoding it produced and a
/// following `marshal_into` with a destination of that length copies it instead of encoding
/// again. The cache is single use. A `SizeCache` must not be shared between values.
#[derive(Debug, Default)]
pub struct SizeCache {
  cached: Option<Vec<u8>>,
}

impl SizeCache {
  #[must_use]
  pub const fn new() -> Self {
    Self { cached: None }
  }

  /// Encodes `value` and returns the length of the encoding, or [`INVALID_SIZE`] if it cannot be
  /// encoded.
  pub fn size(&mut self, field_number: u32, value: &Value) -> usize {
    self.size_with(|buffer| encode(buffer, field_number, value))
  }

  /// Fills the start of `destination` with the encoding of `value` and returns the number of
  /// bytes written. `destination` is never grown; if the encoding does not fit this fails with
  /// `Error::InsufficientCapacity`.
  pub fn marshal_into(
    &mut self,
    destination: &mut [u8],
    field_number: u32,
    value: &Value,
  ) -> Result<usize> {
    self.marshal_into_with(destination, |destination| {
      encode_in_place(destination, field_number, value)
    })
  }

  pub(crate) fn size_with(&mut self, encode: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> usize {
    let mut encoded = Vec::new();
    match encode(&mut encoded) {
      Ok(()) => {
        let size = encoded.len();
        self.cached = Some(encoded);
        size
      },
      Err(e) => {
        log::warn!("failed to size value: {e}");
        self.cached = None;
        INVALID_SIZE
      },
    }
  }

  pub(crate) fn marshal_into_with(
    &mut self,
    destination: &mut [u8],
    encode_in_place: impl FnOnce(&mut [u8]) -> Result<usize>,
  ) -> Result<usize> {
    if let Some(cached) = self.cached.take_if(|cached| cached.len() == destination.len()) {
      destination.copy_from_slice(&cached);
      return Ok(cached.len());
    }

    encode_in_place(destination)
  }

  /// Whether an encoding from a previous `size` call is waiting to be used.
  #[must_use]
  pub const fn is_cached(&self) -> bool {
    self.cached.is_some()
  }
}
