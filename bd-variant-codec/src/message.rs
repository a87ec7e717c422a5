// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./message_test.rs"]
mod message_test;

use crate::decoder::decode;
use crate::encoder::{encode_as_array, encode_as_array_in_place};
use crate::error::{Error, MalformedReason, Result};
use crate::marshal::SizeCache;
use crate::value::Value;
use serde::{Serialize, Serializer};
use std::fmt;

/// Initial capacity of the buffer allocated by [`Marshal::marshal`].
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Field number the wrapping array is written under.
pub const MESSAGE_FIELD_NUMBER: u32 = 1;

/// A type that can be written to and read from the variant wire format.
pub trait Marshal {
  /// Encodes into a newly allocated buffer.
  fn marshal(&self) -> Result<Vec<u8>>;

  /// Encodes into the start of `destination` and returns the number of bytes written. A call
  /// preceded by [`Marshal::size`] with a destination of exactly that size reuses the encoding
  /// produced by `size`.
  fn marshal_to(&mut self, destination: &mut [u8]) -> Result<usize>;

  /// Replaces the contents of `self` with the decoded `data`.
  fn unmarshal(&mut self, data: &[u8]) -> Result<()>;

  /// Returns the encoded size, or [`crate::INVALID_SIZE`] if the contents cannot be encoded.
  fn size(&mut self) -> usize;
}

//
// ValueMessage
//

/// Wraps a single [`Value`]. On the wire the value is the only element of an array written under
/// [`MESSAGE_FIELD_NUMBER`].
#[derive(Debug, Default)]
pub struct ValueMessage {
  pub value: Value,
  cache: SizeCache,
}

impl ValueMessage {
  #[must_use]
  pub fn new(value: impl Into<Value>) -> Self {
    Self {
      value: value.into(),
      cache: SizeCache::new(),
    }
  }

  #[must_use]
  pub fn into_value(self) -> Value {
    self.value
  }

  /// Renders the wrapped value as JSON text.
  pub fn to_json(&self) -> Result<Vec<u8>> {
    self.value.to_json_vec()
  }

  /// Parses JSON text. Numbers are kept in their textual form so no precision is lost.
  pub fn from_json(data: &[u8]) -> Result<Self> {
    let json: serde_json::Value = serde_json::from_slice(data).map_err(|e| Error::Malformed {
      offset: 0,
      depth: 0,
      reason: MalformedReason::InvalidJson(e.to_string()),
    })?;
    Ok(Self::new(Value::from_json(json)))
  }
}

impl Marshal for ValueMessage {
  fn marshal(&self) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(DEFAULT_BUFFER_SIZE);
    encode_as_array(&mut buffer, MESSAGE_FIELD_NUMBER, &self.value)?;
    Ok(buffer)
  }

  fn marshal_to(&mut self, destination: &mut [u8]) -> Result<usize> {
    let value = &self.value;
    self.cache.marshal_into_with(destination, |destination| {
      encode_as_array_in_place(destination, MESSAGE_FIELD_NUMBER, value)
    })
  }

  fn unmarshal(&mut self, data: &[u8]) -> Result<()> {
    let (_, decoded) = decode(data)?;
    let malformed = |reason| Error::Malformed {
      offset: 0,
      depth: 0,
      reason,
    };

    let Value::Array(mut elements) = decoded else {
      return Err(malformed(MalformedReason::NotAnArray));
    };
    if elements.len() != 1 {
      return Err(malformed(MalformedReason::NotSingleElement(elements.len())));
    }

    self.value = elements.swap_remove(0);
    self.cache = SizeCache::new();
    Ok(())
  }

  fn size(&mut self) -> usize {
    let value = &self.value;
    self
      .cache
      .size_with(|buffer| encode_as_array(buffer, MESSAGE_FIELD_NUMBER, value))
  }
}

impl From<Value> for ValueMessage {
  fn from(value: Value) -> Self {
    Self::new(value)
  }
}

impl Serialize for ValueMessage {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    self.value.serialize(serializer)
  }
}

impl fmt::Display for ValueMessage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match serde_json::to_string(&self.value) {
      Ok(json) => f.write_str(&json),
      Err(e) => write!(f, "<{e}>"),
    }
  }
}
