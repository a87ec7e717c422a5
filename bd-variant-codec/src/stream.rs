// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Incremental writing and partial reading of group framed arrays.
//!
//! A table is an outer array whose elements are rows. It can be produced either by encoding a
//! `Value::Array` of rows in one call, or by framing it by hand:
//!
//! ```text
//! append_array_start(buf, 1)
//! encode(buf, 1, row_1)
//! ...
//! encode(buf, n, row_n)
//! append_array_end(buf, 1)
//! ```
//!
//! Both produce identical bytes. On the read side [`read_array_envelope`] finds the extent of an
//! array by walking frame headers only, and [`rows`] / [`for_each_row`] decode one row at a time.

#[cfg(test)]
#[path = "./stream_test.rs"]
mod stream_test;

use crate::decoder::Decoder;
use crate::error::{Error, MalformedReason, Result};
use crate::value::Value;
use crate::wire::{WireReader, WireWriter, check_field_number};
use protobuf::rt::WireType;

/// Opens an array under `field_number`. Elements appended after it must use field numbers 1..N in
/// order, and the array must be closed with [`append_array_end`] using the same field number.
pub fn append_array_start(buffer: &mut Vec<u8>, field_number: u32) -> Result<()> {
  append_group_tag(buffer, field_number, WireType::StartGroup)
}

pub fn append_array_end(buffer: &mut Vec<u8>, field_number: u32) -> Result<()> {
  append_group_tag(buffer, field_number, WireType::EndGroup)
}

fn append_group_tag(buffer: &mut Vec<u8>, field_number: u32, wire_type: WireType) -> Result<()> {
  check_field_number(field_number)?;
  let mut writer = WireWriter::growable(buffer);
  writer.write_tag(field_number, wire_type)?;
  writer.flush()
}

//
// ArrayEnvelope
//

/// The byte extent of one encoded array, located without decoding any of its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayEnvelope<'a> {
  bytes: &'a [u8],
  header_len: usize,
  trailer_len: usize,
  rest: &'a [u8],
  field_number: u32,
}

impl<'a> ArrayEnvelope<'a> {
  /// The whole array including its start and end group tags.
  #[must_use]
  pub const fn bytes(&self) -> &'a [u8] {
    self.bytes
  }

  /// Length of the start group tag at the front of `bytes`.
  #[must_use]
  pub const fn header_len(&self) -> usize {
    self.header_len
  }

  /// Input following the array.
  #[must_use]
  pub const fn rest(&self) -> &'a [u8] {
    self.rest
  }

  #[must_use]
  pub const fn field_number(&self) -> u32 {
    self.field_number
  }

  /// The encoded elements, without the group tags.
  #[must_use]
  pub fn body(&self) -> &'a [u8] {
    let bytes = self.bytes;
    &bytes[self.header_len .. bytes.len() - self.trailer_len]
  }

  /// Fully decodes the array.
  pub fn decode(&self) -> Result<Value> {
    Decoder::new(self.bytes).decode()
  }
}

/// Locates the array at the front of `buffer`. Fails if the next frame is not a start group or if
/// the group is not properly closed. Nested groups are tracked with an explicit stack, so deeply
/// nested input costs memory rather than stack.
pub fn read_array_envelope(buffer: &[u8]) -> Result<ArrayEnvelope<'_>> {
  let malformed = |offset, depth, reason| Error::Malformed {
    offset,
    depth,
    reason,
  };

  let mut reader = WireReader::new(buffer);
  let (field_number, wire_type) = reader.read_tag().map_err(|r| malformed(0, 0, r))?;
  if wire_type != WireType::StartGroup {
    return Err(malformed(0, 0, MalformedReason::NotAnArray));
  }
  let header_len = reader.position();

  let mut open = vec![field_number];
  let mut trailer_len = 0;
  while let Some(&innermost) = open.last() {
    let offset = reader.position();
    let depth = open.len();
    if reader.is_empty() {
      return Err(malformed(
        offset,
        depth,
        MalformedReason::UnterminatedGroup(innermost),
      ));
    }

    let (next_field, next_wire_type) = reader.read_tag().map_err(|r| malformed(offset, depth, r))?;
    match next_wire_type {
      WireType::StartGroup => open.push(next_field),
      WireType::EndGroup => {
        if next_field != innermost {
          return Err(malformed(
            offset,
            depth,
            MalformedReason::UnbalancedGroup {
              expected: innermost,
              found: next_field,
            },
          ));
        }
        open.pop();
        trailer_len = reader.position() - offset;
      },
      other => reader
        .skip_payload(other)
        .map_err(|r| malformed(offset, depth, r))?,
    }
  }

  let end = reader.position();
  Ok(ArrayEnvelope {
    bytes: &buffer[.. end],
    header_len,
    trailer_len,
    rest: &buffer[end ..],
    field_number,
  })
}

//
// Rows
//

/// One row of a table. A row that was encoded as a single non-array value has one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  pub field_number: u32,
  pub columns: Vec<Value>,
}

/// Iterator over the rows of a table, decoding one row per step. Stops after the first error.
pub struct Rows<'a> {
  decoder: Decoder<'a>,
  end: usize,
  index: usize,
  failed: bool,
}

/// Reads the table at the front of `buffer`. Only the outer envelope is validated up front; each
/// row is decoded when the iterator reaches it. Input after the table is not read.
pub fn rows(buffer: &[u8]) -> Result<Rows<'_>> {
  let envelope = read_array_envelope(buffer)?;
  let mut decoder = Decoder::new(envelope.bytes()).nested_at(1);
  decoder.skip(envelope.header_len());
  Ok(Rows {
    decoder,
    end: envelope.bytes().len() - envelope.trailer_len,
    index: 0,
    failed: false,
  })
}

impl Iterator for Rows<'_> {
  type Item = Result<Row>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed || self.decoder.position() >= self.end {
      return None;
    }

    let index = self.index;
    self.index += 1;
    match self.decoder.decode_with_field() {
      Ok((field_number, Value::Array(columns))) => Some(Ok(Row {
        field_number,
        columns,
      })),
      Ok((field_number, value)) => Some(Ok(Row {
        field_number,
        columns: vec![value],
      })),
      Err(e) => {
        self.failed = true;
        Some(Err(Error::row(index, e)))
      },
    }
  }
}

/// Invokes `callback` with the field number and columns of every row of the table at the front of
/// `buffer`, in encoded order. The first error, from decoding or from the callback, stops the
/// iteration and is returned annotated with the 0-based index of the row.
pub fn for_each_row(
  buffer: &[u8],
  mut callback: impl FnMut(u32, Vec<Value>) -> anyhow::Result<()>,
) -> Result<()> {
  for (index, row) in rows(buffer)?.enumerate() {
    let row = row?;
    log::trace!("visiting row {index} (field {})", row.field_number);
    callback(row.field_number, row.columns).map_err(|e| {
      log::debug!("row callback failed on row {index}: {e}");
      Error::row(index, Error::Callback(e))
    })?;
  }
  Ok(())
}
