// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Frame level reading and writing on top of the protobuf coded streams.
//!
//! [`WireWriter`] tracks how many bytes it has produced. When it writes into a fixed slice, the
//! size of every frame is computed up front and checked against the remaining room, so a short
//! destination is reported as [`Error::InsufficientCapacity`] before any byte of the frame is
//! written.
//!
//! [`WireReader`] is a cursor over a borrowed buffer. Each read runs a short lived
//! `CodedInputStream` over the remaining bytes and advances by however much the stream consumed,
//! which keeps byte offsets available for error reporting and lets callers slice the input.

use crate::error::{Error, MalformedReason, Result};
use protobuf::rt::WireType;
use protobuf::{CodedInputStream, CodedOutputStream};

/// Largest field number representable in a protobuf tag.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

pub(crate) fn check_field_number(field_number: u32) -> Result<()> {
  if field_number == 0 || field_number > MAX_FIELD_NUMBER {
    return Err(Error::InvalidFieldNumber(field_number));
  }
  Ok(())
}

#[allow(clippy::cast_possible_truncation)]
const fn to_usize(size: u64) -> usize {
  size as usize
}

//
// WireWriter
//

pub(crate) struct WireWriter<'a> {
  os: CodedOutputStream<'a>,
  written: usize,
  capacity: Option<usize>,
}

impl<'a> WireWriter<'a> {
  /// Appends to the end of `buffer`, growing it as needed.
  pub fn growable(buffer: &'a mut Vec<u8>) -> Self {
    Self {
      os: CodedOutputStream::vec(buffer),
      written: 0,
      capacity: None,
    }
  }

  /// Writes from the start of `buffer` and never past its end.
  pub fn bounded(buffer: &'a mut [u8]) -> Self {
    let capacity = buffer.len();
    Self {
      os: CodedOutputStream::bytes(buffer),
      written: 0,
      capacity: Some(capacity),
    }
  }

  pub const fn written(&self) -> usize {
    self.written
  }

  fn reserve(&self, frame_size: u64) -> Result<usize> {
    let frame_size = to_usize(frame_size);
    if let Some(capacity) = self.capacity {
      let required = self.written.saturating_add(frame_size);
      if required > capacity {
        return Err(Error::InsufficientCapacity { capacity, required });
      }
    }
    Ok(frame_size)
  }

  pub fn write_tag(&mut self, field_number: u32, wire_type: WireType) -> Result<()> {
    let size = self.reserve(protobuf::rt::tag_size(field_number))?;
    self.os.write_tag(field_number, wire_type)?;
    self.written += size;
    Ok(())
  }

  pub fn write_varint(&mut self, field_number: u32, value: u64) -> Result<()> {
    let size = self.reserve(protobuf::rt::uint64_size(field_number, value))?;
    self.os.write_uint64(field_number, value)?;
    self.written += size;
    Ok(())
  }

  pub fn write_fixed32(&mut self, field_number: u32, value: u32) -> Result<()> {
    let size = self.reserve(protobuf::rt::tag_size(field_number) + 4)?;
    self.os.write_fixed32(field_number, value)?;
    self.written += size;
    Ok(())
  }

  pub fn write_fixed64(&mut self, field_number: u32, value: u64) -> Result<()> {
    let size = self.reserve(protobuf::rt::tag_size(field_number) + 8)?;
    self.os.write_fixed64(field_number, value)?;
    self.written += size;
    Ok(())
  }

  pub fn write_bytes(&mut self, field_number: u32, bytes: &[u8]) -> Result<()> {
    let size = self.reserve(protobuf::rt::bytes_size(field_number, bytes))?;
    self.os.write_bytes(field_number, bytes)?;
    self.written += size;
    Ok(())
  }

  pub fn flush(&mut self) -> Result<()> {
    self.os.flush()?;
    Ok(())
  }
}

//
// WireReader
//

#[derive(Clone)]
pub(crate) struct WireReader<'a> {
  data: &'a [u8],
  position: usize,
}

impl<'a> WireReader<'a> {
  pub const fn new(data: &'a [u8]) -> Self {
    Self { data, position: 0 }
  }

  pub const fn position(&self) -> usize {
    self.position
  }

  pub fn remaining(&self) -> &'a [u8] {
    let data = self.data;
    &data[self.position ..]
  }

  pub const fn advance(&mut self, count: usize) {
    self.position += count;
  }

  pub const fn is_empty(&self) -> bool {
    self.position >= self.data.len()
  }

  // Runs `read` over the remaining input and advances past whatever it consumed.
  fn stream<T>(
    &mut self,
    read: impl FnOnce(&mut CodedInputStream<'_>) -> protobuf::Result<T>,
  ) -> std::result::Result<T, MalformedReason> {
    let remaining = self.remaining();
    let mut is = CodedInputStream::from_bytes(remaining);
    let value = read(&mut is).map_err(|e| MalformedReason::Wire(e.to_string()))?;
    self.position += to_usize(is.pos());
    Ok(value)
  }

  pub fn read_tag(&mut self) -> std::result::Result<(u32, WireType), MalformedReason> {
    if self.is_empty() {
      return Err(MalformedReason::Truncated);
    }
    let raw = self.read_varint()?;
    let field_number = u32::try_from(raw >> 3)
      .ok()
      .filter(|field_number| (1 ..= MAX_FIELD_NUMBER).contains(field_number))
      .ok_or(MalformedReason::InvalidFieldNumber(raw >> 3))?;
    let wire_type = u32::try_from(raw & 7)
      .ok()
      .and_then(WireType::new)
      .ok_or(MalformedReason::InvalidWireType(raw & 7))?;
    Ok((field_number, wire_type))
  }

  /// Reads the next tag without consuming it. Returns the tag and its encoded length.
  pub fn peek_tag(&self) -> std::result::Result<(u32, WireType, usize), MalformedReason> {
    let mut peek = self.clone();
    let (field_number, wire_type) = peek.read_tag()?;
    Ok((field_number, wire_type, peek.position - self.position))
  }

  pub fn read_varint(&mut self) -> std::result::Result<u64, MalformedReason> {
    self.stream(|is| is.read_raw_varint64())
  }

  pub fn read_fixed32(&mut self) -> std::result::Result<u32, MalformedReason> {
    self.stream(|is| is.read_fixed32())
  }

  pub fn read_fixed64(&mut self) -> std::result::Result<u64, MalformedReason> {
    self.stream(|is| is.read_fixed64())
  }

  /// Reads a length prefix and returns the payload as a slice of the input without copying.
  pub fn read_length_delimited(&mut self) -> std::result::Result<&'a [u8], MalformedReason> {
    let length = self.read_varint()?;
    let remaining = self.remaining();
    let length = usize::try_from(length).map_err(|_| MalformedReason::Truncated)?;
    if length > remaining.len() {
      return Err(MalformedReason::Truncated);
    }
    self.position += length;
    Ok(&remaining[.. length])
  }

  /// Skips the payload of a frame whose tag has already been read. Group tags carry no payload.
  pub fn skip_payload(&mut self, wire_type: WireType) -> std::result::Result<(), MalformedReason> {
    match wire_type {
      WireType::Varint => self.read_varint().map(|_| ()),
      WireType::Fixed32 => self.read_fixed32().map(|_| ()),
      WireType::Fixed64 => self.read_fixed64().map(|_| ()),
      WireType::LengthDelimited => self.read_length_delimited().map(|_| ()),
      WireType::StartGroup | WireType::EndGroup => Ok(()),
    }
  }
}
