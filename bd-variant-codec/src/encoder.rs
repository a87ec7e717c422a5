// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./encoder_test.rs"]
mod encoder_test;

use crate::error::{Error, Result};
use crate::type_codes::{TypeCode, write_type_tag};
use crate::value::Value;
use crate::wire::{WireWriter, check_field_number};
use protobuf::rt::WireType;

/// An encoder that owns a reusable output buffer.
pub struct Encoder {
  buffer: Vec<u8>,
}

impl Encoder {
  #[must_use]
  pub const fn new() -> Self {
    Self { buffer: Vec::new() }
  }

  #[must_use]
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      buffer: Vec::with_capacity(capacity),
    }
  }

  /// Encodes `value` under `field_number`, replacing anything previously held by the encoder.
  pub fn encode(&mut self, field_number: u32, value: &Value) -> Result<&[u8]> {
    self.buffer.clear();
    encode(&mut self.buffer, field_number, value)?;
    log::trace!(
      "encoded field {field_number} into {} bytes",
      self.buffer.len()
    );
    Ok(&self.buffer)
  }

  /// Appends `value` after whatever the encoder already holds.
  pub fn append(&mut self, field_number: u32, value: &Value) -> Result<()> {
    encode(&mut self.buffer, field_number, value)
  }

  #[must_use]
  pub fn buffer(&self) -> &[u8] {
    &self.buffer
  }

  #[must_use]
  pub fn into_inner(self) -> Vec<u8> {
    self.buffer
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }
}

impl Default for Encoder {
  fn default() -> Self {
    Self::new()
  }
}

/// Appends the encoding of `value` under `field_number` to `buffer`. On failure `buffer` is left
/// as it was before the call.
pub fn encode(buffer: &mut Vec<u8>, field_number: u32, value: &Value) -> Result<()> {
  append_with(buffer, |writer| write_value(writer, field_number, value))
}

pub fn encode_to_vec(field_number: u32, value: &Value) -> Result<Vec<u8>> {
  let mut buffer = Vec::new();
  encode(&mut buffer, field_number, value)?;
  Ok(buffer)
}

/// Encodes `value` into the start of `buffer` without allocating. Returns the number of bytes
/// written, or [`Error::InsufficientCapacity`] if the encoding does not fit.
pub fn encode_in_place(buffer: &mut [u8], field_number: u32, value: &Value) -> Result<usize> {
  fill_with(buffer, |writer| write_value(writer, field_number, value))
}

/// Appends `value` wrapped in a one element array. The output is identical to encoding
/// `Value::Array(vec![value.clone()])` without building the array.
pub fn encode_as_array(buffer: &mut Vec<u8>, field_number: u32, value: &Value) -> Result<()> {
  append_with(buffer, |writer| {
    write_array(writer, field_number, std::slice::from_ref(value))
  })
}

/// In place counterpart of [`encode_as_array`].
pub fn encode_as_array_in_place(
  buffer: &mut [u8],
  field_number: u32,
  value: &Value,
) -> Result<usize> {
  fill_with(buffer, |writer| {
    write_array(writer, field_number, std::slice::from_ref(value))
  })
}

fn append_with(
  buffer: &mut Vec<u8>,
  write: impl FnOnce(&mut WireWriter<'_>) -> Result<()>,
) -> Result<()> {
  let start = buffer.len();
  let result = {
    let mut writer = WireWriter::growable(buffer);
    write(&mut writer).and_then(|()| writer.flush())
  };
  if result.is_err() {
    buffer.truncate(start);
  }
  result
}

fn fill_with(
  buffer: &mut [u8],
  write: impl FnOnce(&mut WireWriter<'_>) -> Result<()>,
) -> Result<usize> {
  let mut writer = WireWriter::bounded(buffer);
  write(&mut writer)?;
  writer.flush()?;
  Ok(writer.written())
}

// Integers are written as their two's complement bit pattern widened to 64 bits. There is no zig
// zag step, so every negative number takes the full 10 byte varint.
#[allow(clippy::cast_sign_loss)]
pub(crate) fn write_value(
  writer: &mut WireWriter<'_>,
  field_number: u32,
  value: &Value,
) -> Result<()> {
  check_field_number(field_number)?;

  match value {
    Value::Bool(v) => write_varint_value(writer, TypeCode::Bool, field_number, u64::from(*v)),
    Value::I8(v) => write_varint_value(writer, TypeCode::Int8, field_number, *v as u64),
    Value::U8(v) => write_varint_value(writer, TypeCode::Uint8, field_number, u64::from(*v)),
    Value::I16(v) => write_varint_value(writer, TypeCode::Int16, field_number, *v as u64),
    Value::U16(v) => write_varint_value(writer, TypeCode::Uint16, field_number, u64::from(*v)),
    Value::I32(v) => write_varint_value(writer, TypeCode::Int32, field_number, *v as u64),
    Value::U32(v) => write_varint_value(writer, TypeCode::Uint32, field_number, u64::from(*v)),
    Value::I64(v) => write_varint_value(writer, TypeCode::Int64, field_number, *v as u64),
    Value::U64(v) => write_varint_value(writer, TypeCode::Uint64, field_number, *v),
    Value::Int(v) => write_varint_value(writer, TypeCode::Int, field_number, *v as u64),
    Value::F32(v) => {
      write_type_tag(writer, TypeCode::Float32)?;
      writer.write_fixed32(field_number, v.to_bits())
    },
    Value::F64(v) => {
      write_type_tag(writer, TypeCode::Float64)?;
      writer.write_fixed64(field_number, v.to_bits())
    },
    Value::String(s) => {
      write_type_tag(writer, TypeCode::String)?;
      writer.write_bytes(field_number, s.as_bytes())
    },
    Value::Bytes(b) => {
      write_type_tag(writer, TypeCode::Bytes)?;
      writer.write_bytes(field_number, b)
    },
    Value::Array(items) => write_array(writer, field_number, items),
    Value::Map(_) | Value::Json(_) => {
      let json = value.to_json_vec()?;
      write_type_tag(writer, TypeCode::Json)?;
      writer.write_bytes(field_number, &json)
    },
  }
}

fn write_varint_value(
  writer: &mut WireWriter<'_>,
  code: TypeCode,
  field_number: u32,
  raw: u64,
) -> Result<()> {
  write_type_tag(writer, code)?;
  writer.write_varint(field_number, raw)
}

// Elements are numbered by their 1-based position within the group.
fn write_array(writer: &mut WireWriter<'_>, field_number: u32, items: &[Value]) -> Result<()> {
  check_field_number(field_number)?;
  writer.write_tag(field_number, WireType::StartGroup)?;
  for (index, item) in items.iter().enumerate() {
    let position = u32::try_from(index + 1).map_err(|_| Error::InvalidFieldNumber(u32::MAX))?;
    write_value(writer, position, item).map_err(|e| Error::element(index, e))?;
  }
  writer.write_tag(field_number, WireType::EndGroup)
}
