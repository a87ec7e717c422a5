// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use crate::error::{MalformedReason, Result};
use crate::value::Value;
use crate::wire::{WireReader, WireWriter};
use protobuf::rt::WireType;

/// Field number reserved for the side-band type tag. Every tagged value is preceded by a varint
/// frame on this field carrying its `TypeCode`.
pub const TYPE_TAG_FIELD_NUMBER: u32 = 15;

/// Semantic type codes carried by the type tag. The numeric values are part of the wire format.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
  Bool = 1,
  Int8 = 2,
  Uint8 = 3,
  Int16 = 4,
  Uint16 = 5,
  Int32 = 6,
  Uint32 = 7,
  Int64 = 8,
  Uint64 = 9,
  Int = 10,
  Float32 = 11,
  Float64 = 12,
  String = 13,
  Bytes = 14,
  Json = 15,
}

impl TypeCode {
  /// Returns the type code for a value. Arrays are framed by groups and carry no type tag.
  #[must_use]
  pub fn classify(value: &Value) -> Option<Self> {
    Some(match value {
      Value::Bool(_) => Self::Bool,
      Value::I8(_) => Self::Int8,
      Value::U8(_) => Self::Uint8,
      Value::I16(_) => Self::Int16,
      Value::U16(_) => Self::Uint16,
      Value::I32(_) => Self::Int32,
      Value::U32(_) => Self::Uint32,
      Value::I64(_) => Self::Int64,
      Value::U64(_) => Self::Uint64,
      Value::Int(_) => Self::Int,
      Value::F32(_) => Self::Float32,
      Value::F64(_) => Self::Float64,
      Value::String(_) => Self::String,
      Value::Bytes(_) => Self::Bytes,
      Value::Map(_) | Value::Json(_) => Self::Json,
      Value::Array(_) => return None,
    })
  }

  /// The only wire type a value with this code may be framed with.
  #[must_use]
  pub const fn wire_type(self) -> WireType {
    match self {
      Self::Float32 => WireType::Fixed32,
      Self::Float64 => WireType::Fixed64,
      Self::String | Self::Bytes | Self::Json => WireType::LengthDelimited,
      _ => WireType::Varint,
    }
  }
}

impl From<TypeCode> for u64 {
  fn from(code: TypeCode) -> Self {
    code as Self
  }
}

impl TryFrom<u64> for TypeCode {
  type Error = u64;

  fn try_from(code: u64) -> std::result::Result<Self, u64> {
    Ok(match code {
      1 => Self::Bool,
      2 => Self::Int8,
      3 => Self::Uint8,
      4 => Self::Int16,
      5 => Self::Uint16,
      6 => Self::Int32,
      7 => Self::Uint32,
      8 => Self::Int64,
      9 => Self::Uint64,
      10 => Self::Int,
      11 => Self::Float32,
      12 => Self::Float64,
      13 => Self::String,
      14 => Self::Bytes,
      15 => Self::Json,
      _ => return Err(code),
    })
  }
}

/// Appends the type tag frame that must precede a value with the given code.
pub(crate) fn write_type_tag(writer: &mut WireWriter<'_>, code: TypeCode) -> Result<()> {
  writer.write_varint(TYPE_TAG_FIELD_NUMBER, code.into())
}

/// Consumes a type tag frame if one comes next and returns its raw code. Returns `None`, leaving
/// the reader untouched, when the next frame is anything else.
pub(crate) fn read_type_tag(
  reader: &mut WireReader<'_>,
) -> std::result::Result<Option<u64>, MalformedReason> {
  let (field_number, wire_type, tag_len) = reader.peek_tag()?;
  if field_number != TYPE_TAG_FIELD_NUMBER || wire_type != WireType::Varint {
    return Ok(None);
  }
  reader.advance(tag_len);
  reader.read_varint().map(Some)
}
