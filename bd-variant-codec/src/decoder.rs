// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./decoder_test.rs"]
mod decoder_test;

use crate::error::{Error, MalformedReason, Result};
use crate::type_codes::{TypeCode, read_type_tag};
use crate::value::Value;
use crate::wire::WireReader;
use protobuf::rt::WireType;

/// Maximum number of nested arrays the decoder accepts unless configured otherwise. Each level of
/// nesting costs one level of recursion, so this bounds stack usage on untrusted input.
pub const DEFAULT_MAX_DEPTH: usize = 100;

pub struct Decoder<'a> {
  reader: WireReader<'a>,
  depth: usize,
  max_depth: usize,
}

impl<'a> Decoder<'a> {
  #[must_use]
  pub const fn new(data: &'a [u8]) -> Self {
    Self {
      reader: WireReader::new(data),
      depth: 0,
      max_depth: DEFAULT_MAX_DEPTH,
    }
  }

  #[must_use]
  pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
    self.max_depth = max_depth;
    self
  }

  // Used for decoding the contents of a group whose start tag has already been consumed.
  pub(crate) const fn nested_at(mut self, depth: usize) -> Self {
    self.depth = depth;
    self
  }

  /// Decodes the next value.
  pub fn decode(&mut self) -> Result<Value> {
    self.decode_with_field().map(|(_, value)| value)
  }

  /// Decodes the next value and returns it together with the field number it was written under.
  pub fn decode_with_field(&mut self) -> Result<(u32, Value)> {
    let type_code = self.wire(read_type_tag)?;
    let frame_offset = self.reader.position();
    let (field_number, wire_type) = self.wire(|r| r.read_tag())?;

    let value = match (wire_type, type_code) {
      (WireType::StartGroup, None) => self.decode_group(field_number, frame_offset)?,
      (WireType::EndGroup, _) => {
        return Err(self.malformed(
          frame_offset,
          MalformedReason::UnexpectedEndGroup(field_number),
        ));
      },
      (_, None) => return Err(self.malformed(frame_offset, MalformedReason::MissingTypeTag)),
      (_, Some(code)) => self.decode_scalar(code, wire_type, frame_offset)?,
    };

    Ok((field_number, value))
  }

  /// Decodes values until the input is exhausted.
  pub fn decode_multiple(&mut self) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    while !self.reader.is_empty() {
      values.push(self.decode()?);
    }
    Ok(values)
  }

  /// Number of bytes consumed so far.
  #[must_use]
  pub const fn position(&self) -> usize {
    self.reader.position()
  }

  /// The input that has not been decoded yet.
  #[must_use]
  pub fn remaining(&self) -> &'a [u8] {
    self.reader.remaining()
  }

  #[must_use]
  pub const fn is_empty(&self) -> bool {
    self.reader.is_empty()
  }

  pub(crate) const fn skip(&mut self, count: usize) {
    self.reader.advance(count);
  }

  fn malformed(&self, offset: usize, reason: MalformedReason) -> Error {
    Error::Malformed {
      offset,
      depth: self.depth,
      reason,
    }
  }

  // Runs a reader operation, attributing any failure to the offset it started at.
  fn wire<T>(
    &mut self,
    read: impl FnOnce(&mut WireReader<'a>) -> std::result::Result<T, MalformedReason>,
  ) -> Result<T> {
    let offset = self.reader.position();
    read(&mut self.reader).map_err(|reason| self.malformed(offset, reason))
  }

  fn decode_scalar(&mut self, raw_code: u64, wire_type: WireType, offset: usize) -> Result<Value> {
    let code = TypeCode::try_from(raw_code)
      .map_err(|code| self.malformed(offset, MalformedReason::UnknownTypeCode(code)))?;
    if code.wire_type() != wire_type {
      return Err(self.malformed(
        offset,
        MalformedReason::WireTypeMismatch {
          code: raw_code,
          wire_type,
        },
      ));
    }

    let payload_offset = self.reader.position();
    match code {
      TypeCode::Float32 => {
        let bits = self.wire(|r| r.read_fixed32())?;
        Ok(Value::F32(f32::from_bits(bits)))
      },
      TypeCode::Float64 => {
        let bits = self.wire(|r| r.read_fixed64())?;
        Ok(Value::F64(f64::from_bits(bits)))
      },
      TypeCode::String => {
        let payload = self.wire(|r| r.read_length_delimited())?;
        let s = std::str::from_utf8(payload)
          .map_err(|_| self.malformed(payload_offset, MalformedReason::InvalidUtf8))?;
        Ok(Value::String(s.to_string()))
      },
      TypeCode::Bytes => {
        let payload = self.wire(|r| r.read_length_delimited())?;
        Ok(Value::Bytes(payload.to_vec()))
      },
      TypeCode::Json => {
        let payload = self.wire(|r| r.read_length_delimited())?;
        let json = serde_json::from_slice(payload).map_err(|e| {
          self.malformed(payload_offset, MalformedReason::InvalidJson(e.to_string()))
        })?;
        Ok(Value::Json(json))
      },
      _ => {
        let raw = self.wire(|r| r.read_varint())?;
        varint_to_value(code, raw).map_err(|reason| self.malformed(payload_offset, reason))
      },
    }
  }

  fn decode_group(&mut self, field_number: u32, offset: usize) -> Result<Value> {
    if self.depth >= self.max_depth {
      return Err(self.malformed(offset, MalformedReason::DepthExceeded(self.max_depth)));
    }

    self.depth += 1;
    let result = self.decode_group_elements(field_number);
    self.depth -= 1;
    result.map(Value::Array)
  }

  fn decode_group_elements(&mut self, field_number: u32) -> Result<Vec<Value>> {
    let mut elements = Vec::new();

    loop {
      let offset = self.reader.position();
      if self.reader.is_empty() {
        return Err(self.malformed(offset, MalformedReason::UnterminatedGroup(field_number)));
      }

      let (next_field, next_wire_type, tag_len) = self.wire(|r| r.peek_tag())?;
      if next_wire_type == WireType::EndGroup {
        if next_field != field_number {
          return Err(self.malformed(
            offset,
            MalformedReason::UnbalancedGroup {
              expected: field_number,
              found: next_field,
            },
          ));
        }
        self.reader.advance(tag_len);
        return Ok(elements);
      }

      elements.push(self.decode()?);
    }
  }
}

#[allow(clippy::cast_possible_wrap)]
fn varint_to_value(code: TypeCode, raw: u64) -> std::result::Result<Value, MalformedReason> {
  let out_of_range = || MalformedReason::OutOfRange {
    code: code.into(),
    raw,
  };
  let signed = raw as i64;

  Ok(match code {
    TypeCode::Bool => match raw {
      0 => Value::Bool(false),
      1 => Value::Bool(true),
      _ => return Err(MalformedReason::InvalidBool(raw)),
    },
    TypeCode::Int8 => Value::I8(i8::try_from(signed).map_err(|_| out_of_range())?),
    TypeCode::Uint8 => Value::U8(u8::try_from(raw).map_err(|_| out_of_range())?),
    TypeCode::Int16 => Value::I16(i16::try_from(signed).map_err(|_| out_of_range())?),
    TypeCode::Uint16 => Value::U16(u16::try_from(raw).map_err(|_| out_of_range())?),
    TypeCode::Int32 => Value::I32(i32::try_from(signed).map_err(|_| out_of_range())?),
    TypeCode::Uint32 => Value::U32(u32::try_from(raw).map_err(|_| out_of_range())?),
    TypeCode::Int64 => Value::I64(signed),
    TypeCode::Uint64 => Value::U64(raw),
    TypeCode::Int => Value::Int(isize::try_from(signed).map_err(|_| out_of_range())?),
    TypeCode::Float32
    | TypeCode::Float64
    | TypeCode::String
    | TypeCode::Bytes
    | TypeCode::Json => {
      return Err(MalformedReason::WireTypeMismatch {
        code: code.into(),
        wire_type: WireType::Varint,
      });
    },
  })
}

/// Decodes one value from the front of `buffer` and returns it with the bytes that follow it.
pub fn decode(buffer: &[u8]) -> Result<(&[u8], Value)> {
  let mut decoder = Decoder::new(buffer);
  let value = decoder.decode()?;
  log::trace!("decoded {} of {} bytes", decoder.position(), buffer.len());
  Ok((decoder.remaining(), value))
}

/// Decodes every value in `buffer`.
pub fn decode_multiple(buffer: &[u8]) -> Result<Vec<Value>> {
  Decoder::new(buffer).decode_multiple()
}
