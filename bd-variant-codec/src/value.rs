// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./value_test.rs"]
mod value_test;

use crate::{Error, Result};
use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A dynamically typed value. Scalars keep their exact width and signedness across an
/// encode/decode round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Bool(bool),
  I8(i8),
  U8(u8),
  I16(i16),
  U16(u16),
  I32(i32),
  U32(u32),
  I64(i64),
  U64(u64),
  Int(isize),
  F32(f32),
  F64(f64),
  String(String),
  Bytes(Vec<u8>),
  Array(Vec<Value>),
  /// A generic mapping. It has no dedicated type code and is encoded as embedded JSON, so it
  /// decodes back as `Value::Json`.
  Map(BTreeMap<String, Value>),
  /// An opaque JSON tree. Numbers keep their textual form so large integers survive intact.
  Json(serde_json::Value),
}

impl Value {
  /// Converts a parsed JSON document into a value. Strings, booleans and arrays map onto their
  /// native variants, everything else stays JSON.
  #[must_use]
  pub fn from_json(json: serde_json::Value) -> Self {
    match json {
      serde_json::Value::Bool(b) => Self::Bool(b),
      serde_json::Value::String(s) => Self::String(s),
      serde_json::Value::Array(items) => Self::Array(items.into_iter().map(Self::from_json).collect()),
      other => Self::Json(other),
    }
  }

  /// Converts the value into a JSON tree. Fails for values that have no lossless JSON form.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    serde_json::to_value(self).map_err(|e| Error::UnsupportedType(e.to_string()))
  }

  /// Renders the value as JSON text.
  pub fn to_json_vec(&self) -> Result<Vec<u8>> {
    serde_json::to_vec(self).map_err(|e| Error::UnsupportedType(e.to_string()))
  }

  /// Formats a scalar as plain text: integers in decimal, floats with six fractional digits and
  /// strings unchanged. Bytes, arrays and JSON values have no plain text form.
  pub fn to_basic_string(&self) -> Result<String> {
    Ok(match self {
      Self::Bool(v) => v.to_string(),
      Self::I8(v) => v.to_string(),
      Self::U8(v) => v.to_string(),
      Self::I16(v) => v.to_string(),
      Self::U16(v) => v.to_string(),
      Self::I32(v) => v.to_string(),
      Self::U32(v) => v.to_string(),
      Self::I64(v) => v.to_string(),
      Self::U64(v) => v.to_string(),
      Self::Int(v) => v.to_string(),
      Self::F32(v) => format!("{:.6}", f64::from(*v)),
      Self::F64(v) => format!("{v:.6}"),
      Self::String(s) => s.clone(),
      Self::Bytes(_) => return Err(Error::UnsupportedType("bytes are not a basic type".into())),
      Self::Array(_) => return Err(Error::UnsupportedType("array is not a basic type".into())),
      Self::Map(_) | Self::Json(_) => {
        return Err(Error::UnsupportedType("json is not a basic type".into()));
      },
    })
  }

  #[must_use]
  pub const fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(b) => Some(*b),
      _ => None,
    }
  }

  /// Returns the value as an `i64` if it is a signed integer of any width.
  #[must_use]
  pub const fn as_i64(&self) -> Option<i64> {
    match self {
      Self::I8(v) => Some(*v as i64),
      Self::I16(v) => Some(*v as i64),
      Self::I32(v) => Some(*v as i64),
      Self::I64(v) => Some(*v),
      Self::Int(v) => Some(*v as i64),
      _ => None,
    }
  }

  /// Returns the value as a `u64` if it is an unsigned integer of any width.
  #[must_use]
  pub const fn as_u64(&self) -> Option<u64> {
    match self {
      Self::U8(v) => Some(*v as u64),
      Self::U16(v) => Some(*v as u64),
      Self::U32(v) => Some(*v as u64),
      Self::U64(v) => Some(*v),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::F32(v) => Some(f64::from(*v)),
      Self::F64(v) => Some(*v),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(s) => Some(s),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_bytes(&self) -> Option<&[u8]> {
    match self {
      Self::Bytes(b) => Some(b),
      _ => None,
    }
  }

  #[must_use]
  pub fn as_array(&self) -> Option<&[Self]> {
    match self {
      Self::Array(items) => Some(items),
      _ => None,
    }
  }

  #[must_use]
  pub const fn as_json(&self) -> Option<&serde_json::Value> {
    match self {
      Self::Json(json) => Some(json),
      _ => None,
    }
  }

  #[must_use]
  pub fn get_index(&self, index: usize) -> Option<&Self> {
    match self {
      Self::Array(items) => items.get(index),
      _ => None,
    }
  }

  #[must_use]
  pub const fn is_array(&self) -> bool {
    matches!(self, Self::Array(_))
  }
}

impl Default for Value {
  fn default() -> Self {
    Self::Json(serde_json::Value::Null)
  }
}

impl Serialize for Value {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match self {
      Self::Bool(v) => serializer.serialize_bool(*v),
      Self::I8(v) => serializer.serialize_i8(*v),
      Self::U8(v) => serializer.serialize_u8(*v),
      Self::I16(v) => serializer.serialize_i16(*v),
      Self::U16(v) => serializer.serialize_u16(*v),
      Self::I32(v) => serializer.serialize_i32(*v),
      Self::U32(v) => serializer.serialize_u32(*v),
      Self::I64(v) => serializer.serialize_i64(*v),
      Self::U64(v) => serializer.serialize_u64(*v),
      Self::Int(v) => serializer.serialize_i64(*v as i64),
      Self::F32(v) if v.is_finite() => serializer.serialize_f32(*v),
      Self::F64(v) if v.is_finite() => serializer.serialize_f64(*v),
      Self::F32(v) => Err(S::Error::custom(format!("non-finite float {v}"))),
      Self::F64(v) => Err(S::Error::custom(format!("non-finite float {v}"))),
      Self::String(s) => serializer.serialize_str(s),
      Self::Bytes(_) => Err(S::Error::custom("raw bytes have no json representation")),
      Self::Array(items) => serializer.collect_seq(items),
      Self::Map(map) => serializer.collect_map(map),
      Self::Json(json) => json.serialize(serializer),
    }
  }
}

macro_rules! impl_from_scalar {
  ($($ty:ty => $variant:ident),* $(,)?) => {
    $(
      impl From<$ty> for Value {
        fn from(v: $ty) -> Self {
          Self::$variant(v)
        }
      }
    )*
  };
}

impl_from_scalar!(
  bool => Bool,
  i8 => I8,
  u8 => U8,
  i16 => I16,
  u16 => U16,
  i32 => I32,
  u32 => U32,
  i64 => I64,
  u64 => U64,
  isize => Int,
  f32 => F32,
  f64 => F64,
  String => String,
  Vec<u8> => Bytes,
  Vec<Value> => Array,
  BTreeMap<String, Value> => Map,
  serde_json::Value => Json,
);

impl From<&str> for Value {
  fn from(v: &str) -> Self {
    Self::String(v.to_string())
  }
}
