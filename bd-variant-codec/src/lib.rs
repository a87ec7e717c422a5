// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! A self describing codec for dynamically typed values on top of the protocol buffers wire
//! format.
//!
//! Every scalar is written as an ordinary protobuf field preceded by a side band varint frame on
//! [`TYPE_TAG_FIELD_NUMBER`] carrying its [`TypeCode`], so a decoder recovers the exact width and
//! signedness that was encoded. Arrays are written as start/end groups whose elements are
//! numbered by position. Mappings and other JSON trees travel as embedded JSON text.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod marshal;
pub mod message;
pub mod stream;
pub mod type_codes;
pub mod value;

mod wire;


pub use crate::decoder::{DEFAULT_MAX_DEPTH, Decoder, decode, decode_multiple};
pub use crate::encoder::{
  Encoder,
  encode,
  encode_as_array,
  encode_as_array_in_place,
  encode_in_place,
  encode_to_vec,
};
pub use crate::error::{Error, ErrorKind, MalformedReason, Result};
pub use crate::marshal::{INVALID_SIZE, SizeCache};
pub use crate::message::{DEFAULT_BUFFER_SIZE, MESSAGE_FIELD_NUMBER, Marshal, ValueMessage};
pub use crate::stream::{
  ArrayEnvelope,
  Row,
  Rows,
  append_array_end,
  append_array_start,
  for_each_row,
  read_array_envelope,
  rows,
};
pub use crate::type_codes::{TYPE_TAG_FIELD_NUMBER, TypeCode};
pub use crate::value::Value;
pub use crate::wire::MAX_FIELD_NUMBER;
