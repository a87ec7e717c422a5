// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use protobuf::rt::WireType;

/// The specific reason a buffer was rejected by the decoder.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
  #[error("wire error: {0}")]
  Wire(String),
  #[error("invalid wire type {0}")]
  InvalidWireType(u64),
  #[error("invalid field number {0}")]
  InvalidFieldNumber(u64),
  #[error("value frame is not preceded by a type tag")]
  MissingTypeTag,
  #[error("unknown type code {0}")]
  UnknownTypeCode(u64),
  #[error("type code {code} cannot be carried by wire type {wire_type:?}")]
  WireTypeMismatch { code: u64, wire_type: WireType },
  #[error("{0} is not a boolean")]
  InvalidBool(u64),
  #[error("raw value {raw:#x} does not fit type code {code}")]
  OutOfRange { code: u64, raw: u64 },
  #[error("input ends inside a frame")]
  Truncated,
  #[error("string is not valid utf-8")]
  InvalidUtf8,
  #[error("invalid json payload: {0}")]
  InvalidJson(String),
  #[error("group {0} is not terminated")]
  UnterminatedGroup(u32),
  #[error("group {expected} closed by end group {found}")]
  UnbalancedGroup { expected: u32, found: u32 },
  #[error("unexpected end group {0}")]
  UnexpectedEndGroup(u32),
  #[error("nesting depth exceeds {0}")]
  DepthExceeded(usize),
  #[error("not an array")]
  NotAnArray,
  #[error("expected a single element array, found {0} elements")]
  NotSingleElement(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("unsupported type: {0}")]
  UnsupportedType(String),
  #[error("invalid field number {0}")]
  InvalidFieldNumber(u32),
  #[error("malformed input at offset {offset} (depth {depth}): {reason}")]
  Malformed {
    offset: usize,
    depth: usize,
    reason: MalformedReason,
  },
  #[error("insufficient capacity: {required} bytes required, destination holds {capacity}")]
  InsufficientCapacity { capacity: usize, required: usize },
  #[error("array element {index}: {source}")]
  Element {
    index: usize,
    #[source]
    source: Box<Error>,
  },
  #[error("row {row}: {source}")]
  Row {
    row: usize,
    #[source]
    source: Box<Error>,
  },
  #[error("callback failed: {0}")]
  Callback(anyhow::Error),
  #[error("protobuf error: {0}")]
  Protobuf(#[from] protobuf::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The root cause of an [`Error`], with positional annotations removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  UnsupportedType,
  InvalidFieldNumber,
  Malformed,
  InsufficientCapacity,
  Callback,
  Wire,
}

impl Error {
  #[must_use]
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::UnsupportedType(_) => ErrorKind::UnsupportedType,
      Self::InvalidFieldNumber(_) => ErrorKind::InvalidFieldNumber,
      Self::Malformed { .. } => ErrorKind::Malformed,
      Self::InsufficientCapacity { .. } => ErrorKind::InsufficientCapacity,
      Self::Callback(_) => ErrorKind::Callback,
      Self::Protobuf(_) => ErrorKind::Wire,
      Self::Element { source, .. } | Self::Row { source, .. } => source.kind(),
    }
  }

  /// Returns the malformed reason if the root cause is a decode failure.
  #[must_use]
  pub fn malformed_reason(&self) -> Option<&MalformedReason> {
    match self {
      Self::Malformed { reason, .. } => Some(reason),
      Self::Element { source, .. } | Self::Row { source, .. } => source.malformed_reason(),
      _ => None,
    }
  }

  pub(crate) fn element(index: usize, source: Self) -> Self {
    Self::Element {
      index,
      source: Box::new(source),
    }
  }

  pub(crate) fn row(row: usize, source: Self) -> Self {
    Self::Row {
      row,
      source: Box::new(source),
    }
  }
}
