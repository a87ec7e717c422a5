// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use crate::encoder::{encode, encode_to_vec};
use crate::stream::{
  Row,
  append_array_end,
  append_array_start,
  for_each_row,
  read_array_envelope,
  rows,
};
use crate::test::{mixed_table, nested};
use crate::{DEFAULT_MAX_DEPTH, Error, ErrorKind, MalformedReason, Value};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

#[ctor::ctor]
fn test_global_init() {
  crate::test::test_global_init();
}

fn two_rows() -> Vec<u8> {
  encode_to_vec(
    1,
    &Value::Array(vec![
      Value::Array(vec![Value::I64(1), Value::from("x")]),
      Value::Array(vec![Value::I64(2), Value::from("y")]),
    ]),
  )
  .unwrap()
}

#[test]
fn incremental_framing_matches_single_encode() {
  let table = mixed_table();
  let expected = encode_to_vec(1, &table).unwrap();

  let mut buffer = Vec::new();
  append_array_start(&mut buffer, 1).unwrap();
  for (index, row) in table.as_array().unwrap().iter().enumerate() {
    encode(&mut buffer, u32::try_from(index + 1).unwrap(), row).unwrap();
  }
  append_array_end(&mut buffer, 1).unwrap();

  assert_eq!(buffer, expected);
}

#[test]
fn framing_rejects_invalid_field_number() {
  let mut buffer = Vec::new();
  assert_matches!(
    append_array_start(&mut buffer, 0),
    Err(Error::InvalidFieldNumber(0))
  );
  assert!(buffer.is_empty());
}

#[test]
fn envelope_spans_whole_array() {
  let table = mixed_table();
  let mut bytes = encode_to_vec(2, &table).unwrap();
  let len = bytes.len();
  bytes.extend_from_slice(&encode_to_vec(1, &Value::Bool(true)).unwrap());

  let envelope = read_array_envelope(&bytes).unwrap();

  assert_eq!(envelope.field_number(), 2);
  assert_eq!(envelope.header_len(), 1);
  assert_eq!(envelope.bytes(), &bytes[.. len]);
  assert_eq!(envelope.body(), &bytes[1 .. len - 1]);
  assert_eq!(envelope.rest(), &bytes[len ..]);
  assert_eq!(
    envelope.decode().unwrap(),
    crate::decode(&bytes).unwrap().1
  );
}

#[test]
fn envelope_of_empty_array() {
  let bytes = encode_to_vec(1, &Value::Array(vec![])).unwrap();
  let envelope = read_array_envelope(&bytes).unwrap();

  assert!(envelope.body().is_empty());
  assert!(envelope.rest().is_empty());
  assert_eq!(envelope.decode().unwrap(), Value::Array(vec![]));
}

#[test]
fn envelope_of_scalar() {
  let bytes = encode_to_vec(1, &Value::I8(1)).unwrap();
  assert_matches!(
    read_array_envelope(&bytes),
    Err(Error::Malformed {
      offset: 0,
      reason: MalformedReason::NotAnArray,
      ..
    })
  );
}

#[test]
fn envelope_of_truncated_array() {
  let bytes = two_rows();

  for len in 0 .. bytes.len() {
    let err = read_array_envelope(&bytes[.. len]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed, "len {len}");
  }
  assert_matches!(
    read_array_envelope(&bytes[.. bytes.len() - 1]),
    Err(Error::Malformed {
      reason: MalformedReason::UnterminatedGroup(1),
      ..
    })
  );
}

#[test]
fn envelope_of_unbalanced_array() {
  assert_matches!(
    read_array_envelope(&[0x0b, 0x13, 0x0c]),
    Err(Error::Malformed {
      offset: 2,
      depth: 2,
      reason: MalformedReason::UnbalancedGroup {
        expected: 2,
        found: 1
      },
    })
  );
}

#[test]
fn rows_in_order() {
  let mut seen = Vec::new();
  for_each_row(&two_rows(), |field_number, columns| {
    seen.push((field_number, columns));
    Ok(())
  })
  .unwrap();

  assert_eq!(
    seen,
    vec![
      (1, vec![Value::I64(1), Value::from("x")]),
      (2, vec![Value::I64(2), Value::from("y")]),
    ]
  );
}

#[test]
fn callback_error_stops_iteration() {
  let mut calls = 0;
  let err = for_each_row(&two_rows(), |_, _| {
    calls += 1;
    anyhow::bail!("stop")
  })
  .unwrap_err();

  assert_eq!(calls, 1);
  assert_eq!(err.kind(), ErrorKind::Callback);
  assert_matches!(err, Error::Row { row: 0, source } => {
    assert_matches!(*source, Error::Callback(e) if e.to_string() == "stop");
  });
}

#[test]
fn scalar_row_is_one_column() {
  let bytes = encode_to_vec(
    1,
    &Value::Array(vec![
      Value::from("solo"),
      Value::Array(vec![Value::U8(1), Value::U8(2)]),
    ]),
  )
  .unwrap();

  let collected: Vec<Row> = rows(&bytes).unwrap().map(Result::unwrap).collect();

  assert_eq!(
    collected,
    vec![
      Row {
        field_number: 1,
        columns: vec![Value::from("solo")],
      },
      Row {
        field_number: 2,
        columns: vec![Value::U8(1), Value::U8(2)],
      },
    ]
  );
}

#[test]
fn malformed_row_is_annotated() {
  let mut bytes = Vec::new();
  append_array_start(&mut bytes, 1).unwrap();
  encode(&mut bytes, 1, &Value::Array(vec![Value::Bool(true)])).unwrap();
  // An untagged varint frame is well formed on the wire but not a value.
  bytes.extend_from_slice(&[0x10, 0x01]);
  encode(&mut bytes, 3, &Value::Array(vec![Value::Bool(false)])).unwrap();
  append_array_end(&mut bytes, 1).unwrap();

  let mut iter = rows(&bytes).unwrap();
  assert_eq!(
    iter.next().unwrap().unwrap().columns,
    vec![Value::Bool(true)]
  );
  assert_matches!(iter.next(), Some(Err(Error::Row { row: 1, source })) => {
    assert_eq!(source.malformed_reason(), Some(&MalformedReason::MissingTypeTag));
  });
  assert!(iter.next().is_none());

  let mut calls = 0;
  let err = for_each_row(&bytes, |_, _| {
    calls += 1;
    Ok(())
  })
  .unwrap_err();
  assert_eq!(calls, 1);
  assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[test]
fn rows_of_scalar() {
  let bytes = encode_to_vec(1, &Value::U32(3)).unwrap();
  assert_matches!(
    for_each_row(&bytes, |_, _| Ok(())),
    Err(Error::Malformed {
      reason: MalformedReason::NotAnArray,
      ..
    })
  );
}

#[test]
fn input_after_table_is_not_read() {
  let mut bytes = two_rows();
  bytes.extend_from_slice(&[0xff, 0xff]);

  let mut count = 0;
  for_each_row(&bytes, |_, _| {
    count += 1;
    Ok(())
  })
  .unwrap();
  assert_eq!(count, 2);
}

#[test]
fn row_depth_counts_the_table() {
  let bytes = encode_to_vec(1, &Value::Array(vec![nested(DEFAULT_MAX_DEPTH - 1)])).unwrap();
  assert!(crate::decode(&bytes).is_ok());
  assert_eq!(
    rows(&bytes).unwrap().next().unwrap().unwrap().columns,
    vec![nested(DEFAULT_MAX_DEPTH - 2)]
  );

  let bytes = encode_to_vec(1, &Value::Array(vec![nested(DEFAULT_MAX_DEPTH)])).unwrap();
  let Err(Error::Malformed {
    offset,
    depth,
    reason,
  }) = crate::decode(&bytes)
  else {
    panic!("expected the table to exceed the depth limit");
  };
  assert_eq!(reason, MalformedReason::DepthExceeded(DEFAULT_MAX_DEPTH));

  let mut iter = rows(&bytes).unwrap();
  assert_matches!(iter.next(), Some(Err(Error::Row { row: 0, source })) => {
    assert_matches!(
      *source,
      Error::Malformed {
        offset: row_offset,
        depth: row_depth,
        reason: MalformedReason::DepthExceeded(DEFAULT_MAX_DEPTH),
      } if row_offset == offset && row_depth == depth
    );
  });
  assert!(iter.next().is_none());
}
