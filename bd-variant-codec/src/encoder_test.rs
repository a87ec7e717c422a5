// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use crate::encoder::{Encoder, encode, encode_as_array, encode_in_place, encode_to_vec};
use crate::test::decode_exact;
use crate::{Error, ErrorKind, MAX_FIELD_NUMBER, Value, decode_multiple};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::BTreeMap;

#[ctor::ctor]
fn test_global_init() {
  crate::test::test_global_init();
}

fn nan_map() -> Value {
  let mut map = BTreeMap::new();
  map.insert("x".to_string(), Value::F64(f64::NAN));
  Value::Map(map)
}

#[test]
fn negative_int32_uses_full_varint() {
  let bytes = encode_to_vec(1, &Value::I32(-1)).unwrap();

  assert_eq!(
    bytes,
    vec![
      0x78, 0x06, // type tag: Int32
      0x08, // field 1, varint
      0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01,
    ]
  );
}

#[rstest]
#[case(Value::Bool(true), vec![0x78, 0x01, 0x08, 0x01])]
#[case(Value::U8(200), vec![0x78, 0x03, 0x08, 0xc8, 0x01])]
#[case(Value::from("hi"), vec![0x78, 0x0d, 0x0a, 0x02, b'h', b'i'])]
#[case(Value::F32(1.0), vec![0x78, 0x0b, 0x0d, 0x00, 0x00, 0x80, 0x3f])]
#[case(Value::Array(vec![]), vec![0x0b, 0x0c])]
#[case(Value::Array(vec![Value::I8(5)]), vec![0x0b, 0x78, 0x02, 0x08, 0x05, 0x0c])]
fn exact_bytes(#[case] value: Value, #[case] expected: Vec<u8>) {
  assert_eq!(encode_to_vec(1, &value).unwrap(), expected);
}

#[rstest]
#[case(Value::Bool(false))]
#[case(Value::I8(i8::MIN))]
#[case(Value::U8(u8::MAX))]
#[case(Value::I16(i16::MIN))]
#[case(Value::U16(u16::MAX))]
#[case(Value::I32(i32::MIN))]
#[case(Value::U32(u32::MAX))]
#[case(Value::I64(i64::MIN))]
#[case(Value::U64(u64::MAX))]
#[case(Value::Int(isize::MIN))]
#[case(Value::F32(-0.5))]
#[case(Value::F64(f64::MAX))]
#[case(Value::from(""))]
#[case(Value::from("héllo wörld"))]
#[case(Value::Bytes(vec![]))]
#[case(Value::Bytes(vec![0, 0xff, 0x80]))]
#[case(Value::Array(vec![]))]
#[case(Value::Array(vec![
  Value::I16(-2),
  Value::Array(vec![Value::U64(7), Value::Array(vec![])]),
  Value::from("x"),
]))]
#[case(Value::Array((0 .. 20).map(Value::I32).collect()))]
#[case(Value::Array((0 .. 16).map(|i| Value::Array(vec![Value::U8(i)])).collect()))]
#[case(Value::Array(
  (0 .. 17)
    .map(|i| if i == 14 { Value::Bool(true) } else { Value::from(i.to_string()) })
    .collect(),
))]
fn round_trip_keeps_exact_type(#[case] value: Value) {
  let bytes = encode_to_vec(7, &value).unwrap();
  assert_eq!(decode_exact(&bytes), value);
}

#[test]
fn element_fifteen_shares_the_type_tag_field() {
  let value = Value::Array((0 .. 15).map(|_| Value::Bool(true)).collect());
  let bytes = encode_to_vec(1, &value).unwrap();

  // The fifteenth element is a type tag frame followed by a value frame, both on field 15.
  assert_eq!(&bytes[bytes.len() - 5 ..], &[0x78, 0x01, 0x78, 0x01, 0x0c]);
  assert_eq!(decode_exact(&bytes), value);
}

#[test]
fn round_trip_nan_bits() {
  let bytes = encode_to_vec(1, &Value::F64(f64::NAN)).unwrap();
  assert_matches!(decode_exact(&bytes), Value::F64(v) if v.to_bits() == f64::NAN.to_bits());
}

#[test]
fn map_falls_back_to_json() {
  let mut map = BTreeMap::new();
  map.insert("a".to_string(), Value::I64(123));
  map.insert("b".to_string(), Value::from("abc"));

  let bytes = encode_to_vec(1, &Value::Map(map)).unwrap();

  assert_eq!(&bytes[.. 2], &[0x78, 0x0f]);
  assert_eq!(
    decode_exact(&bytes),
    Value::Json(serde_json::json!({"a": 123, "b": "abc"}))
  );
}

#[test]
fn json_large_integers_are_lossless() {
  let json: serde_json::Value =
    serde_json::from_str(r#"{"big":123456789012345678901234567890,"neg":-98765432109876543210}"#)
      .unwrap();

  let bytes = encode_to_vec(1, &Value::Json(json)).unwrap();
  let Value::Json(decoded) = decode_exact(&bytes) else {
    panic!("expected json");
  };

  assert_eq!(
    decoded.to_string(),
    r#"{"big":123456789012345678901234567890,"neg":-98765432109876543210}"#
  );
}

#[test]
fn non_finite_float_in_map_is_unsupported() {
  let err = encode_to_vec(1, &nan_map()).unwrap_err();
  assert_matches!(err, Error::UnsupportedType(_));
}

#[test]
fn element_failure_is_annotated() {
  let value = Value::Array(vec![
    Value::I8(1),
    Value::Array(vec![Value::Bool(true), nan_map()]),
  ]);

  let err = encode_to_vec(1, &value).unwrap_err();

  assert_eq!(err.kind(), ErrorKind::UnsupportedType);
  assert_matches!(
    err,
    Error::Element { index: 1, source } => {
      assert_matches!(*source, Error::Element { index: 1, .. });
    }
  );
}

#[rstest]
#[case(0)]
#[case(MAX_FIELD_NUMBER + 1)]
fn invalid_field_number(#[case] field_number: u32) {
  assert_matches!(
    encode_to_vec(field_number, &Value::Bool(true)),
    Err(Error::InvalidFieldNumber(n)) if n == field_number
  );
  assert_matches!(
    encode_to_vec(field_number, &Value::Array(vec![])),
    Err(Error::InvalidFieldNumber(n)) if n == field_number
  );
}

#[test]
fn max_field_number_round_trips() {
  let bytes = encode_to_vec(MAX_FIELD_NUMBER, &Value::U16(3)).unwrap();
  let mut decoder = crate::Decoder::new(&bytes);
  assert_eq!(
    decoder.decode_with_field().unwrap(),
    (MAX_FIELD_NUMBER, Value::U16(3))
  );
}

#[test]
fn failed_encode_leaves_buffer_untouched() {
  let mut buffer = vec![0xaa, 0xbb];
  let value = Value::Array(vec![Value::I8(1), Value::from("two"), nan_map()]);

  assert!(encode(&mut buffer, 1, &value).is_err());
  assert_eq!(buffer, vec![0xaa, 0xbb]);
}

#[test]
fn encode_appends() {
  let mut buffer = Vec::new();
  encode(&mut buffer, 1, &Value::I8(1)).unwrap();
  encode(&mut buffer, 2, &Value::from("b")).unwrap();

  assert_eq!(
    decode_multiple(&buffer).unwrap(),
    vec![Value::I8(1), Value::from("b")]
  );
}

#[test]
fn encode_as_array_matches_wrapped_value() {
  let value = Value::from("wrapped");
  let mut buffer = Vec::new();
  encode_as_array(&mut buffer, 1, &value).unwrap();

  assert_eq!(
    buffer,
    encode_to_vec(1, &Value::Array(vec![value])).unwrap()
  );
}

#[test]
fn in_place_exact_fit() {
  let value = Value::Array(vec![Value::I32(-1), Value::from("abc"), Value::F64(2.5)]);
  let expected = encode_to_vec(3, &value).unwrap();

  let mut destination = vec![0; expected.len()];
  assert_eq!(
    encode_in_place(&mut destination, 3, &value).unwrap(),
    expected.len()
  );
  assert_eq!(destination, expected);
}

#[test]
fn in_place_larger_destination() {
  let value = Value::U32(77);
  let expected = encode_to_vec(1, &value).unwrap();

  let mut destination = vec![0xee; expected.len() + 8];
  let written = encode_in_place(&mut destination, 1, &value).unwrap();

  assert_eq!(written, expected.len());
  assert_eq!(&destination[.. written], expected.as_slice());
  assert!(destination[written ..].iter().all(|b| *b == 0xee));
}

#[test]
fn in_place_short_destination() {
  // 2 byte type tag, then an 11 byte value frame.
  let mut destination = vec![0; 12];

  assert_matches!(
    encode_in_place(&mut destination, 1, &Value::I32(-1)),
    Err(Error::InsufficientCapacity {
      capacity: 12,
      required: 13
    })
  );
}

#[test]
fn in_place_short_destination_inside_array() {
  let value = Value::Array(vec![Value::from("abcdef"), Value::from("ghijkl")]);
  let expected = encode_to_vec(1, &value).unwrap();

  for len in 0 .. expected.len() {
    let mut destination = vec![0; len];
    let err = encode_in_place(&mut destination, 1, &value).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientCapacity, "len {len}");
  }
}

#[test]
fn encoder_reuses_buffer() {
  let mut encoder = Encoder::with_capacity(64);

  let first = encoder.encode(1, &Value::I64(10)).unwrap().to_vec();
  let second = encoder.encode(1, &Value::I64(20)).unwrap().to_vec();

  assert_eq!(decode_exact(&first), Value::I64(10));
  assert_eq!(decode_exact(&second), Value::I64(20));

  encoder.append(2, &Value::Bool(true)).unwrap();
  assert_eq!(
    decode_multiple(encoder.buffer()).unwrap(),
    vec![Value::I64(20), Value::Bool(true)]
  );

  encoder.clear();
  assert!(encoder.buffer().is_empty());
  assert!(Encoder::default().into_inner().is_empty());
}
