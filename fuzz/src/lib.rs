// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#![allow(clippy::unwrap_used, clippy::panic)]


use arbitrary::{Arbitrary, Unstructured};
use bd_variant_codec::{
  Decoder,
  MAX_FIELD_NUMBER,
  Marshal,
  SizeCache,
  Value,
  ValueMessage,
  decode,
  encode_to_vec,
  for_each_row,
  read_array_envelope,
};
use std::collections::BTreeMap;

const MAX_NESTING: u32 = 4;

//
// RoundTripFuzzTestCase
//

#[derive(Debug)]
pub struct RoundTripFuzzTestCase {
  pub field_number: u32,
  pub value: Value,
}

impl<'a> Arbitrary<'a> for RoundTripFuzzTestCase {
  fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
    Ok(Self {
      field_number: u.int_in_range(1 ..= MAX_FIELD_NUMBER)?,
      value: arbitrary_value(u, 0)?,
    })
  }
}

// Builds a value of bounded nesting. Every variant can be produced, including floats that have no
// JSON form when placed inside a map.
fn arbitrary_value(u: &mut Unstructured<'_>, depth: u32) -> arbitrary::Result<Value> {
  let last_variant = if depth >= MAX_NESTING { 13 } else { 16 };
  Ok(match u.int_in_range(0 ..= last_variant)? {
    0 => Value::Bool(u.arbitrary()?),
    1 => Value::I8(u.arbitrary()?),
    2 => Value::U8(u.arbitrary()?),
    3 => Value::I16(u.arbitrary()?),
    4 => Value::U16(u.arbitrary()?),
    5 => Value::I32(u.arbitrary()?),
    6 => Value::U32(u.arbitrary()?),
    7 => Value::I64(u.arbitrary()?),
    8 => Value::U64(u.arbitrary()?),
    9 => Value::Int(u.arbitrary()?),
    10 => Value::F32(u.arbitrary()?),
    11 => Value::F64(u.arbitrary()?),
    12 => Value::String(u.arbitrary()?),
    13 => Value::Bytes(u.arbitrary()?),
    14 => {
      let len = u.int_in_range(0 ..= 5)?;
      let mut items = Vec::with_capacity(len);
      for _ in 0 .. len {
        items.push(arbitrary_value(u, depth + 1)?);
      }
      Value::Array(items)
    },
    15 => {
      let len = u.int_in_range(0 ..= 3)?;
      let mut map = BTreeMap::new();
      for _ in 0 .. len {
        map.insert(u.arbitrary()?, arbitrary_value(u, depth + 1)?);
      }
      Value::Map(map)
    },
    _ => Value::U64(u.arbitrary()?)
      .to_json()
      .map_or_else(|_| Value::default(), Value::Json),
  })
}

/// Feeds arbitrary bytes through every read path. None of them may panic.
pub fn run_decode_fuzz_test(data: &[u8]) {
  let _ignored = Decoder::new(data).decode_multiple();
  let _ignored = Decoder::new(data).with_max_depth(8).decode();
  let _ignored = read_array_envelope(data).and_then(|envelope| envelope.decode());
  let _ignored = for_each_row(data, |_, _| Ok(()));
  let _ignored = ValueMessage::default().unmarshal(data);
}

/// Encodes the value, decodes it again and checks that re-encoding the result reproduces the same
/// bytes. Also checks the size-then-fill contract against the same bytes.
pub fn run_round_trip_fuzz_test(test_case: &RoundTripFuzzTestCase) {
  let RoundTripFuzzTestCase {
    field_number,
    value,
  } = test_case;

  let Ok(bytes) = encode_to_vec(*field_number, value) else {
    return;
  };
  log::trace!("round tripping {} bytes", bytes.len());

  let (rest, decoded) = decode(&bytes).unwrap();
  assert!(rest.is_empty());
  assert_eq!(encode_to_vec(*field_number, &decoded).unwrap(), bytes);

  let mut cache = SizeCache::new();
  let size = cache.size(*field_number, value);
  assert_eq!(size, bytes.len());

  let mut short = vec![0; size - 1];
  assert!(cache.marshal_into(&mut short, *field_number, value).is_err());

  let mut destination = vec![0; size];
  assert_eq!(
    cache
      .marshal_into(&mut destination, *field_number, value)
      .unwrap(),
    size
  );
  assert_eq!(destination, bytes);
}
