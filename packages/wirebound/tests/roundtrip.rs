//! End-to-end round trips through a configured codec: primitives,
//! strings, temporal values, primitive arrays, and containers.

use chrono::{DateTime, NaiveDate, TimeDelta};
use half::{bf16, f16};
use wirebound::{Codec, Error, Value};


fn round_trip(codec: &Codec, value: Value) -> Vec<u8> {
    let bytes = codec.serialize(&value).unwrap();
    let decoded = codec.deserialize(&bytes).unwrap();
    assert_eq!(decoded, value);
    bytes
}

#[test]
fn primitive_values() {
    let codec = Codec::new();
    for value in [
        Value::Bool(false),
        Value::Int8(-1),
        Value::Int16(12345),
        Value::Int32(-40000),
        Value::VarInt32(300),
        Value::Int64(i64::MAX),
        Value::VarInt64(-1),
        Value::TaggedInt64(1 << 40),
        Value::UInt8(7),
        Value::UInt16(u16::MAX),
        Value::UInt32(1),
        Value::VarUInt32(u32::MAX),
        Value::UInt64(u64::MAX),
        Value::VarUInt64(0),
        Value::TaggedUInt64(u64::MAX),
        Value::Float16(f16::from_f32(-0.5)),
        Value::BFloat16(bf16::from_f32(8.0)),
        Value::Float32(f32::MIN_POSITIVE),
        Value::Float64(-1234.5678),
    ] {
        round_trip(&codec, value);
    }
}

#[test]
fn varint32_scenario_bytes() {
    let codec = Codec::new().xlang(false);
    let bytes = round_trip(&codec, Value::VarInt32(300));
    assert_eq!(bytes, vec![0x00, 0x05, 0xd8, 0x04]);
}

#[test]
fn string_scenario_bytes() {
    let codec = Codec::new().xlang(false);
    let bytes = round_trip(&codec, Value::String("hi".into()));
    assert_eq!(bytes, vec![0x00, 0x0d, 0x0a, b'h', b'i']);
}

#[test]
fn string_values() {
    let codec = Codec::new();
    for s in ["", "plain ascii", "café au lait", "编码器测试", "🦀 mixed 编码"] {
        round_trip(&codec, Value::String(s.into()));
    }
}

#[test]
fn int32_array_scenario_bytes() {
    let codec = Codec::new().xlang(false);
    let bytes = round_trip(&codec, Value::Int32Array(vec![1, 2, 3]));
    assert_eq!(
        bytes,
        vec![0x00, 0x1c, 12, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0],
    );
}

#[test]
fn primitive_arrays() {
    let codec = Codec::new();
    round_trip(&codec, Value::Binary(vec![0, 1, 2, 255]));
    round_trip(&codec, Value::BoolArray(vec![true, true, false]));
    round_trip(&codec, Value::Int64Array(vec![i64::MIN, 0, i64::MAX]));
    round_trip(&codec, Value::Float64Array(vec![0.1, -0.1]));
    round_trip(
        &codec,
        Value::Float16Array(vec![f16::from_f32(1.0), f16::from_f32(-1.0)]),
    );
    round_trip(&codec, Value::UInt32Array(Vec::new()));
}

#[test]
fn temporal_values() {
    let codec = Codec::new();
    round_trip(
        &codec,
        Value::Date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()),
    );
    round_trip(
        &codec,
        Value::Timestamp(
            DateTime::from_timestamp(1_600_000_000, 42).unwrap().naive_utc(),
        ),
    );
    round_trip(
        &codec,
        Value::Duration(TimeDelta::new(3600, 999_999_999).unwrap()),
    );
}

#[test]
fn lists_preserve_order_and_nulls() {
    let codec = Codec::new();
    round_trip(
        &codec,
        Value::List(vec![
            Value::VarInt32(3),
            Value::VarInt32(1),
            Value::VarInt32(2),
        ]),
    );
    round_trip(
        &codec,
        Value::List(vec![
            Value::String("a".into()),
            Value::Null,
            Value::String("b".into()),
        ]),
    );
    // heterogenous elements force per-element type info
    round_trip(
        &codec,
        Value::List(vec![
            Value::VarInt32(1),
            Value::String("two".into()),
            Value::Float64(3.0),
        ]),
    );
    round_trip(&codec, Value::List(Vec::new()));
}

#[test]
fn nested_containers() {
    let codec = Codec::new();
    round_trip(
        &codec,
        Value::List(vec![
            Value::List(vec![Value::VarInt32(1)]),
            Value::List(vec![Value::VarInt32(2), Value::Null]),
        ]),
    );
    round_trip(
        &codec,
        Value::Set(vec![
            Value::String("x".into()),
            Value::String("y".into()),
        ]),
    );
}

#[test]
fn maps_preserve_association() {
    let codec = Codec::new();
    round_trip(
        &codec,
        Value::Map(vec![
            (Value::String("one".into()), Value::VarInt32(1)),
            (Value::String("two".into()), Value::VarInt32(2)),
        ]),
    );
    // null keys and values sit in their own chunks
    round_trip(
        &codec,
        Value::Map(vec![
            (Value::String("k".into()), Value::Null),
            (Value::Null, Value::VarInt32(9)),
            (Value::Null, Value::Null),
            (Value::String("t".into()), Value::VarInt32(3)),
        ]),
    );
    round_trip(&codec, Value::Map(Vec::new()));
}

#[test]
fn long_uniform_map_spans_chunks() {
    let codec = Codec::new();
    let entries: Vec<(Value, Value)> = (0..700)
        .map(|i| (Value::VarInt32(i), Value::VarInt64(i as i64 * 2)))
        .collect();
    round_trip(&codec, Value::Map(entries));
}

#[test]
fn mixed_type_map_splits_chunks() {
    let codec = Codec::new();
    round_trip(
        &codec,
        Value::Map(vec![
            (Value::VarInt32(1), Value::String("a".into())),
            (Value::VarInt32(2), Value::String("b".into())),
            (Value::String("three".into()), Value::Float64(3.0)),
            (Value::VarInt32(4), Value::String("d".into())),
        ]),
    );
}

#[test]
fn collection_length_cap_enforced() {
    let open = Codec::new();
    let bytes = open
        .serialize(&Value::List(vec![
            Value::VarInt32(1),
            Value::VarInt32(2),
            Value::VarInt32(3),
        ]))
        .unwrap();
    let capped = Codec::new().max_collection_length(2);
    assert!(matches!(
        capped.deserialize(&bytes),
        Err(Error::InvalidData(_)),
    ));
}

#[test]
fn binary_length_cap_enforced() {
    let open = Codec::new();
    let bytes = open.serialize(&Value::Binary(vec![0; 64])).unwrap();
    let capped = Codec::new().max_binary_length(16);
    assert!(matches!(
        capped.deserialize(&bytes),
        Err(Error::InvalidData(_)),
    ));
    let long_string = open
        .serialize(&Value::String("x".repeat(64)))
        .unwrap();
    assert!(matches!(
        capped.deserialize(&long_string),
        Err(Error::InvalidData(_)),
    ));
}

#[test]
fn nan_bit_patterns_survive() {
    let codec = Codec::new();
    let bits = 0x7ff4_0000_0000_0001u64;
    let bytes = codec
        .serialize(&Value::Float64(f64::from_bits(bits)))
        .unwrap();
    match codec.deserialize(&bytes).unwrap() {
        Value::Float64(v) => assert_eq!(v.to_bits(), bits),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn unknown_tag_rejected() {
    let codec = Codec::new().xlang(false);
    assert!(matches!(
        codec.deserialize(&[0x00, 0xfe]),
        Err(Error::InvalidData(_)),
    ));
}

#[test]
fn forged_map_chunk_overrun_rejected() {
    let codec = Codec::new().xlang(false);
    // map tag, one entry, non-null chunk header, chunk size 5
    let forged = [0x00, 0x27, 0x01, 0x00, 0x05];
    assert!(matches!(
        codec.deserialize(&forged),
        Err(Error::InvalidData(_)),
    ));
}

#[test]
fn forged_empty_map_chunk_rejected() {
    let codec = Codec::new().xlang(false);
    let forged = [0x00, 0x27, 0x01, 0x00, 0x00];
    assert!(matches!(
        codec.deserialize(&forged),
        Err(Error::InvalidData(_)),
    ));
}

#[test]
fn forged_declared_element_bit_rejected_at_top_level() {
    let codec = Codec::new().xlang(false);
    // list tag, one element, header with the declared-element-type bit:
    // a polymorphic position has no declared schema to read against
    let forged = [0x00, 0x25, 0x01, 0x04];
    assert!(matches!(
        codec.deserialize(&forged),
        Err(Error::InvalidData(_)),
    ));
}

#[test]
fn truncated_stream_is_out_of_bounds() {
    let codec = Codec::new().xlang(false);
    let mut bytes = codec.serialize(&Value::Int64(77)).unwrap();
    bytes.truncate(bytes.len() - 3);
    assert!(matches!(
        codec.deserialize(&bytes),
        Err(Error::OutOfBounds(_)),
    ));
}
