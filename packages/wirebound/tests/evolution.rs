//! Schema evolution in compatible mode: peers add and remove fields
//! independently, match by tag id or name, and fill absences with
//! defaults.

use wirebound::types::{STRING, VARINT32, VARINT64};
use wirebound::{Codec, FieldInfo, FieldType, Mode, Record, TypeKey, Value};


fn writer_person_fields() -> Vec<FieldInfo> {
    vec![
        FieldInfo::named("name", FieldType::new(STRING).nullable()),
        FieldInfo::named("age", FieldType::new(VARINT32)),
    ]
}

fn person(key: &TypeKey, name: &str, age: i32) -> Value {
    let mut record = Record::new(key.clone());
    record.set("name", Value::String(name.into()));
    record.set("age", Value::VarInt32(age));
    Value::record(record)
}

fn expect_struct(value: Value) -> Record {
    match value {
        Value::Struct(cell) => cell.borrow().clone(),
        other => panic!("expected a struct, got {:?}", other),
    }
}

#[test]
fn reader_with_added_field_gets_the_default() {
    let mut writer = Codec::new().mode(Mode::Compatible);
    let key = writer.register_struct(1, writer_person_fields()).unwrap();
    let bytes = writer.serialize(&person(&key, "ada", 36)).unwrap();

    let mut reader = Codec::new().mode(Mode::Compatible);
    reader
        .register_struct(
            1,
            vec![
                FieldInfo::named("name", FieldType::new(STRING).nullable()),
                FieldInfo::named("age", FieldType::new(VARINT32)),
                FieldInfo::named("nickname", FieldType::new(STRING)),
            ],
        )
        .unwrap();

    let record = expect_struct(reader.deserialize(&bytes).unwrap());
    assert_eq!(record.get("name"), Some(&Value::String("ada".into())));
    assert_eq!(record.get("age"), Some(&Value::VarInt32(36)));
    assert_eq!(record.get("nickname"), Some(&Value::String(String::new())));
}

#[test]
fn reader_with_removed_field_drops_the_payload() {
    let mut writer = Codec::new().mode(Mode::Compatible);
    writer
        .register_struct(
            1,
            vec![
                FieldInfo::named("name", FieldType::new(STRING).nullable()),
                FieldInfo::named("age", FieldType::new(VARINT32)),
                FieldInfo::named("legacy", FieldType::new(VARINT64)),
                FieldInfo::named("motto", FieldType::new(STRING).nullable()),
            ],
        )
        .unwrap();
    let mut record = Record::new(TypeKey::Id(1));
    record.set("name", Value::String("ida".into()));
    record.set("age", Value::VarInt32(28));
    record.set("legacy", Value::VarInt64(-1));
    record.set("motto", Value::Null);
    let bytes = writer.serialize(&Value::record(record)).unwrap();

    let mut reader = Codec::new().mode(Mode::Compatible);
    reader.register_struct(1, writer_person_fields()).unwrap();
    let decoded = expect_struct(reader.deserialize(&bytes).unwrap());
    assert_eq!(decoded.get("name"), Some(&Value::String("ida".into())));
    assert_eq!(decoded.get("age"), Some(&Value::VarInt32(28)));
    assert_eq!(decoded.get("legacy"), None);
    assert_eq!(decoded.get("motto"), None);
}

#[test]
fn tag_id_fields_match_across_renames() {
    let mut writer = Codec::new().mode(Mode::Compatible);
    writer
        .register_struct(
            1,
            vec![
                FieldInfo::tagged(0, "width", FieldType::new(VARINT32)),
                FieldInfo::tagged(1, "height", FieldType::new(VARINT32)),
            ],
        )
        .unwrap();
    let mut record = Record::new(TypeKey::Id(1));
    record.set("width", Value::VarInt32(640));
    record.set("height", Value::VarInt32(480));
    let bytes = writer.serialize(&Value::record(record)).unwrap();

    // the reader renamed both fields but kept the tag ids
    let mut reader = Codec::new().mode(Mode::Compatible);
    reader
        .register_struct(
            1,
            vec![
                FieldInfo::tagged(0, "w", FieldType::new(VARINT32)),
                FieldInfo::tagged(1, "h", FieldType::new(VARINT32)),
            ],
        )
        .unwrap();
    let decoded = expect_struct(reader.deserialize(&bytes).unwrap());
    assert_eq!(decoded.get("w"), Some(&Value::VarInt32(640)));
    assert_eq!(decoded.get("h"), Some(&Value::VarInt32(480)));
}

#[test]
fn named_registration_evolves_too() {
    let mut writer = Codec::new().mode(Mode::Compatible);
    let key = writer
        .register_struct_by_name("crm", "Contact", writer_person_fields())
        .unwrap();
    let bytes = writer.serialize(&person(&key, "mo", 51)).unwrap();

    let mut reader = Codec::new().mode(Mode::Compatible);
    reader
        .register_struct_by_name(
            "crm",
            "Contact",
            vec![
                FieldInfo::named("name", FieldType::new(STRING).nullable()),
                FieldInfo::named("age", FieldType::new(VARINT32)),
                FieldInfo::named("email", FieldType::new(STRING).nullable()),
            ],
        )
        .unwrap();
    let decoded = expect_struct(reader.deserialize(&bytes).unwrap());
    assert_eq!(decoded.get("name"), Some(&Value::String("mo".into())));
    assert_eq!(decoded.get("email"), Some(&Value::Null));
}

#[test]
fn container_fields_evolve_with_their_declared_types() {
    let mut writer = Codec::new().mode(Mode::Compatible);
    writer
        .register_struct(
            1,
            vec![
                FieldInfo::named(
                    "scores",
                    FieldType::new(wirebound::types::LIST)
                        .with_generics(vec![FieldType::new(VARINT32)]),
                ),
                FieldInfo::named("label", FieldType::new(STRING)),
            ],
        )
        .unwrap();
    let mut record = Record::new(TypeKey::Id(1));
    record.set(
        "scores",
        Value::List(vec![Value::VarInt32(9), Value::VarInt32(8)]),
    );
    record.set("label", Value::String("run".into()));
    let bytes = writer.serialize(&Value::record(record)).unwrap();

    // reader dropped the list and only kept the label
    let mut reader = Codec::new().mode(Mode::Compatible);
    reader
        .register_struct(
            1,
            vec![FieldInfo::named("label", FieldType::new(STRING))],
        )
        .unwrap();
    let decoded = expect_struct(reader.deserialize(&bytes).unwrap());
    assert_eq!(decoded.get("label"), Some(&Value::String("run".into())));
    assert_eq!(decoded.get("scores"), None);
}

#[test]
fn same_schema_compatible_round_trip() {
    let mut codec = Codec::new().mode(Mode::Compatible).ref_tracking(true);
    let key = codec.register_struct(1, writer_person_fields()).unwrap();
    let value = person(&key, "rex", 3);
    let bytes = codec.serialize(&value).unwrap();
    assert_eq!(codec.deserialize(&bytes).unwrap(), value);
}
