//! Dynamic representation of data within the serialized data model,
//! analogous to `serde_json::Value` but covering the full wire palette:
//! fixed and variable-width integers, half-precision floats, temporal
//! values, typed primitive arrays, containers, and registered user types.
//!
//! Struct values live behind `Rc<RefCell<..>>` cells: the cell's pointer
//! identity is what the ref-tracking layer keys on, and the interior
//! mutability is what lets a decoder bind a cycle back to a struct whose
//! fields are still being read.

use crate::meta::FieldType;
use crate::resolver::type_resolver::TypeKey;
use crate::types;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use half::{bf16, f16};
use std::cell::RefCell;
use std::rc::Rc;


#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    VarInt32(i32),
    Int64(i64),
    VarInt64(i64),
    TaggedInt64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    VarUInt32(u32),
    UInt64(u64),
    VarUInt64(u64),
    TaggedUInt64(u64),
    Float16(f16),
    BFloat16(bf16),
    Float32(f32),
    Float64(f64),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Duration(TimeDelta),
    Binary(Vec<u8>),
    BoolArray(Vec<bool>),
    Int8Array(Vec<i8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    UInt16Array(Vec<u16>),
    UInt32Array(Vec<u32>),
    UInt64Array(Vec<u64>),
    Float16Array(Vec<f16>),
    BFloat16Array(Vec<bf16>),
    Float32Array(Vec<f32>),
    Float64Array(Vec<f64>),
    List(Vec<Value>),
    /// Insertion-ordered; the caller keeps elements distinct.
    Set(Vec<Value>),
    /// Insertion-ordered key/value pairs.
    Map(Vec<(Value, Value)>),
    Struct(Rc<RefCell<Record>>),
    Enum(EnumValue),
    Ext(ExtValue),
}

/// A struct value: its registered type plus named field values.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    type_key: TypeKey,
    fields: Vec<(String, Value)>,
}

/// An enum value is its registered type plus an ordinal.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumValue {
    pub type_key: TypeKey,
    pub ordinal: u32,
}

/// A value handled by a caller-registered serializer; `data` is whatever
/// shape that serializer reads and writes.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtValue {
    pub type_key: TypeKey,
    pub data: Box<Value>,
}

impl Record {
    pub fn new(type_key: TypeKey) -> Self {
        Record {
            type_key,
            fields: Vec::new(),
        }
    }

    pub fn with_fields(type_key: TypeKey, fields: Vec<(String, Value)>) -> Self {
        Record { type_key, fields }
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Insert or replace a field by name.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }
}

impl Value {
    /// Wrap a record in the shared cell that serialization works on.
    pub fn record(record: Record) -> Value {
        Value::Struct(Rc::new(RefCell::new(record)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Only struct cells carry the identity that ref tracking keys on.
    pub fn is_trackable(&self) -> bool {
        matches!(self, Value::Struct(_))
    }

    /// Wire kind of the runtime value, for everything whose kind does not
    /// depend on registration state. User types return `None`; the
    /// resolver decides their tag from the registration and mode.
    pub fn internal_type_id(&self) -> Option<u32> {
        Some(match self {
            Value::Null => types::NONE,
            Value::Bool(_) => types::BOOL,
            Value::Int8(_) => types::INT8,
            Value::Int16(_) => types::INT16,
            Value::Int32(_) => types::INT32,
            Value::VarInt32(_) => types::VARINT32,
            Value::Int64(_) => types::INT64,
            Value::VarInt64(_) => types::VARINT64,
            Value::TaggedInt64(_) => types::TAGGED_INT64,
            Value::UInt8(_) => types::UINT8,
            Value::UInt16(_) => types::UINT16,
            Value::UInt32(_) => types::UINT32,
            Value::VarUInt32(_) => types::VAR_UINT32,
            Value::UInt64(_) => types::UINT64,
            Value::VarUInt64(_) => types::VAR_UINT64,
            Value::TaggedUInt64(_) => types::TAGGED_UINT64,
            Value::Float16(_) => types::FLOAT16,
            Value::BFloat16(_) => types::BFLOAT16,
            Value::Float32(_) => types::FLOAT32,
            Value::Float64(_) => types::FLOAT64,
            Value::String(_) => types::STRING,
            Value::Date(_) => types::DATE,
            Value::Timestamp(_) => types::TIMESTAMP,
            Value::Duration(_) => types::DURATION,
            Value::Binary(_) => types::BINARY,
            Value::BoolArray(_) => types::BOOL_ARRAY,
            Value::Int8Array(_) => types::INT8_ARRAY,
            Value::Int16Array(_) => types::INT16_ARRAY,
            Value::Int32Array(_) => types::INT32_ARRAY,
            Value::Int64Array(_) => types::INT64_ARRAY,
            Value::UInt16Array(_) => types::UINT16_ARRAY,
            Value::UInt32Array(_) => types::UINT32_ARRAY,
            Value::UInt64Array(_) => types::UINT64_ARRAY,
            Value::Float16Array(_) => types::FLOAT16_ARRAY,
            Value::BFloat16Array(_) => types::BFLOAT16_ARRAY,
            Value::Float32Array(_) => types::FLOAT32_ARRAY,
            Value::Float64Array(_) => types::FLOAT64_ARRAY,
            Value::List(_) => types::LIST,
            Value::Set(_) => types::SET,
            Value::Map(_) => types::MAP,
            Value::Struct(_) | Value::Enum(_) | Value::Ext(_) => return None,
        })
    }

    /// Default a compatible-mode reader assigns to a local field the peer
    /// did not send.
    pub fn default_for(field_type: &FieldType) -> Value {
        if field_type.nullable {
            return Value::Null;
        }
        match field_type.type_id {
            types::BOOL => Value::Bool(false),
            types::INT8 => Value::Int8(0),
            types::INT16 => Value::Int16(0),
            types::INT32 => Value::Int32(0),
            types::VARINT32 => Value::VarInt32(0),
            types::INT64 => Value::Int64(0),
            types::VARINT64 => Value::VarInt64(0),
            types::TAGGED_INT64 => Value::TaggedInt64(0),
            types::UINT8 => Value::UInt8(0),
            types::UINT16 => Value::UInt16(0),
            types::UINT32 => Value::UInt32(0),
            types::VAR_UINT32 => Value::VarUInt32(0),
            types::UINT64 => Value::UInt64(0),
            types::VAR_UINT64 => Value::VarUInt64(0),
            types::TAGGED_UINT64 => Value::TaggedUInt64(0),
            types::FLOAT16 => Value::Float16(f16::ZERO),
            types::BFLOAT16 => Value::BFloat16(bf16::ZERO),
            types::FLOAT32 => Value::Float32(0.0),
            types::FLOAT64 => Value::Float64(0.0),
            types::STRING => Value::String(String::new()),
            types::BINARY => Value::Binary(Vec::new()),
            types::BOOL_ARRAY => Value::BoolArray(Vec::new()),
            types::INT8_ARRAY => Value::Int8Array(Vec::new()),
            types::INT16_ARRAY => Value::Int16Array(Vec::new()),
            types::INT32_ARRAY => Value::Int32Array(Vec::new()),
            types::INT64_ARRAY => Value::Int64Array(Vec::new()),
            types::UINT16_ARRAY => Value::UInt16Array(Vec::new()),
            types::UINT32_ARRAY => Value::UInt32Array(Vec::new()),
            types::UINT64_ARRAY => Value::UInt64Array(Vec::new()),
            types::FLOAT16_ARRAY => Value::Float16Array(Vec::new()),
            types::BFLOAT16_ARRAY => Value::BFloat16Array(Vec::new()),
            types::FLOAT32_ARRAY => Value::Float32Array(Vec::new()),
            types::FLOAT64_ARRAY => Value::Float64Array(Vec::new()),
            types::LIST => Value::List(Vec::new()),
            types::SET => Value::Set(Vec::new()),
            types::MAP => Value::Map(Vec::new()),
            _ => Value::Null,
        }
    }
}
