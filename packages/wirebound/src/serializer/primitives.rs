//! Scalar payloads: fixed-width, varint, and tagged integer lanes plus
//! the four float widths.

use crate::buffer::Buffer;
use crate::error::{bail, Result};
use crate::types;
use crate::value::Value;
use half::{bf16, f16};


/// Write a scalar payload. Callers dispatch on the value, so a
/// non-scalar here is a bug.
pub fn write_primitive(buffer: &mut Buffer, value: &Value) {
    match value {
        Value::Bool(v) => buffer.write_bool(*v),
        Value::Int8(v) => buffer.write_i8(*v),
        Value::Int16(v) => buffer.write_i16(*v),
        Value::Int32(v) => buffer.write_i32(*v),
        Value::VarInt32(v) => buffer.write_var_int32(*v),
        Value::Int64(v) => buffer.write_i64(*v),
        Value::VarInt64(v) => buffer.write_var_int64(*v),
        Value::TaggedInt64(v) => buffer.write_tagged_int64(*v),
        Value::UInt8(v) => buffer.write_u8(*v),
        Value::UInt16(v) => buffer.write_u16(*v),
        Value::UInt32(v) => buffer.write_u32(*v),
        Value::VarUInt32(v) => buffer.write_var_uint32(*v),
        Value::UInt64(v) => buffer.write_u64(*v),
        Value::VarUInt64(v) => buffer.write_var_uint64(*v),
        Value::TaggedUInt64(v) => buffer.write_tagged_uint64(*v),
        Value::Float16(v) => buffer.write_u16(v.to_bits()),
        Value::BFloat16(v) => buffer.write_u16(v.to_bits()),
        Value::Float32(v) => buffer.write_f32(*v),
        Value::Float64(v) => buffer.write_f64(*v),
        other => unreachable!("not a scalar: {:?}", other),
    }
}

pub fn read_primitive(buffer: &mut Buffer, type_id: u32) -> Result<Value> {
    Ok(match type_id {
        types::BOOL => Value::Bool(buffer.read_bool()?),
        types::INT8 => Value::Int8(buffer.read_i8()?),
        types::INT16 => Value::Int16(buffer.read_i16()?),
        types::INT32 => Value::Int32(buffer.read_i32()?),
        types::VARINT32 => Value::VarInt32(buffer.read_var_int32()?),
        types::INT64 => Value::Int64(buffer.read_i64()?),
        types::VARINT64 => Value::VarInt64(buffer.read_var_int64()?),
        types::TAGGED_INT64 => Value::TaggedInt64(buffer.read_tagged_int64()?),
        types::UINT8 => Value::UInt8(buffer.read_u8()?),
        types::UINT16 => Value::UInt16(buffer.read_u16()?),
        types::UINT32 => Value::UInt32(buffer.read_u32()?),
        types::VAR_UINT32 => Value::VarUInt32(buffer.read_var_uint32()?),
        types::UINT64 => Value::UInt64(buffer.read_u64()?),
        types::VAR_UINT64 => Value::VarUInt64(buffer.read_var_uint64()?),
        types::TAGGED_UINT64 => Value::TaggedUInt64(buffer.read_tagged_uint64()?),
        types::FLOAT16 => Value::Float16(f16::from_bits(buffer.read_u16()?)),
        types::BFLOAT16 => Value::BFloat16(bf16::from_bits(buffer.read_u16()?)),
        types::FLOAT32 => Value::Float32(buffer.read_f32()?),
        types::FLOAT64 => Value::Float64(buffer.read_f64()?),
        id => bail!(InvalidData, "tag {} is not a scalar", id),
    })
}
