//! Primitive-array fast paths: a byte-length prefix and the raw
//! little-endian lanes, bypassing the general list layout.

use crate::buffer::Buffer;
use crate::error::{bail, ensure, Result};
use crate::resolver::ReadContext;
use crate::types;
use crate::value::Value;
use half::{bf16, f16};


macro_rules! write_lanes {
    ($buffer:ident, $vals:ident, $width:expr, $write:ident) => {{
        $buffer.write_var_uint32(($vals.len() * $width) as u32);
        $buffer.$write($vals);
    }};
}

pub fn write_array(buffer: &mut Buffer, value: &Value) {
    match value {
        Value::Binary(bytes) => {
            buffer.write_var_uint32(bytes.len() as u32);
            buffer.write_bytes(bytes);
        }
        Value::BoolArray(vals) => {
            buffer.write_var_uint32(vals.len() as u32);
            for &v in vals {
                buffer.write_bool(v);
            }
        }
        Value::Int8Array(vals) => write_lanes!(buffer, vals, 1, write_i8_slice),
        Value::Int16Array(vals) => write_lanes!(buffer, vals, 2, write_i16_slice),
        Value::Int32Array(vals) => write_lanes!(buffer, vals, 4, write_i32_slice),
        Value::Int64Array(vals) => write_lanes!(buffer, vals, 8, write_i64_slice),
        Value::UInt16Array(vals) => write_lanes!(buffer, vals, 2, write_u16_slice),
        Value::UInt32Array(vals) => write_lanes!(buffer, vals, 4, write_u32_slice),
        Value::UInt64Array(vals) => write_lanes!(buffer, vals, 8, write_u64_slice),
        Value::Float32Array(vals) => write_lanes!(buffer, vals, 4, write_f32_slice),
        Value::Float64Array(vals) => write_lanes!(buffer, vals, 8, write_f64_slice),
        Value::Float16Array(vals) => {
            buffer.write_var_uint32((vals.len() * 2) as u32);
            let bits: Vec<u16> = vals.iter().map(|v| v.to_bits()).collect();
            buffer.write_u16_slice(&bits);
        }
        Value::BFloat16Array(vals) => {
            buffer.write_var_uint32((vals.len() * 2) as u32);
            let bits: Vec<u16> = vals.iter().map(|v| v.to_bits()).collect();
            buffer.write_u16_slice(&bits);
        }
        other => unreachable!("not a primitive array: {:?}", other),
    }
}

pub fn read_array(ctx: &mut ReadContext, type_id: u32) -> Result<Value> {
    let byte_len = ctx.buffer.read_var_uint32()? as usize;
    ctx.check_binary_len(byte_len)?;
    let width = match type_id {
        types::BINARY | types::BOOL_ARRAY | types::INT8_ARRAY => 1,
        types::INT16_ARRAY | types::UINT16_ARRAY | types::FLOAT16_ARRAY
        | types::BFLOAT16_ARRAY => 2,
        types::INT32_ARRAY | types::UINT32_ARRAY | types::FLOAT32_ARRAY => 4,
        types::INT64_ARRAY | types::UINT64_ARRAY | types::FLOAT64_ARRAY => 8,
        id => bail!(InvalidData, "tag {} is not a primitive array", id),
    };
    ensure!(
        byte_len % width == 0,
        InvalidData,
        "array byte length {} not a multiple of element width {}",
        byte_len,
        width,
    );
    let count = byte_len / width;
    Ok(match type_id {
        types::BINARY => Value::Binary(ctx.buffer.read_bytes(byte_len)?.to_vec()),
        types::BOOL_ARRAY => Value::BoolArray(
            ctx.buffer
                .read_bytes(byte_len)?
                .iter()
                .map(|&b| b != 0)
                .collect(),
        ),
        types::INT8_ARRAY => Value::Int8Array(ctx.buffer.read_i8_slice(count)?),
        types::INT16_ARRAY => Value::Int16Array(ctx.buffer.read_i16_slice(count)?),
        types::INT32_ARRAY => Value::Int32Array(ctx.buffer.read_i32_slice(count)?),
        types::INT64_ARRAY => Value::Int64Array(ctx.buffer.read_i64_slice(count)?),
        types::UINT16_ARRAY => Value::UInt16Array(ctx.buffer.read_u16_slice(count)?),
        types::UINT32_ARRAY => Value::UInt32Array(ctx.buffer.read_u32_slice(count)?),
        types::UINT64_ARRAY => Value::UInt64Array(ctx.buffer.read_u64_slice(count)?),
        types::FLOAT16_ARRAY => Value::Float16Array(
            ctx.buffer
                .read_u16_slice(count)?
                .into_iter()
                .map(f16::from_bits)
                .collect(),
        ),
        types::BFLOAT16_ARRAY => Value::BFloat16Array(
            ctx.buffer
                .read_u16_slice(count)?
                .into_iter()
                .map(bf16::from_bits)
                .collect(),
        ),
        types::FLOAT32_ARRAY => Value::Float32Array(ctx.buffer.read_f32_slice(count)?),
        types::FLOAT64_ARRAY => Value::Float64Array(ctx.buffer.read_f64_slice(count)?),
        _ => unreachable!(),
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Config;
    use crate::resolver::TypeResolver;

    fn round_trip(value: Value) -> Vec<u8> {
        let mut buffer = Buffer::new();
        write_array(&mut buffer, &value);
        let bytes = buffer.dump();
        let resolver = TypeResolver::new();
        let config = Config::default();
        let mut read_buffer = Buffer::from_slice(&bytes);
        let mut ctx = ReadContext::new(&mut read_buffer, &resolver, &config);
        let decoded = read_array(&mut ctx, value.internal_type_id().unwrap()).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(ctx.buffer.remaining(), 0);
        bytes
    }

    #[test]
    fn int32_lane_layout() {
        // three elements: byte length 12 then little-endian lanes
        let bytes = round_trip(Value::Int32Array(vec![1, 2, 3]));
        assert_eq!(
            bytes,
            vec![12, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0],
        );
    }

    #[test]
    fn all_lanes_round_trip() {
        round_trip(Value::Binary(vec![1, 2, 255]));
        round_trip(Value::BoolArray(vec![true, false, true]));
        round_trip(Value::Int8Array(vec![-1, 0, 1]));
        round_trip(Value::Int16Array(vec![-300, 300]));
        round_trip(Value::Int64Array(vec![i64::MIN, i64::MAX]));
        round_trip(Value::UInt16Array(vec![0, u16::MAX]));
        round_trip(Value::UInt32Array(vec![u32::MAX]));
        round_trip(Value::UInt64Array(vec![u64::MAX, 0]));
        round_trip(Value::Float16Array(vec![
            f16::from_f32(0.5),
            f16::from_f32(-2.0),
        ]));
        round_trip(Value::BFloat16Array(vec![bf16::from_f32(1.0)]));
        round_trip(Value::Float32Array(vec![1.5, -1.5]));
        round_trip(Value::Float64Array(vec![f64::MIN, f64::MAX]));
        round_trip(Value::Binary(Vec::new()));
    }

    #[test]
    fn misaligned_byte_length_rejected() {
        let resolver = TypeResolver::new();
        let config = Config::default();
        let mut buffer = Buffer::from_bytes(vec![5, 0, 0, 0, 0, 0]);
        let mut ctx = ReadContext::new(&mut buffer, &resolver, &config);
        assert!(read_array(&mut ctx, types::INT32_ARRAY).is_err());
    }
}
