//! String payloads: a varuint36 header packing `(byte_len << 2) |
//! encoding`, then bytes in the smallest of LATIN-1, UTF-8, UTF-16LE.

use crate::buffer::Buffer;
use crate::error::{bail, ensure, Result};
use crate::resolver::ReadContext;
use crate::value::Value;


const ENCODING_LATIN1: u64 = 0;
const ENCODING_UTF16: u64 = 1;
const ENCODING_UTF8: u64 = 2;

/// Pick the smallest byte form; ties go to UTF-8, so ASCII is always
/// UTF-8.
pub fn write_string(buffer: &mut Buffer, s: &str) {
    let utf8_len = s.len();
    let mut encoding = ENCODING_UTF8;
    let mut byte_len = utf8_len;
    if s.chars().all(|c| (c as u32) < 0x100) {
        let latin1_len = s.chars().count();
        if latin1_len < byte_len {
            encoding = ENCODING_LATIN1;
            byte_len = latin1_len;
        }
    }
    let utf16_len = 2 * s.encode_utf16().count();
    if utf16_len < byte_len {
        encoding = ENCODING_UTF16;
        byte_len = utf16_len;
    }

    buffer.write_var_uint36((byte_len as u64) << 2 | encoding);
    match encoding {
        ENCODING_UTF8 => buffer.write_bytes(s.as_bytes()),
        ENCODING_LATIN1 => {
            for c in s.chars() {
                buffer.write_u8(c as u8);
            }
        }
        _ => {
            for unit in s.encode_utf16() {
                buffer.write_u16(unit);
            }
        }
    }
}

pub fn read_string(ctx: &mut ReadContext) -> Result<Value> {
    let header = ctx.buffer.read_var_uint36()?;
    let encoding = header & 0x3;
    let byte_len = (header >> 2) as usize;
    ctx.check_binary_len(byte_len)?;
    let s = match encoding {
        ENCODING_LATIN1 => ctx
            .buffer
            .read_bytes(byte_len)?
            .iter()
            .map(|&b| b as char)
            .collect(),
        ENCODING_UTF8 => {
            String::from_utf8(ctx.buffer.read_bytes(byte_len)?.to_vec())
                .map_err(|e| crate::error::error!(InvalidData, "string not utf8: {}", e))?
        }
        ENCODING_UTF16 => {
            ensure!(
                byte_len % 2 == 0,
                InvalidData,
                "odd byte count {} for a utf16 string",
                byte_len,
            );
            let units = ctx.buffer.read_u16_slice(byte_len / 2)?;
            String::from_utf16(&units)
                .map_err(|e| crate::error::error!(InvalidData, "string not utf16: {}", e))?
        }
        other => bail!(InvalidData, "unknown string encoding {}", other),
    };
    Ok(Value::String(s))
}
