//! Map payloads: an entry count followed by chunks. Entries with a null
//! key or value travel alone in a headers-only chunk; runs of non-null
//! entries whose sides keep their runtime types share one chunk of up to
//! 255 pairs with the side type info written once.

use crate::error::{bail, ensure, Result};
use crate::meta::FieldType;
use crate::resolver::{ReadContext, WriteContext};
use crate::serializer::collections::group_key;
use crate::serializer::{
    read_any, read_data, read_declared_payload, read_type_info, read_with_mode, write_any,
    write_data, write_declared_payload, write_type_info, WireType,
};
use crate::types::{is_internal_type, RefMode};
use crate::value::Value;


pub const HEADER_KEY_TRACK_REF: u8 = 1 << 0;
pub const HEADER_KEY_NULL: u8 = 1 << 1;
pub const HEADER_KEY_DECLARED: u8 = 1 << 2;
pub const HEADER_VALUE_TRACK_REF: u8 = 1 << 3;
pub const HEADER_VALUE_NULL: u8 = 1 << 4;
pub const HEADER_VALUE_DECLARED: u8 = 1 << 5;

const MAX_CHUNK: usize = 255;

pub fn write_map(
    ctx: &mut WriteContext,
    entries: &[(Value, Value)],
    declared: Option<(&FieldType, &FieldType)>,
) -> Result<()> {
    ctx.buffer.write_var_uint32(entries.len() as u32);
    let declared_key = declared.map(|(k, _)| k).filter(|d| is_internal_type(d.type_id));
    let declared_value = declared.map(|(_, v)| v).filter(|d| is_internal_type(d.type_id));

    let mut i = 0;
    while i < entries.len() {
        let (key, value) = &entries[i];
        if key.is_null() || value.is_null() {
            let mut header = 0u8;
            if key.is_null() {
                header |= HEADER_KEY_NULL;
            } else if declared_key.is_some() {
                header |= HEADER_KEY_DECLARED;
            }
            if value.is_null() {
                header |= HEADER_VALUE_NULL;
            } else if declared_value.is_some() {
                header |= HEADER_VALUE_DECLARED;
            }
            ctx.buffer.write_u8(header);
            if !key.is_null() {
                write_single_side(ctx, key, declared_key)?;
            }
            if !value.is_null() {
                write_single_side(ctx, value, declared_value)?;
            }
            i += 1;
            continue;
        }

        let key_group = group_key(key);
        let value_group = group_key(value);
        let mut chunk_len = 1;
        while chunk_len < MAX_CHUNK && i + chunk_len < entries.len() {
            let (next_key, next_value) = &entries[i + chunk_len];
            if next_key.is_null() || next_value.is_null() {
                break;
            }
            if group_key(next_key) != key_group || group_key(next_value) != value_group {
                break;
            }
            chunk_len += 1;
        }

        let key_track = ctx.config.ref_tracking
            && declared
                .map(|(k, _)| k.track_ref)
                .unwrap_or_else(|| key.is_trackable());
        let value_track = ctx.config.ref_tracking
            && declared
                .map(|(_, v)| v.track_ref)
                .unwrap_or_else(|| value.is_trackable());

        let mut header = 0u8;
        if key_track {
            header |= HEADER_KEY_TRACK_REF;
        }
        if declared_key.is_some() {
            header |= HEADER_KEY_DECLARED;
        }
        if value_track {
            header |= HEADER_VALUE_TRACK_REF;
        }
        if declared_value.is_some() {
            header |= HEADER_VALUE_DECLARED;
        }
        ctx.buffer.write_u8(header);
        ctx.buffer.write_u8(chunk_len as u8);
        if declared_key.is_none() {
            write_type_info(ctx, key)?;
        }
        if declared_value.is_none() {
            write_type_info(ctx, value)?;
        }
        for (key, value) in &entries[i..i + chunk_len] {
            write_chunk_side(ctx, key, key_track, declared_key)?;
            write_chunk_side(ctx, value, value_track, declared_value)?;
        }
        i += chunk_len;
    }
    Ok(())
}

/// Null-partner side of a lone entry: full type info unless declared.
fn write_single_side(
    ctx: &mut WriteContext,
    value: &Value,
    declared: Option<&FieldType>,
) -> Result<()> {
    match declared {
        Some(d) => write_declared_payload(ctx, value, d),
        None => write_any(ctx, value),
    }
}

/// Chunked side: the type was pinned by the chunk header, so the payload
/// is bare (with an optional ref flag).
fn write_chunk_side(
    ctx: &mut WriteContext,
    value: &Value,
    track: bool,
    declared: Option<&FieldType>,
) -> Result<()> {
    if track {
        let need = ctx
            .refs
            .write_ref_or_null(ctx.buffer, value, RefMode::Tracking)?;
        if !need {
            return Ok(());
        }
    }
    match declared {
        Some(d) => write_declared_payload(ctx, value, d),
        None => write_data(ctx, value),
    }
}

pub fn read_map(
    ctx: &mut ReadContext,
    declared: Option<(&FieldType, &FieldType)>,
) -> Result<Value> {
    let count = ctx.buffer.read_var_uint32()? as usize;
    ctx.check_collection_len(count)?;
    let declared_key = declared.map(|(k, _)| k).filter(|d| is_internal_type(d.type_id));
    let declared_value = declared.map(|(_, v)| v).filter(|d| is_internal_type(d.type_id));

    let mut entries = Vec::with_capacity(count);
    while entries.len() < count {
        let header = ctx.buffer.read_u8()?;
        let key_null = header & HEADER_KEY_NULL != 0;
        let value_null = header & HEADER_VALUE_NULL != 0;
        let key_declared = header & HEADER_KEY_DECLARED != 0;
        let value_declared = header & HEADER_VALUE_DECLARED != 0;
        if key_declared {
            ensure!(
                declared_key.is_some(),
                InvalidData,
                "declared map key type bit without a declared schema",
            );
        }
        if value_declared {
            ensure!(
                declared_value.is_some(),
                InvalidData,
                "declared map value type bit without a declared schema",
            );
        }

        if key_null || value_null {
            let key = if key_null {
                Value::Null
            } else {
                read_single_side(ctx, key_declared.then_some(declared_key).flatten())?
            };
            let value = if value_null {
                Value::Null
            } else {
                read_single_side(ctx, value_declared.then_some(declared_value).flatten())?
            };
            entries.push((key, value));
            continue;
        }

        let key_track = header & HEADER_KEY_TRACK_REF != 0;
        let value_track = header & HEADER_VALUE_TRACK_REF != 0;
        let chunk_len = ctx.buffer.read_u8()? as usize;
        ensure!(chunk_len >= 1, InvalidData, "empty map chunk");
        ensure!(
            entries.len() + chunk_len <= count,
            InvalidData,
            "map chunk of {} exceeds the {} remaining entries",
            chunk_len,
            count - entries.len(),
        );
        let key_wire = if key_declared {
            None
        } else {
            Some(read_type_info(ctx)?)
        };
        let value_wire = if value_declared {
            None
        } else {
            Some(read_type_info(ctx)?)
        };
        for _ in 0..chunk_len {
            let key = read_chunk_side(
                ctx,
                key_track,
                key_declared.then_some(declared_key).flatten(),
                key_wire.as_ref(),
            )?;
            let value = read_chunk_side(
                ctx,
                value_track,
                value_declared.then_some(declared_value).flatten(),
                value_wire.as_ref(),
            )?;
            entries.push((key, value));
        }
    }
    Ok(Value::Map(entries))
}

fn read_single_side(ctx: &mut ReadContext, declared: Option<&FieldType>) -> Result<Value> {
    match declared {
        Some(d) => read_declared_payload(ctx, d),
        None => read_any(ctx),
    }
}

fn read_chunk_side(
    ctx: &mut ReadContext,
    track: bool,
    declared: Option<&FieldType>,
    wire: Option<&WireType>,
) -> Result<Value> {
    let payload = |ctx: &mut ReadContext| match (declared, wire) {
        (Some(d), _) => read_declared_payload(ctx, d),
        (None, Some(w)) => read_data(ctx, w),
        (None, None) => bail!(InvalidData, "map chunk side without type information"),
    };
    if track {
        read_with_mode(ctx, RefMode::Tracking, payload)
    } else {
        payload(ctx)
    }
}
