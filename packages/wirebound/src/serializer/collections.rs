//! List and set payloads: an element count, a flags byte, optional
//! one-shot element type info, then the elements.

use crate::error::{ensure, Result};
use crate::meta::FieldType;
use crate::resolver::type_resolver::TypeKey;
use crate::resolver::{ReadContext, WriteContext};
use crate::serializer::{
    read_any, read_data, read_declared_payload, read_type_info, read_with_mode, write_any,
    write_data, write_declared_payload, write_type_info, WireType,
};
use crate::types::{self, is_internal_type, RefFlag, RefMode};
use crate::value::Value;


pub const HEADER_TRACK_REF: u8 = 1 << 0;
pub const HEADER_HAS_NULL: u8 = 1 << 1;
pub const HEADER_DECLARED_TYPE: u8 = 1 << 2;
pub const HEADER_SAME_TYPE: u8 = 1 << 3;

/// Key under which two values count as "the same runtime type" for the
/// `same_type` header bit and for map chunking. `None` for nulls.
pub(crate) fn group_key(value: &Value) -> Option<(u32, Option<TypeKey>)> {
    match value {
        Value::Null => None,
        Value::Struct(cell) => Some((types::STRUCT, Some(cell.borrow().type_key().clone()))),
        Value::Enum(e) => Some((types::ENUM, Some(e.type_key.clone()))),
        Value::Ext(e) => Some((types::EXT, Some(e.type_key.clone()))),
        other => Some((other.internal_type_id().unwrap(), None)),
    }
}

/// First non-null element, if every non-null element shares its runtime
/// type.
fn uniform_element(elems: &[Value]) -> Option<&Value> {
    let mut found: Option<(&Value, (u32, Option<TypeKey>))> = None;
    for elem in elems {
        let Some(key) = group_key(elem) else {
            continue;
        };
        match &found {
            None => found = Some((elem, key)),
            Some((_, first_key)) if *first_key == key => {}
            Some(_) => return None,
        }
    }
    found.map(|(elem, _)| elem)
}

pub fn write_collection(
    ctx: &mut WriteContext,
    kind: u32,
    elems: &[Value],
    declared: Option<&FieldType>,
) -> Result<()> {
    debug_assert!(matches!(kind, types::LIST | types::SET));
    ctx.buffer.write_var_uint32(elems.len() as u32);

    let declared_type = declared.filter(|d| is_internal_type(d.type_id));
    let has_null = elems.iter().any(Value::is_null);
    let track_ref = ctx.config.ref_tracking
        && match declared {
            Some(d) => d.track_ref,
            None => elems.iter().any(Value::is_trackable),
        };
    let uniform = if declared_type.is_none() {
        uniform_element(elems)
    } else {
        None
    };

    let mut header = 0u8;
    if track_ref {
        header |= HEADER_TRACK_REF;
    }
    if has_null {
        header |= HEADER_HAS_NULL;
    }
    if declared_type.is_some() {
        header |= HEADER_DECLARED_TYPE;
    }
    if uniform.is_some() {
        header |= HEADER_SAME_TYPE;
    }
    ctx.buffer.write_u8(header);

    if let Some(representative) = uniform {
        write_type_info(ctx, representative)?;
    }
    let typed_once = uniform.is_some();

    for elem in elems {
        if track_ref {
            let need = ctx
                .refs
                .write_ref_or_null(ctx.buffer, elem, RefMode::Tracking)?;
            if need {
                write_element_payload(ctx, elem, declared_type, typed_once)?;
            }
        } else if has_null {
            if elem.is_null() {
                ctx.buffer.write_i8(RefFlag::Null.into());
            } else {
                ctx.buffer.write_i8(RefFlag::NotNullValue.into());
                write_element_payload(ctx, elem, declared_type, typed_once)?;
            }
        } else {
            write_element_payload(ctx, elem, declared_type, typed_once)?;
        }
    }
    Ok(())
}

fn write_element_payload(
    ctx: &mut WriteContext,
    elem: &Value,
    declared_type: Option<&FieldType>,
    typed_once: bool,
) -> Result<()> {
    if let Some(d) = declared_type {
        write_declared_payload(ctx, elem, d)
    } else if typed_once {
        write_data(ctx, elem)
    } else {
        write_any(ctx, elem)
    }
}

pub fn read_collection(
    ctx: &mut ReadContext,
    kind: u32,
    declared: Option<&FieldType>,
) -> Result<Value> {
    let count = ctx.buffer.read_var_uint32()? as usize;
    ctx.check_collection_len(count)?;
    let header = ctx.buffer.read_u8()?;
    let track_ref = header & HEADER_TRACK_REF != 0;
    let has_null = header & HEADER_HAS_NULL != 0;
    let declared_bit = header & HEADER_DECLARED_TYPE != 0;
    let same_type = header & HEADER_SAME_TYPE != 0;

    let declared_type = declared.filter(|d| is_internal_type(d.type_id));
    if declared_bit {
        ensure!(
            declared_type.is_some(),
            InvalidData,
            "declared element type bit without a declared schema",
        );
    }
    let element_wire = if same_type && !declared_bit {
        Some(read_type_info(ctx)?)
    } else {
        None
    };

    let mut elems = Vec::with_capacity(count);
    for _ in 0..count {
        let elem = if track_ref {
            read_with_mode(ctx, RefMode::Tracking, |ctx| {
                read_element_payload(ctx, declared_bit.then_some(declared_type).flatten(), element_wire.as_ref())
            })?
        } else if has_null {
            read_with_mode(ctx, RefMode::NullOnly, |ctx| {
                read_element_payload(ctx, declared_bit.then_some(declared_type).flatten(), element_wire.as_ref())
            })?
        } else {
            read_element_payload(
                ctx,
                declared_bit.then_some(declared_type).flatten(),
                element_wire.as_ref(),
            )?
        };
        elems.push(elem);
    }
    Ok(if kind == types::SET {
        Value::Set(elems)
    } else {
        Value::List(elems)
    })
}

fn read_element_payload(
    ctx: &mut ReadContext,
    declared_type: Option<&FieldType>,
    element_wire: Option<&WireType>,
) -> Result<Value> {
    if let Some(d) = declared_type {
        read_declared_payload(ctx, d)
    } else if let Some(wire) = element_wire {
        read_data(ctx, wire)
    } else {
        read_any(ctx)
    }
}
