//! Dispatch between wire tags and per-kind payload readers and writers.
//!
//! `write_any`/`read_any` carry full type info and cover polymorphic
//! positions (the root value, untyped fields, per-element container
//! slots). Declared positions inside struct fields and containers skip
//! the type info for internal kinds; user kinds always carry it, since
//! the runtime type may be any registered one.

pub mod arrays;
pub mod collections;
pub mod enums;
pub mod ext;
pub mod maps;
pub mod primitives;
pub mod strings;
pub mod structs;
pub mod temporal;
pub mod type_info;

pub use type_info::{read_type_info, write_type_info, WireType};

use crate::error::{bail, Result};
use crate::meta::FieldType;
use crate::resolver::type_resolver::Dispatch;
use crate::resolver::{ReadContext, WriteContext};
use crate::types::{self, field_needs_type_info, RefFlag, RefMode};
use crate::value::Value;


/// Type info plus payload.
pub fn write_any(ctx: &mut WriteContext, value: &Value) -> Result<()> {
    write_type_info(ctx, value)?;
    write_data(ctx, value)
}

pub fn read_any(ctx: &mut ReadContext) -> Result<Value> {
    let wire = read_type_info(ctx)?;
    read_data(ctx, &wire)
}

/// Payload only; the receiver knows the type from context.
pub fn write_data(ctx: &mut WriteContext, value: &Value) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::String(s) => {
            strings::write_string(ctx.buffer, s);
            Ok(())
        }
        Value::Date(_) | Value::Timestamp(_) | Value::Duration(_) => {
            temporal::write_temporal(ctx.buffer, value)
        }
        Value::Binary(_)
        | Value::BoolArray(_)
        | Value::Int8Array(_)
        | Value::Int16Array(_)
        | Value::Int32Array(_)
        | Value::Int64Array(_)
        | Value::UInt16Array(_)
        | Value::UInt32Array(_)
        | Value::UInt64Array(_)
        | Value::Float16Array(_)
        | Value::BFloat16Array(_)
        | Value::Float32Array(_)
        | Value::Float64Array(_) => {
            arrays::write_array(ctx.buffer, value);
            Ok(())
        }
        Value::List(elems) => collections::write_collection(ctx, types::LIST, elems, None),
        Value::Set(elems) => collections::write_collection(ctx, types::SET, elems, None),
        Value::Map(entries) => maps::write_map(ctx, entries, None),
        Value::Struct(cell) => structs::write_struct_data(ctx, cell),
        Value::Enum(e) => enums::write_enum_data(ctx, e),
        Value::Ext(e) => ext::write_ext_data(ctx, e),
        _ => {
            primitives::write_primitive(ctx.buffer, value);
            Ok(())
        }
    }
}

pub fn read_data(ctx: &mut ReadContext, wire: &WireType) -> Result<Value> {
    match wire {
        WireType::Internal(type_id) => match *type_id {
            types::NONE => Ok(Value::Null),
            types::STRING => strings::read_string(ctx),
            types::DATE | types::TIMESTAMP | types::DURATION => {
                temporal::read_temporal(ctx.buffer, *type_id)
            }
            types::LIST | types::SET => collections::read_collection(ctx, *type_id, None),
            types::MAP => maps::read_map(ctx, None),
            id if types::is_primitive_array_type(id) => arrays::read_array(ctx, id),
            id if types::is_primitive_type(id) => primitives::read_primitive(ctx.buffer, id),
            id => bail!(InvalidData, "tag {} carries no payload form", id),
        },
        WireType::User { info, incoming } => match info.dispatch() {
            Dispatch::Struct => structs::read_struct_data(ctx, info, incoming.as_ref()),
            Dispatch::Enum { .. } => enums::read_enum_data(ctx, info),
            Dispatch::Ext(_) => ext::read_ext_data(ctx, info),
        },
    }
}

/// Diagnostic wire kind of a runtime value.
pub(crate) fn runtime_kind(value: &Value) -> u32 {
    value.internal_type_id().unwrap_or(match value {
        Value::Struct(_) => types::STRUCT,
        Value::Enum(_) => types::ENUM,
        Value::Ext(_) => types::EXT,
        _ => types::UNKNOWN,
    })
}

/// Write one declared-position value per the field protocol: optional
/// flag byte per its ref mode, then the payload.
pub fn write_field_value(ctx: &mut WriteContext, value: &Value, ft: &FieldType) -> Result<()> {
    let mode = RefMode::from_flags(ft.nullable, ft.track_ref && ctx.config.ref_tracking);
    let need_payload = ctx.refs.write_ref_or_null(ctx.buffer, value, mode)?;
    if need_payload {
        write_declared_payload(ctx, value, ft)?;
    }
    Ok(())
}

/// Payload of a declared position. Containers recurse with their declared
/// generics; user kinds carry full type info; internal kinds must match
/// the declared type exactly and are written bare.
pub(crate) fn write_declared_payload(
    ctx: &mut WriteContext,
    value: &Value,
    ft: &FieldType,
) -> Result<()> {
    match ft.type_id {
        types::LIST | types::SET => match (ft.type_id, value) {
            (types::LIST, Value::List(elems)) | (types::SET, Value::Set(elems)) => {
                collections::write_collection(ctx, ft.type_id, elems, ft.generics.first())
            }
            _ => Err(crate::error::Error::TypeMismatch {
                expected: ft.type_id,
                actual: runtime_kind(value),
            }),
        },
        types::MAP => match value {
            Value::Map(entries) => {
                maps::write_map(ctx, entries, Some((&ft.generics[0], &ft.generics[1])))
            }
            _ => Err(crate::error::Error::TypeMismatch {
                expected: types::MAP,
                actual: runtime_kind(value),
            }),
        },
        id if field_needs_type_info(id) => write_any(ctx, value),
        id => {
            let actual = runtime_kind(value);
            if actual != id {
                return Err(crate::error::Error::TypeMismatch {
                    expected: id,
                    actual,
                });
            }
            write_data(ctx, value)
        }
    }
}

/// Mirror of [`write_field_value`].
pub fn read_field_value(ctx: &mut ReadContext, ft: &FieldType) -> Result<Value> {
    let mode = RefMode::from_flags(ft.nullable, ft.track_ref && ctx.config.ref_tracking);
    read_with_mode(ctx, mode, |ctx| read_declared_payload(ctx, ft))
}

pub(crate) fn read_declared_payload(ctx: &mut ReadContext, ft: &FieldType) -> Result<Value> {
    match ft.type_id {
        types::LIST | types::SET => {
            collections::read_collection(ctx, ft.type_id, ft.generics.first())
        }
        types::MAP => maps::read_map(ctx, Some((&ft.generics[0], &ft.generics[1]))),
        id if field_needs_type_info(id) => read_any(ctx),
        id => read_data(ctx, &WireType::Internal(id)),
    }
}

/// Run the reader ref discipline around a payload reader.
pub(crate) fn read_with_mode<F>(ctx: &mut ReadContext, mode: RefMode, payload: F) -> Result<Value>
where
    F: FnOnce(&mut ReadContext) -> Result<Value>,
{
    match mode {
        RefMode::None => payload(ctx),
        RefMode::NullOnly => match ctx.refs.read_flag(ctx.buffer)? {
            RefFlag::Null => Ok(Value::Null),
            RefFlag::NotNullValue => payload(ctx),
            flag => bail!(
                RefError,
                "flag {:?} in a position without ref tracking",
                flag,
            ),
        },
        RefMode::Tracking => match ctx.refs.read_flag(ctx.buffer)? {
            RefFlag::Null => Ok(Value::Null),
            RefFlag::NotNullValue => payload(ctx),
            RefFlag::Ref => {
                let id = ctx.buffer.read_var_uint32()?;
                ctx.refs.get(id)
            }
            RefFlag::RefValue => {
                let id = ctx.refs.reserve();
                let value = payload(ctx)?;
                ctx.refs.complete(id, &value)?;
                Ok(value)
            }
        },
    }
}

/// Top-level write after the stream header. With ref tracking the root is
/// ref-flagged; without it the root is bare type info plus payload.
pub fn write_root(ctx: &mut WriteContext, value: &Value) -> Result<()> {
    if ctx.config.ref_tracking {
        let need = ctx
            .refs
            .write_ref_or_null(ctx.buffer, value, RefMode::Tracking)?;
        if need {
            write_any(ctx, value)?;
        }
        Ok(())
    } else {
        write_any(ctx, value)
    }
}

pub fn read_root(ctx: &mut ReadContext) -> Result<Value> {
    if ctx.config.ref_tracking {
        read_with_mode(ctx, RefMode::Tracking, read_any)
    } else {
        read_any(ctx)
    }
}
