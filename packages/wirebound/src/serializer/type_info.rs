//! Writing and reading the wire type-info block: one tag byte plus the
//! identity that kind requires (nothing, a user id, shared identifier
//! strings, or a shared TypeMeta).

use crate::error::{bail, Result};
use crate::meta::{TypeMeta, NAMESPACE_ENCODER, TYPE_NAME_ENCODER};
use crate::resolver::type_resolver::TypeInfo;
use crate::resolver::{ReadContext, WriteContext};
use crate::types::{self, Mode, TypeId};
use crate::value::Value;
use std::sync::Arc;


/// What a type-info block resolved to. For compatible struct tags the
/// peer's schema rides along and drives field matching.
pub enum WireType {
    Internal(u32),
    User {
        info: Arc<TypeInfo>,
        incoming: Option<Arc<TypeMeta>>,
    },
}

/// Emit the type info of a runtime value.
pub fn write_type_info(ctx: &mut WriteContext, value: &Value) -> Result<()> {
    if let Some(type_id) = value.internal_type_id() {
        ctx.buffer.write_u8(type_id as u8);
        return Ok(());
    }
    let key = match value {
        Value::Struct(cell) => cell.borrow().type_key().clone(),
        Value::Enum(e) => e.type_key.clone(),
        Value::Ext(e) => e.type_key.clone(),
        _ => unreachable!("internal_type_id covers every other variant"),
    };
    let info = ctx.resolver.get(&key)?;
    let tag = info.wire_tag(ctx.config.mode);
    ctx.buffer.write_u8(tag as u8);
    match tag {
        types::STRUCT | types::ENUM | types::EXT => {
            ctx.buffer
                .write_var_uint32(info.user_type_id().expect("id-registered type"));
        }
        types::COMPATIBLE_STRUCT | types::NAMED_COMPATIBLE_STRUCT => {
            ctx.meta
                .write_shared_meta(ctx.buffer, info.type_key(), info.meta_bytes());
        }
        types::NAMED_STRUCT => {
            ctx.strings.write_shared(ctx.buffer, info.meta().namespace());
            ctx.strings.write_shared(ctx.buffer, info.meta().type_name());
        }
        types::NAMED_ENUM | types::NAMED_EXT => {
            // named enums and ext types share their identity through the
            // meta table once schemas are travelling anyway
            if ctx.config.mode == Mode::Compatible {
                ctx.meta
                    .write_shared_meta(ctx.buffer, info.type_key(), info.meta_bytes());
            } else {
                ctx.strings.write_shared(ctx.buffer, info.meta().namespace());
                ctx.strings.write_shared(ctx.buffer, info.meta().type_name());
            }
        }
        _ => unreachable!("wire_tag only returns user kinds"),
    }
    Ok(())
}

/// Parse a type-info block and resolve it against the registry.
pub fn read_type_info(ctx: &mut ReadContext) -> Result<WireType> {
    let raw = ctx.buffer.read_u8()?;
    if TypeId::try_from(raw).is_err() || raw as u32 >= types::BOUND {
        bail!(InvalidData, "unknown wire type tag {:#04x}", raw);
    }
    let tag = raw as u32;
    match tag {
        types::UNKNOWN => bail!(InvalidData, "polymorphic marker is not a wire tag"),
        types::TYPED_UNION | types::NAMED_UNION => {
            bail!(InvalidData, "union values are not part of the data model")
        }
        types::STRUCT | types::ENUM | types::EXT => {
            let id = ctx.buffer.read_var_uint32()?;
            let kind = base_kind(tag);
            let info = ctx.resolver.by_wire_id(kind, id)?;
            Ok(WireType::User {
                info,
                incoming: None,
            })
        }
        types::COMPATIBLE_STRUCT | types::NAMED_COMPATIBLE_STRUCT => {
            let meta = ctx.meta.read_shared_meta(ctx.buffer)?;
            let info = resolve_struct_meta(ctx, &meta)?;
            Ok(WireType::User {
                info,
                incoming: Some(meta),
            })
        }
        types::NAMED_STRUCT => {
            let (namespace, name) = read_shared_names(ctx)?;
            let info = ctx
                .resolver
                .by_wire_name(types::STRUCT, &namespace, &name)?;
            Ok(WireType::User {
                info,
                incoming: None,
            })
        }
        types::NAMED_ENUM | types::NAMED_EXT => {
            let kind = base_kind(tag);
            let (namespace, name) = if ctx.config.mode == Mode::Compatible {
                let meta = ctx.meta.read_shared_meta(ctx.buffer)?;
                (
                    meta.namespace().original().to_string(),
                    meta.type_name().original().to_string(),
                )
            } else {
                read_shared_names(ctx)?
            };
            let info = ctx.resolver.by_wire_name(kind, &namespace, &name)?;
            Ok(WireType::User {
                info,
                incoming: None,
            })
        }
        _ => Ok(WireType::Internal(tag)),
    }
}

fn base_kind(tag: u32) -> u32 {
    match tag {
        types::STRUCT | types::NAMED_STRUCT | types::COMPATIBLE_STRUCT
        | types::NAMED_COMPATIBLE_STRUCT => types::STRUCT,
        types::ENUM | types::NAMED_ENUM => types::ENUM,
        types::EXT | types::NAMED_EXT => types::EXT,
        _ => unreachable!(),
    }
}

fn read_shared_names(ctx: &mut ReadContext) -> Result<(String, String)> {
    let namespace = ctx.strings.read_shared(ctx.buffer, &NAMESPACE_ENCODER)?;
    let name = ctx.strings.read_shared(ctx.buffer, &TYPE_NAME_ENCODER)?;
    Ok((
        namespace.original().to_string(),
        name.original().to_string(),
    ))
}

fn resolve_struct_meta(ctx: &ReadContext, meta: &TypeMeta) -> Result<Arc<TypeInfo>> {
    if meta.register_by_name() {
        ctx.resolver.by_wire_name(
            types::STRUCT,
            meta.namespace().original(),
            meta.type_name().original(),
        )
    } else {
        let id = meta.user_type_id().ok_or_else(|| {
            crate::error::error!(InvalidData, "id-registered type meta without a user id")
        })?;
        ctx.resolver.by_wire_id(types::STRUCT, id)
    }
}
