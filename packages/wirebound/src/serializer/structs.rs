//! The generic struct serializer: a field-ordered reader/writer driven by
//! a TypeMeta, supporting schema-consistent and schema-evolving reads.

use crate::error::{Error, Result};
use crate::meta::{FieldInfo, TypeMeta};
use crate::resolver::type_resolver::TypeInfo;
use crate::resolver::{ReadContext, WriteContext};
use crate::serializer::{read_field_value, write_field_value};
use crate::types::Mode;
use crate::value::{Record, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;


/// Write the fields of one struct value in canonical order, preceded by
/// the 32-bit version hash when the schema-consistency check is on.
pub fn write_struct_data(ctx: &mut WriteContext, cell: &Rc<RefCell<Record>>) -> Result<()> {
    let record = cell.borrow();
    let info = ctx.resolver.get(record.type_key())?;
    if ctx.config.check_struct_version && ctx.config.mode == Mode::SchemaConsistent {
        ctx.buffer.write_u32(info.meta().version_hash());
    }
    for field in info.meta().fields() {
        let fallback;
        let value = match record.get(&field.field_name) {
            Some(v) => v,
            None => {
                fallback = Value::default_for(&field.field_type);
                &fallback
            }
        };
        write_field_value(ctx, value, &field.field_type)?;
    }
    Ok(())
}

/// Read one struct value. With `incoming` schema the read is evolving:
/// fields match by tag id or name, unmatched incoming fields are decoded
/// and dropped, absent local fields default. Without it the local schema
/// is the wire schema.
///
/// The cell is created and bound to any pending ref slot before any field
/// is decoded, so cyclic children can refer back to it.
pub fn read_struct_data(
    ctx: &mut ReadContext,
    info: &Arc<TypeInfo>,
    incoming: Option<&Arc<TypeMeta>>,
) -> Result<Value> {
    let cell = Rc::new(RefCell::new(Record::new(info.type_key().clone())));
    if let Some(id) = ctx.refs.claim_pending() {
        ctx.refs.bind(id, Value::Struct(Rc::clone(&cell)))?;
    }

    // values land here in wire order and are remapped to declaration
    // order below, since the two orders differ
    let mut collected: Vec<(String, Value)> = Vec::new();
    match incoming {
        None => {
            if ctx.config.check_struct_version && ctx.config.mode == Mode::SchemaConsistent {
                let peer = ctx.buffer.read_u32()?;
                let local = info.meta().version_hash();
                if peer != local {
                    return Err(Error::VersionMismatch { local, peer });
                }
            }
            for field in info.meta().fields() {
                let value = read_field_value(ctx, &field.field_type)?;
                collected.push((field.field_name.clone(), value));
            }
        }
        Some(meta) => {
            for in_field in meta.fields() {
                match match_local_field(info, in_field) {
                    Some(local_name) => {
                        let local_name = local_name.to_string();
                        let value = read_field_value(ctx, &in_field.field_type)?;
                        collected.push((local_name, value));
                    }
                    None => {
                        // unknown to this peer: decode to advance, drop
                        read_field_value(ctx, &in_field.field_type)?;
                    }
                }
            }
        }
    }

    let mut record = cell.borrow_mut();
    for declared in info.declared_fields() {
        let value = match collected
            .iter()
            .position(|(name, _)| name == &declared.field_name)
        {
            Some(index) => collected.swap_remove(index).1,
            None => Value::default_for(&declared.field_type),
        };
        record.set(declared.field_name.clone(), value);
    }
    drop(record);
    Ok(Value::Struct(cell))
}

/// Match an incoming field against the local schema: by tag id when both
/// sides carry one, otherwise by encoded name.
fn match_local_field<'a>(info: &'a TypeInfo, incoming: &FieldInfo) -> Option<&'a str> {
    for local in info.meta().fields() {
        let matched = match (incoming.field_id, local.field_id) {
            (Some(incoming_id), Some(local_id)) => incoming_id == local_id,
            _ => !incoming.field_name.is_empty() && incoming.field_name == local.field_name,
        };
        if matched {
            return Some(&local.field_name);
        }
    }
    None
}
