//! Enum payloads: the ordinal as an unsigned varint, range-checked
//! against the registered variant count on both sides.

use crate::error::{ensure, Result};
use crate::resolver::type_resolver::{Dispatch, TypeInfo};
use crate::resolver::{ReadContext, WriteContext};
use crate::value::{EnumValue, Value};
use std::sync::Arc;


pub fn write_enum_data(ctx: &mut WriteContext, value: &EnumValue) -> Result<()> {
    let info = ctx.resolver.get(&value.type_key)?;
    if let Dispatch::Enum { variant_count } = info.dispatch() {
        ensure!(
            value.ordinal < *variant_count,
            InvalidData,
            "enum {} ordinal {} out of range 0..{}",
            value.type_key,
            value.ordinal,
            variant_count,
        );
    }
    ctx.buffer.write_var_uint32(value.ordinal);
    Ok(())
}

pub fn read_enum_data(ctx: &mut ReadContext, info: &Arc<TypeInfo>) -> Result<Value> {
    let ordinal = ctx.buffer.read_var_uint32()?;
    if let Dispatch::Enum { variant_count } = info.dispatch() {
        ensure!(
            ordinal < *variant_count,
            InvalidData,
            "enum {} ordinal {} out of range 0..{}",
            info.type_key(),
            ordinal,
            variant_count,
        );
    }
    Ok(Value::Enum(EnumValue {
        type_key: info.type_key().clone(),
        ordinal,
    }))
}
