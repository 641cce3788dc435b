//! Ext payloads: the registered harness owns the bytes between the type
//! info and the next value.

use crate::error::{Error, Result};
use crate::resolver::type_resolver::{Dispatch, TypeInfo};
use crate::resolver::{ReadContext, WriteContext};
use crate::types;
use crate::value::{ExtValue, Value};
use std::sync::Arc;


pub fn write_ext_data(ctx: &mut WriteContext, value: &ExtValue) -> Result<()> {
    let info = ctx.resolver.get(&value.type_key)?;
    let write_fn = match info.dispatch() {
        Dispatch::Ext(harness) => harness.write_fn(),
        _ => {
            return Err(Error::TypeMismatch {
                expected: types::EXT,
                actual: info.kind(),
            })
        }
    };
    write_fn(&value.data, ctx)
}

pub fn read_ext_data(ctx: &mut ReadContext, info: &Arc<TypeInfo>) -> Result<Value> {
    let read_fn = match info.dispatch() {
        Dispatch::Ext(harness) => harness.read_fn(),
        _ => {
            return Err(Error::TypeMismatch {
                expected: types::EXT,
                actual: info.kind(),
            })
        }
    };
    let data = read_fn(ctx)?;
    Ok(Value::Ext(ExtValue {
        type_key: info.type_key().clone(),
        data: Box::new(data),
    }))
}
