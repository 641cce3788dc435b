//! Per-stream reference tracking: object identity on the way out, dense
//! integer ids on the way back in, with cycle support via slots that are
//! reserved before the payload that fills them is decoded.

use crate::buffer::Buffer;
use crate::error::{bail, ensure, Result};
use crate::types::{RefFlag, RefMode};
use crate::value::Value;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;


/// Writer side: identity-keyed map from struct cells to ref ids, assigned
/// densely from 0 in first-seen order.
#[derive(Default)]
pub struct RefWriteContext {
    ids: HashMap<usize, u32>,
}

impl RefWriteContext {
    pub fn new() -> Self {
        RefWriteContext::default()
    }

    /// Run the writer ref discipline for one value. Returns whether a
    /// payload must follow the flag that was written (if any).
    ///
    /// Under `Tracking`, a first-seen trackable value registers its id
    /// before the payload is emitted, so cyclic children can find it.
    pub fn write_ref_or_null(
        &mut self,
        buffer: &mut Buffer,
        value: &Value,
        mode: RefMode,
    ) -> Result<bool> {
        match mode {
            RefMode::None => {
                ensure!(
                    !value.is_null(),
                    InvalidData,
                    "null value in a non-nullable position",
                );
                Ok(true)
            }
            RefMode::NullOnly => {
                if value.is_null() {
                    buffer.write_i8(RefFlag::Null.into());
                    Ok(false)
                } else {
                    buffer.write_i8(RefFlag::NotNullValue.into());
                    Ok(true)
                }
            }
            RefMode::Tracking => {
                if value.is_null() {
                    buffer.write_i8(RefFlag::Null.into());
                    return Ok(false);
                }
                let Value::Struct(cell) = value else {
                    buffer.write_i8(RefFlag::NotNullValue.into());
                    return Ok(true);
                };
                let identity = Rc::as_ptr(cell) as usize;
                if let Some(&id) = self.ids.get(&identity) {
                    buffer.write_i8(RefFlag::Ref.into());
                    buffer.write_var_uint32(id);
                    Ok(false)
                } else {
                    let id = self.ids.len() as u32;
                    self.ids.insert(identity, id);
                    trace!(id, "tracking new object");
                    buffer.write_i8(RefFlag::RefValue.into());
                    Ok(true)
                }
            }
        }
    }
}

/// Reader side: the indexable store of materialized objects plus a stack
/// of reserved-but-unbound slots that struct readers claim to break
/// cycles.
#[derive(Default)]
pub struct RefReadContext {
    objects: Vec<Option<Value>>,
    pending: Vec<u32>,
}

impl RefReadContext {
    pub fn new() -> Self {
        RefReadContext::default()
    }

    pub fn read_flag(&mut self, buffer: &mut Buffer) -> Result<RefFlag> {
        let raw = buffer.read_i8()?;
        RefFlag::try_from(raw)
            .map_err(|_| crate::error::error!(RefError, "ref flag {} outside the allowed set", raw))
    }

    /// Reserve the next dense id for a `RefValue` payload about to be
    /// decoded. The id is parked on the pending stack until a struct
    /// reader claims it or the payload completes.
    pub fn reserve(&mut self) -> u32 {
        let id = self.objects.len() as u32;
        self.objects.push(None);
        self.pending.push(id);
        trace!(id, "reserved ref slot");
        id
    }

    /// Taken by a struct reader right after it creates its cell, so that
    /// children decoded afterwards can refer back to the cell.
    pub fn claim_pending(&mut self) -> Option<u32> {
        self.pending.pop()
    }

    /// Bind a reserved slot. Each slot is bound exactly once.
    pub fn bind(&mut self, id: u32, value: Value) -> Result<()> {
        let slot = self
            .objects
            .get_mut(id as usize)
            .ok_or_else(|| crate::error::error!(RefError, "ref id {} was never reserved", id))?;
        ensure!(slot.is_none(), RefError, "ref id {} bound twice", id);
        *slot = Some(value);
        Ok(())
    }

    /// Close out a `RefValue` read: drop the pending marker if nothing
    /// claimed it, and bind the finished value to the slot if the payload
    /// reader did not bind earlier.
    pub fn complete(&mut self, id: u32, value: &Value) -> Result<()> {
        if self.pending.last() == Some(&id) {
            self.pending.pop();
        }
        if self.objects[id as usize].is_none() {
            self.bind(id, value.clone())?;
        }
        Ok(())
    }

    /// Resolve a `Ref` back-reference.
    pub fn get(&self, id: u32) -> Result<Value> {
        match self.objects.get(id as usize) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => bail!(RefError, "ref id {} referenced before it was bound", id),
            None => bail!(
                RefError,
                "ref id {} out of range (have {})",
                id,
                self.objects.len(),
            ),
        }
    }
}
