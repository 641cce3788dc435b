//! Per-call serialization state: the buffer, the frozen resolver, the
//! codec configuration, and the per-stream caches. A context lives for
//! exactly one top-level serialize or deserialize call.

use crate::buffer::Buffer;
use crate::codec::Config;
use crate::error::{ensure, Result};
use crate::resolver::meta_context::{MetaContext, MetaStringContext};
use crate::resolver::ref_context::{RefReadContext, RefWriteContext};
use crate::resolver::type_resolver::TypeResolver;


pub struct WriteContext<'a> {
    pub buffer: &'a mut Buffer,
    pub resolver: &'a TypeResolver,
    pub config: &'a Config,
    pub meta: MetaContext,
    pub strings: MetaStringContext,
    pub refs: RefWriteContext,
}

impl<'a> WriteContext<'a> {
    pub fn new(buffer: &'a mut Buffer, resolver: &'a TypeResolver, config: &'a Config) -> Self {
        WriteContext {
            buffer,
            resolver,
            config,
            meta: MetaContext::new(),
            strings: MetaStringContext::new(),
            refs: RefWriteContext::new(),
        }
    }
}

pub struct ReadContext<'a> {
    pub buffer: &'a mut Buffer,
    pub resolver: &'a TypeResolver,
    pub config: &'a Config,
    pub meta: MetaContext,
    pub strings: MetaStringContext,
    pub refs: RefReadContext,
}

impl<'a> ReadContext<'a> {
    pub fn new(buffer: &'a mut Buffer, resolver: &'a TypeResolver, config: &'a Config) -> Self {
        ReadContext {
            buffer,
            resolver,
            config,
            meta: MetaContext::new(),
            strings: MetaStringContext::new(),
            refs: RefReadContext::new(),
        }
    }

    /// Validate a just-decoded entry count before anything is allocated
    /// for it.
    pub fn check_collection_len(&self, len: usize) -> Result<()> {
        ensure!(
            len <= self.config.max_collection_length,
            InvalidData,
            "collection length {} exceeds the configured cap {}",
            len,
            self.config.max_collection_length,
        );
        Ok(())
    }

    /// Validate a just-decoded byte length before anything is allocated
    /// for it.
    pub fn check_binary_len(&self, len: usize) -> Result<()> {
        ensure!(
            len <= self.config.max_binary_length,
            InvalidData,
            "binary length {} exceeds the configured cap {}",
            len,
            self.config.max_binary_length,
        );
        Ok(())
    }
}
