//! Per-stream caches behind the shared-meta protocol: already-transmitted
//! TypeMetas and already-transmitted identifier strings both collapse to
//! `(index << 1) | is_back_reference` markers after their first appearance.

use crate::buffer::Buffer;
use crate::error::{ensure, Result};
use crate::meta::{MetaString, MetaStringEncoder, MetaStringEncoding, TypeMeta};
use crate::resolver::type_resolver::TypeKey;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;


/// Shared-TypeMeta table, used symmetrically on write and read. Indices
/// are dense, first-seen order; the nth new schema sits at position n on
/// both sides.
#[derive(Default)]
pub struct MetaContext {
    write_type_index: HashMap<TypeKey, u32>,
    read_type_table: Vec<Arc<TypeMeta>>,
}

impl MetaContext {
    pub fn new() -> Self {
        MetaContext::default()
    }

    /// Emit a back-reference for an already-sent schema, or assign the
    /// next index and send the full envelope.
    pub fn write_shared_meta(
        &mut self,
        buffer: &mut Buffer,
        key: &TypeKey,
        meta_bytes: &[u8],
    ) {
        if let Some(&index) = self.write_type_index.get(key) {
            buffer.write_var_uint32(index << 1 | 1);
            return;
        }
        let index = self.write_type_index.len() as u32;
        self.write_type_index.insert(key.clone(), index);
        trace!(%key, index, "new shared type meta");
        buffer.write_var_uint32(index << 1);
        buffer.write_bytes(meta_bytes);
    }

    /// Mirror of [`MetaContext::write_shared_meta`].
    pub fn read_shared_meta(&mut self, buffer: &mut Buffer) -> Result<Arc<TypeMeta>> {
        let marker = buffer.read_var_uint32()?;
        let index = (marker >> 1) as usize;
        if marker & 1 == 1 {
            ensure!(
                index < self.read_type_table.len(),
                InvalidData,
                "shared meta back-reference {} past table length {}",
                index,
                self.read_type_table.len(),
            );
            return Ok(Arc::clone(&self.read_type_table[index]));
        }
        ensure!(
            index == self.read_type_table.len(),
            InvalidData,
            "shared meta index {} leaves a gap in a table of {}",
            index,
            self.read_type_table.len(),
        );
        let meta = Arc::new(TypeMeta::from_bytes(buffer)?);
        self.read_type_table.push(Arc::clone(&meta));
        Ok(meta)
    }
}

/// Shared-MetaString table carrying namespaces and type names of named
/// types outside the TypeMeta envelope.
#[derive(Default)]
pub struct MetaStringContext {
    write_index: HashMap<MetaString, u32>,
    read_table: Vec<MetaString>,
}

impl MetaStringContext {
    pub fn new() -> Self {
        MetaStringContext::default()
    }

    pub fn write_shared(&mut self, buffer: &mut Buffer, ms: &MetaString) {
        if let Some(&index) = self.write_index.get(ms) {
            buffer.write_var_uint32(index << 1 | 1);
            return;
        }
        self.write_index.insert(ms.clone(), self.write_index.len() as u32);
        buffer.write_var_uint32((ms.bytes().len() as u32) << 1);
        buffer.write_u8(ms.encoding().into());
        buffer.write_bytes(ms.bytes());
    }

    pub fn read_shared(
        &mut self,
        buffer: &mut Buffer,
        encoder: &'static MetaStringEncoder,
    ) -> Result<MetaString> {
        let marker = buffer.read_var_uint32()?;
        if marker & 1 == 1 {
            let index = (marker >> 1) as usize;
            ensure!(
                index < self.read_table.len(),
                InvalidData,
                "shared meta string back-reference {} past table length {}",
                index,
                self.read_table.len(),
            );
            return Ok(self.read_table[index].clone());
        }
        let len = (marker >> 1) as usize;
        let encoding = MetaStringEncoding::try_from(buffer.read_u8()?)
            .map_err(|_| crate::error::error!(InvalidData, "bad shared meta string encoding"))?;
        let decoded = crate::meta::decode_meta_string(buffer.read_bytes(len)?, encoding)?;
        let ms = encoder.encode(&decoded)?;
        self.read_table.push(ms.clone());
        Ok(ms)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::meta::TYPE_NAME_ENCODER;

    #[test]
    fn second_occurrence_is_a_back_reference() {
        let mut buffer = Buffer::new();
        let mut ctx = MetaContext::new();
        let key = TypeKey::Id(5);
        let mut meta =
            TypeMeta::from_fields(crate::types::STRUCT, 5, Vec::new()).unwrap();
        let bytes = meta.to_bytes().unwrap();

        ctx.write_shared_meta(&mut buffer, &key, &bytes);
        ctx.write_shared_meta(&mut buffer, &key, &bytes);

        let mut read = MetaContext::new();
        let mut buffer = Buffer::from_bytes(buffer.dump());
        // first marker is varuint32(0 << 1) followed by the envelope
        let first = read.read_shared_meta(&mut buffer).unwrap();
        let second = read.read_shared_meta(&mut buffer).unwrap();
        assert_eq!(buffer.remaining(), 0);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.user_type_id(), Some(5));
    }

    #[test]
    fn back_reference_past_table_is_invalid() {
        let mut buffer = Buffer::new();
        buffer.write_var_uint32(3 << 1 | 1);
        let mut read = MetaContext::new();
        let mut buffer = Buffer::from_bytes(buffer.dump());
        assert!(matches!(
            read.read_shared_meta(&mut buffer),
            Err(Error::InvalidData(_)),
        ));
    }

    #[test]
    fn meta_strings_deduplicate_per_stream() {
        let ns = TYPE_NAME_ENCODER.encode("game.entity").unwrap();
        let mut buffer = Buffer::new();
        let mut ctx = MetaStringContext::new();
        ctx.write_shared(&mut buffer, &ns);
        ctx.write_shared(&mut buffer, &ns);
        let full_then_ref = buffer.writer_index();

        let mut read = MetaStringContext::new();
        let mut buffer = Buffer::from_bytes(buffer.dump());
        let a = read.read_shared(&mut buffer, &TYPE_NAME_ENCODER).unwrap();
        let b = read.read_shared(&mut buffer, &TYPE_NAME_ENCODER).unwrap();
        assert_eq!(a.original(), "game.entity");
        assert_eq!(a, b);
        // the back-reference is a single marker byte
        assert!(full_then_ref > ns.bytes().len() + 2);
        assert_eq!(buffer.remaining(), 0);
    }
}
