//! The root driver: stream header, per-call contexts, registration
//! surface, and the resource caps enforced during decode.

use crate::buffer::Buffer;
use crate::error::{ensure, Result};
use crate::meta::FieldInfo;
use crate::resolver::{ExtHarness, ReadContext, TypeKey, TypeResolver, WriteContext};
use crate::serializer::{read_root, write_root};
use crate::types::config_flags::{IS_NULL_FLAG, IS_XLANG_FLAG};
use crate::types::Mode;
use crate::value::Value;


/// Knobs shared by every call on one codec instance.
#[derive(Clone, Debug)]
pub struct Config {
    pub mode: Mode,
    pub xlang: bool,
    pub ref_tracking: bool,
    pub check_struct_version: bool,
    /// Upper bound on decoded collection entry counts.
    pub max_collection_length: usize,
    /// Upper bound on decoded string/binary/array byte lengths.
    pub max_binary_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: Mode::SchemaConsistent,
            xlang: true,
            ref_tracking: false,
            check_struct_version: false,
            max_collection_length: 64 * 1024 * 1024,
            max_binary_length: i32::MAX as usize,
        }
    }
}

/// One configured serialization instance: a frozen type registry plus the
/// per-call drivers. Independent calls on one instance may run from
/// different threads once registration is done.
#[derive(Default)]
pub struct Codec {
    config: Config,
    resolver: TypeResolver,
}

impl Codec {
    pub fn new() -> Self {
        Codec::default()
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn xlang(mut self, xlang: bool) -> Self {
        self.config.xlang = xlang;
        self
    }

    pub fn ref_tracking(mut self, ref_tracking: bool) -> Self {
        self.config.ref_tracking = ref_tracking;
        self
    }

    pub fn check_struct_version(mut self, check: bool) -> Self {
        self.config.check_struct_version = check;
        self
    }

    pub fn max_collection_length(mut self, max: usize) -> Self {
        self.config.max_collection_length = max;
        self
    }

    pub fn max_binary_length(mut self, max: usize) -> Self {
        self.config.max_binary_length = max;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    pub fn register_struct(&mut self, id: u32, fields: Vec<FieldInfo>) -> Result<TypeKey> {
        self.resolver.register_struct(id, fields)
    }

    pub fn register_struct_by_name(
        &mut self,
        namespace: &str,
        name: &str,
        fields: Vec<FieldInfo>,
    ) -> Result<TypeKey> {
        self.resolver.register_struct_by_name(namespace, name, fields)
    }

    pub fn register_enum(&mut self, id: u32, variant_count: u32) -> Result<TypeKey> {
        self.resolver.register_enum(id, variant_count)
    }

    pub fn register_enum_by_name(
        &mut self,
        namespace: &str,
        name: &str,
        variant_count: u32,
    ) -> Result<TypeKey> {
        self.resolver.register_enum_by_name(namespace, name, variant_count)
    }

    pub fn register_ext(&mut self, id: u32, harness: ExtHarness) -> Result<TypeKey> {
        self.resolver.register_ext(id, harness)
    }

    pub fn register_ext_by_name(
        &mut self,
        namespace: &str,
        name: &str,
        harness: ExtHarness,
    ) -> Result<TypeKey> {
        self.resolver.register_ext_by_name(namespace, name, harness)
    }

    /// Override the serializer for a type with a caller-supplied harness.
    pub fn register_serializer(&mut self, id: u32, harness: ExtHarness) -> Result<TypeKey> {
        self.resolver.register_ext(id, harness)
    }

    /// End the registration phase early; otherwise the first call does it.
    pub fn freeze(&self) {
        self.resolver.freeze();
    }

    /// Encode one root value. Fresh per-call contexts; the returned bytes
    /// are the whole stream.
    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        self.resolver.freeze();
        let mut buffer = Buffer::new();
        {
            let mut ctx = WriteContext::new(&mut buffer, &self.resolver, &self.config);
            let mut head = 0u8;
            if self.config.xlang {
                head |= IS_XLANG_FLAG;
            }
            if value.is_null() {
                head |= IS_NULL_FLAG;
            }
            ctx.buffer.write_u8(head);
            if !value.is_null() {
                write_root(&mut ctx, value)?;
            }
        }
        Ok(buffer.dump())
    }

    /// Decode one root value, rejecting header disagreement and trailing
    /// bytes.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        self.resolver.freeze();
        let mut buffer = Buffer::from_slice(bytes);
        let mut ctx = ReadContext::new(&mut buffer, &self.resolver, &self.config);
        let head = ctx.buffer.read_u8()?;
        let peer_xlang = head & IS_XLANG_FLAG != 0;
        ensure!(
            peer_xlang == self.config.xlang,
            InvalidData,
            "peer xlang bit {} disagrees with local configuration",
            peer_xlang,
        );
        let value = if head & IS_NULL_FLAG != 0 {
            Value::Null
        } else {
            read_root(&mut ctx)?
        };
        ensure!(
            ctx.buffer.remaining() == 0,
            InvalidData,
            "{} trailing bytes after the root value",
            ctx.buffer.remaining(),
        );
        Ok(value)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn string_stream_matches_the_wire_layout() {
        let codec = Codec::new().xlang(false);
        let bytes = codec.serialize(&Value::String("hi".into())).unwrap();
        // header 00, string tag 0x0d, varuint36 (2 << 2) | utf8, payload
        assert_eq!(bytes, vec![0x00, 0x0d, 0x0a, b'h', b'i']);
        assert_eq!(
            codec.deserialize(&bytes).unwrap(),
            Value::String("hi".into()),
        );
    }

    #[test]
    fn null_root_travels_in_the_header() {
        let codec = Codec::new();
        let bytes = codec.serialize(&Value::Null).unwrap();
        assert_eq!(bytes, vec![IS_XLANG_FLAG | IS_NULL_FLAG]);
        assert_eq!(codec.deserialize(&bytes).unwrap(), Value::Null);
    }

    #[test]
    fn xlang_disagreement_rejected() {
        let writer = Codec::new().xlang(true);
        let reader = Codec::new().xlang(false);
        let bytes = writer.serialize(&Value::Bool(true)).unwrap();
        assert!(matches!(
            reader.deserialize(&bytes),
            Err(Error::InvalidData(_)),
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let codec = Codec::new();
        let mut bytes = codec.serialize(&Value::Bool(true)).unwrap();
        bytes.push(0xff);
        assert!(matches!(
            codec.deserialize(&bytes),
            Err(Error::InvalidData(_)),
        ));
    }

    #[test]
    fn var_int32_root_round_trip() {
        let codec = Codec::new().xlang(false);
        let bytes = codec.serialize(&Value::VarInt32(300)).unwrap();
        // varint32 tag then the zigzag bytes d8 04
        assert_eq!(bytes, vec![0x00, 0x05, 0xd8, 0x04]);
        assert_eq!(codec.deserialize(&bytes).unwrap(), Value::VarInt32(300));
    }
}
