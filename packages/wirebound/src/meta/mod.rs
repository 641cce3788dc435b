//! Schema metadata: identifier compression, the struct schema descriptor,
//! and the hash pinning a schema body.

pub mod hash;
pub mod meta_string;
pub mod type_meta;

pub use meta_string::{
    decode as decode_meta_string, MetaString, MetaStringEncoder, MetaStringEncoding,
    FIELD_NAME_ENCODER, NAMESPACE_ENCODER, TYPE_NAME_ENCODER,
};
pub use type_meta::{sort_fields, FieldInfo, FieldType, TypeMeta};
