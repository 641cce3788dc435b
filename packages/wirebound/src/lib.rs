//! A cross-language binary serialization core built around the idea that
//! the wire carries enough type information to reconstruct a value graph
//! on a peer written in a different language: every value is introduced
//! by a tag byte, struct schemas travel (once per stream) as hashed
//! TypeMeta envelopes, and object identity survives through dense ref
//! ids, so shared nodes and cycles decode back into shared nodes and
//! cycles.
//!
//! Typical usage pattern:
//!
//! - build a [`Codec`], choosing the schema [`Mode`] and whether streams
//!   are cross-language and ref-tracked
//! - register every user type once: structs with their field lists,
//!   enums with their variant counts, ext types with a caller-supplied
//!   [`ExtHarness`]
//! - call `serialize` with a [`Value`] to get the stream bytes, and
//!   `deserialize` on the peer to get the value graph back
//!
//! The data model supports:
//!
//! - fixed-width, zigzag-varint, and tagged integers, `f16`/`bf16`/`f32`/
//!   `f64`, bool
//! - strings (smallest of LATIN-1 / UTF-8 / UTF-16LE), dates, timestamps,
//!   durations, byte strings
//! - typed primitive arrays with bulk little-endian lanes
//! - lists, sets, maps, with nulls and nesting
//! - struct values (schema-consistent or schema-evolving), enums, and
//!   ext types owned by registered serializers

pub mod buffer;
pub mod codec;
pub mod error;
pub mod meta;
pub mod resolver;
pub mod serializer;
pub mod types;
pub mod value;

pub use crate::{
    buffer::Buffer,
    codec::{Codec, Config},
    error::{Error, Result},
    meta::{FieldInfo, FieldType, MetaString, MetaStringEncoding, TypeMeta},
    resolver::{ExtHarness, TypeKey, TypeResolver},
    types::{Mode, RefFlag, RefMode, TypeId},
    value::{EnumValue, ExtValue, Record, Value},
};

pub(crate) use crate::error::{bail, ensure, error};
