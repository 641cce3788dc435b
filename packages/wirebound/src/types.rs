//! Wire-level type tags and the small flag enums that every layer above the
//! buffer shares.

use num_enum::{IntoPrimitive, TryFromPrimitive};


/// 8-bit tag at the start of every type-info block.
///
/// The numbering is part of the wire protocol and must not be reordered.
/// `BINARY` doubles as the byte-array fast path, so there is no `u8[]` id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[allow(non_camel_case_types)]
#[repr(u8)]
pub enum TypeId {
    /// Polymorphic marker: the runtime type is carried per value.
    UNKNOWN = 0,
    BOOL = 1,
    INT8 = 2,
    INT16 = 3,
    INT32 = 4,
    VARINT32 = 5,
    INT64 = 6,
    VARINT64 = 7,
    TAGGED_INT64 = 8,
    FLOAT16 = 9,
    BFLOAT16 = 10,
    FLOAT32 = 11,
    FLOAT64 = 12,
    STRING = 13,
    UINT8 = 14,
    UINT16 = 15,
    UINT32 = 16,
    VAR_UINT32 = 17,
    UINT64 = 18,
    VAR_UINT64 = 19,
    TAGGED_UINT64 = 20,
    DATE = 21,
    TIMESTAMP = 22,
    DURATION = 23,
    BINARY = 24,
    BOOL_ARRAY = 25,
    INT8_ARRAY = 26,
    INT16_ARRAY = 27,
    INT32_ARRAY = 28,
    INT64_ARRAY = 29,
    UINT16_ARRAY = 30,
    UINT32_ARRAY = 31,
    UINT64_ARRAY = 32,
    FLOAT16_ARRAY = 33,
    BFLOAT16_ARRAY = 34,
    FLOAT32_ARRAY = 35,
    FLOAT64_ARRAY = 36,
    LIST = 37,
    SET = 38,
    MAP = 39,
    STRUCT = 40,
    ENUM = 41,
    EXT = 42,
    /// Reserved: unions are not part of the core data model.
    TYPED_UNION = 43,
    NAMED_STRUCT = 44,
    NAMED_ENUM = 45,
    NAMED_EXT = 46,
    /// Reserved, see `TYPED_UNION`.
    NAMED_UNION = 47,
    COMPATIBLE_STRUCT = 48,
    NAMED_COMPATIBLE_STRUCT = 49,
    /// The NULL type marker.
    NONE = 50,
    /// Everything at or past this value is invalid on the wire.
    BOUND = 51,
}

pub const UNKNOWN: u32 = TypeId::UNKNOWN as u32;
pub const BOOL: u32 = TypeId::BOOL as u32;
pub const INT8: u32 = TypeId::INT8 as u32;
pub const INT16: u32 = TypeId::INT16 as u32;
pub const INT32: u32 = TypeId::INT32 as u32;
pub const VARINT32: u32 = TypeId::VARINT32 as u32;
pub const INT64: u32 = TypeId::INT64 as u32;
pub const VARINT64: u32 = TypeId::VARINT64 as u32;
pub const TAGGED_INT64: u32 = TypeId::TAGGED_INT64 as u32;
pub const FLOAT16: u32 = TypeId::FLOAT16 as u32;
pub const BFLOAT16: u32 = TypeId::BFLOAT16 as u32;
pub const FLOAT32: u32 = TypeId::FLOAT32 as u32;
pub const FLOAT64: u32 = TypeId::FLOAT64 as u32;
pub const STRING: u32 = TypeId::STRING as u32;
pub const UINT8: u32 = TypeId::UINT8 as u32;
pub const UINT16: u32 = TypeId::UINT16 as u32;
pub const UINT32: u32 = TypeId::UINT32 as u32;
pub const VAR_UINT32: u32 = TypeId::VAR_UINT32 as u32;
pub const UINT64: u32 = TypeId::UINT64 as u32;
pub const VAR_UINT64: u32 = TypeId::VAR_UINT64 as u32;
pub const TAGGED_UINT64: u32 = TypeId::TAGGED_UINT64 as u32;
pub const DATE: u32 = TypeId::DATE as u32;
pub const TIMESTAMP: u32 = TypeId::TIMESTAMP as u32;
pub const DURATION: u32 = TypeId::DURATION as u32;
pub const BINARY: u32 = TypeId::BINARY as u32;
pub const BOOL_ARRAY: u32 = TypeId::BOOL_ARRAY as u32;
pub const INT8_ARRAY: u32 = TypeId::INT8_ARRAY as u32;
pub const INT16_ARRAY: u32 = TypeId::INT16_ARRAY as u32;
pub const INT32_ARRAY: u32 = TypeId::INT32_ARRAY as u32;
pub const INT64_ARRAY: u32 = TypeId::INT64_ARRAY as u32;
pub const UINT16_ARRAY: u32 = TypeId::UINT16_ARRAY as u32;
pub const UINT32_ARRAY: u32 = TypeId::UINT32_ARRAY as u32;
pub const UINT64_ARRAY: u32 = TypeId::UINT64_ARRAY as u32;
pub const FLOAT16_ARRAY: u32 = TypeId::FLOAT16_ARRAY as u32;
pub const BFLOAT16_ARRAY: u32 = TypeId::BFLOAT16_ARRAY as u32;
pub const FLOAT32_ARRAY: u32 = TypeId::FLOAT32_ARRAY as u32;
pub const FLOAT64_ARRAY: u32 = TypeId::FLOAT64_ARRAY as u32;
pub const LIST: u32 = TypeId::LIST as u32;
pub const SET: u32 = TypeId::SET as u32;
pub const MAP: u32 = TypeId::MAP as u32;
pub const STRUCT: u32 = TypeId::STRUCT as u32;
pub const ENUM: u32 = TypeId::ENUM as u32;
pub const EXT: u32 = TypeId::EXT as u32;
pub const TYPED_UNION: u32 = TypeId::TYPED_UNION as u32;
pub const NAMED_STRUCT: u32 = TypeId::NAMED_STRUCT as u32;
pub const NAMED_ENUM: u32 = TypeId::NAMED_ENUM as u32;
pub const NAMED_EXT: u32 = TypeId::NAMED_EXT as u32;
pub const NAMED_UNION: u32 = TypeId::NAMED_UNION as u32;
pub const COMPATIBLE_STRUCT: u32 = TypeId::COMPATIBLE_STRUCT as u32;
pub const NAMED_COMPATIBLE_STRUCT: u32 = TypeId::NAMED_COMPATIBLE_STRUCT as u32;
pub const NONE: u32 = TypeId::NONE as u32;
pub const BOUND: u32 = TypeId::BOUND as u32;

/// Signed 8-bit flags preceding a ref-tracked or nullable payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i8)]
pub enum RefFlag {
    /// Absent value.
    Null = -3,
    /// Followed by a varuint32 id of an already-transmitted object.
    Ref = -2,
    /// Followed by a self-contained payload; no id is assigned.
    NotNullValue = -1,
    /// Followed by a payload whose id is the next free id on the reader.
    RefValue = 0,
}

/// Per-field collapse of `(nullable, track_ref)` into the branch of the
/// field protocol that applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RefMode {
    /// No flag byte at all; the payload is written bare.
    #[default]
    None,
    /// A null/not-null flag byte, no identity tracking.
    NullOnly,
    /// Full identity tracking with cycle support.
    Tracking,
}

impl RefMode {
    pub const fn from_flags(nullable: bool, track_ref: bool) -> Self {
        match (nullable, track_ref) {
            (false, false) => RefMode::None,
            (true, false) => RefMode::NullOnly,
            (_, true) => RefMode::Tracking,
        }
    }

    pub const fn has_flag_byte(self) -> bool {
        !matches!(self, RefMode::None)
    }

    pub const fn tracks_refs(self) -> bool {
        matches!(self, RefMode::Tracking)
    }
}

/// Schema agreement contract between the two peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Peers' schemas are assumed identical; optionally checked with a
    /// 32-bit version hash.
    SchemaConsistent,
    /// Peers may add/delete fields independently; schemas travel through
    /// the shared-meta protocol and fields match by id/name.
    Compatible,
}

pub mod config_flags {
    /// Peer serializes in cross-language mode.
    pub const IS_XLANG_FLAG: u8 = 1 << 0;
    /// The root value is absent.
    pub const IS_NULL_FLAG: u8 = 1 << 1;
}

/// User type id reserved for "unset".
pub const USER_TYPE_ID_UNSET: u32 = u32::MAX;

pub const fn is_primitive_type(type_id: u32) -> bool {
    matches!(
        type_id,
        BOOL | INT8
            | INT16
            | INT32
            | VARINT32
            | INT64
            | VARINT64
            | TAGGED_INT64
            | FLOAT16
            | BFLOAT16
            | FLOAT32
            | FLOAT64
            | UINT8
            | UINT16
            | UINT32
            | VAR_UINT32
            | UINT64
            | VAR_UINT64
            | TAGGED_UINT64
    )
}

pub const fn is_primitive_array_type(type_id: u32) -> bool {
    matches!(
        type_id,
        BINARY
            | BOOL_ARRAY
            | INT8_ARRAY
            | INT16_ARRAY
            | INT32_ARRAY
            | INT64_ARRAY
            | UINT16_ARRAY
            | UINT32_ARRAY
            | UINT64_ARRAY
            | FLOAT16_ARRAY
            | BFLOAT16_ARRAY
            | FLOAT32_ARRAY
            | FLOAT64_ARRAY
    )
}

pub const fn is_container_type(type_id: u32) -> bool {
    matches!(type_id, LIST | SET | MAP)
}

pub const fn is_user_type(type_id: u32) -> bool {
    matches!(
        type_id,
        STRUCT
            | ENUM
            | EXT
            | TYPED_UNION
            | NAMED_STRUCT
            | NAMED_ENUM
            | NAMED_EXT
            | NAMED_UNION
            | COMPATIBLE_STRUCT
            | NAMED_COMPATIBLE_STRUCT
    )
}

/// Internal types are every valid wire kind that is not user-defined.
pub const fn is_internal_type(type_id: u32) -> bool {
    type_id != UNKNOWN && type_id < BOUND && !is_user_type(type_id)
}

/// Struct fields of these kinds carry full per-value type info; everything
/// else is pinned by the TypeMeta and written bare.
pub const fn field_needs_type_info(type_id: u32) -> bool {
    is_user_type(type_id) || type_id == UNKNOWN
}

/// In-memory element width driving the canonical field sort.
pub const fn primitive_byte_size(type_id: u32) -> u32 {
    match type_id {
        BOOL | INT8 | UINT8 => 1,
        INT16 | UINT16 | FLOAT16 | BFLOAT16 => 2,
        INT32 | VARINT32 | UINT32 | VAR_UINT32 | FLOAT32 => 4,
        INT64 | VARINT64 | TAGGED_INT64 | UINT64 | VAR_UINT64 | TAGGED_UINT64 | FLOAT64 => 8,
        _ => 0,
    }
}

/// Human-readable name for a wire type id, for diagnostics.
pub fn format_type_id(type_id: u32) -> String {
    let name = match u8::try_from(type_id).ok().and_then(|b| TypeId::try_from(b).ok()) {
        Some(id) => match id {
            TypeId::UNKNOWN => "UNKNOWN",
            TypeId::BOOL => "BOOL",
            TypeId::INT8 => "INT8",
            TypeId::INT16 => "INT16",
            TypeId::INT32 => "INT32",
            TypeId::VARINT32 => "VARINT32",
            TypeId::INT64 => "INT64",
            TypeId::VARINT64 => "VARINT64",
            TypeId::TAGGED_INT64 => "TAGGED_INT64",
            TypeId::FLOAT16 => "FLOAT16",
            TypeId::BFLOAT16 => "BFLOAT16",
            TypeId::FLOAT32 => "FLOAT32",
            TypeId::FLOAT64 => "FLOAT64",
            TypeId::STRING => "STRING",
            TypeId::UINT8 => "UINT8",
            TypeId::UINT16 => "UINT16",
            TypeId::UINT32 => "UINT32",
            TypeId::VAR_UINT32 => "VAR_UINT32",
            TypeId::UINT64 => "UINT64",
            TypeId::VAR_UINT64 => "VAR_UINT64",
            TypeId::TAGGED_UINT64 => "TAGGED_UINT64",
            TypeId::DATE => "DATE",
            TypeId::TIMESTAMP => "TIMESTAMP",
            TypeId::DURATION => "DURATION",
            TypeId::BINARY => "BINARY",
            TypeId::BOOL_ARRAY => "BOOL_ARRAY",
            TypeId::INT8_ARRAY => "INT8_ARRAY",
            TypeId::INT16_ARRAY => "INT16_ARRAY",
            TypeId::INT32_ARRAY => "INT32_ARRAY",
            TypeId::INT64_ARRAY => "INT64_ARRAY",
            TypeId::UINT16_ARRAY => "UINT16_ARRAY",
            TypeId::UINT32_ARRAY => "UINT32_ARRAY",
            TypeId::UINT64_ARRAY => "UINT64_ARRAY",
            TypeId::FLOAT16_ARRAY => "FLOAT16_ARRAY",
            TypeId::BFLOAT16_ARRAY => "BFLOAT16_ARRAY",
            TypeId::FLOAT32_ARRAY => "FLOAT32_ARRAY",
            TypeId::FLOAT64_ARRAY => "FLOAT64_ARRAY",
            TypeId::LIST => "LIST",
            TypeId::SET => "SET",
            TypeId::MAP => "MAP",
            TypeId::STRUCT => "STRUCT",
            TypeId::ENUM => "ENUM",
            TypeId::EXT => "EXT",
            TypeId::TYPED_UNION => "TYPED_UNION",
            TypeId::NAMED_STRUCT => "NAMED_STRUCT",
            TypeId::NAMED_ENUM => "NAMED_ENUM",
            TypeId::NAMED_EXT => "NAMED_EXT",
            TypeId::NAMED_UNION => "NAMED_UNION",
            TypeId::COMPATIBLE_STRUCT => "COMPATIBLE_STRUCT",
            TypeId::NAMED_COMPATIBLE_STRUCT => "NAMED_COMPATIBLE_STRUCT",
            TypeId::NONE => "NONE",
            TypeId::BOUND => "BOUND",
        },
        None => return format!("INVALID({})", type_id),
    };
    name.to_string()
}


#[test]
fn ref_flag_round_trips_through_i8() {
    for flag in [RefFlag::Null, RefFlag::Ref, RefFlag::NotNullValue, RefFlag::RefValue] {
        let raw: i8 = flag.into();
        assert_eq!(RefFlag::try_from(raw).unwrap(), flag);
    }
    assert!(RefFlag::try_from(-4i8).is_err());
    assert!(RefFlag::try_from(1i8).is_err());
}

#[test]
fn ref_mode_from_flags() {
    assert_eq!(RefMode::from_flags(false, false), RefMode::None);
    assert_eq!(RefMode::from_flags(true, false), RefMode::NullOnly);
    assert_eq!(RefMode::from_flags(true, true), RefMode::Tracking);
    assert_eq!(RefMode::from_flags(false, true), RefMode::Tracking);
}

#[test]
fn string_tag_matches_wire_value() {
    // Pinned by the protocol: a string type-info block starts with 0x0D.
    assert_eq!(STRING, 0x0D);
    assert!(is_internal_type(STRING));
    assert!(!is_user_type(STRING));
    assert!(is_user_type(NAMED_COMPATIBLE_STRUCT));
}
