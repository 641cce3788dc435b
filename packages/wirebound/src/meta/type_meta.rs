//! The on-the-wire schema of a struct-like type: identity, field list,
//! per-field types, and the hashed envelope the shared-meta protocol
//! transmits.

use crate::buffer::Buffer;
use crate::error::{ensure, Result};
use crate::meta::hash::murmurhash3_x64_128;
use crate::meta::meta_string::{
    decode as decode_meta_string, MetaString, MetaStringEncoding, FIELD_NAME_ENCODER,
    NAMESPACE_ENCODER, TYPE_NAME_ENCODER,
};
use crate::types::{
    self, format_type_id, is_container_type, is_primitive_type, primitive_byte_size,
};
use std::cmp::Ordering;


/// Hash seed fixed by the protocol.
const HASH_SEED: u32 = 47;
/// Sentinel in the 4-bit FieldInfo length nibble.
const FIELD_LEN_EXTENDED: u32 = 15;
/// Sentinel in the 5-bit field-count slot of the body header byte.
const FIELD_COUNT_EXTENDED: u32 = 31;
/// Sentinel in the 8-bit body-length slot of the envelope header.
const BODY_LEN_EXTENDED: usize = 255;
/// FieldInfo encoding selector marking a tag-id field without a name.
const SELECTOR_TAG_ID: u8 = 3;

/// Declared type of one field: wire kind, nullability, ref tracking, and
/// element/key/value child types for containers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldType {
    pub type_id: u32,
    pub nullable: bool,
    pub track_ref: bool,
    pub generics: Vec<FieldType>,
}

impl FieldType {
    pub fn new(type_id: u32) -> Self {
        FieldType {
            type_id,
            nullable: false,
            track_ref: false,
            generics: Vec::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn track_ref(mut self) -> Self {
        self.nullable = true;
        self.track_ref = true;
        self
    }

    pub fn with_generics(mut self, generics: Vec<FieldType>) -> Self {
        self.generics = generics;
        self
    }

    /// Container arity must match the kind before a schema is accepted.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.type_id < types::BOUND,
            InvalidData,
            "field type id {} out of range",
            self.type_id,
        );
        let expected = match self.type_id {
            types::LIST | types::SET => 1,
            types::MAP => 2,
            _ => 0,
        };
        ensure!(
            self.generics.len() == expected,
            InvalidData,
            "{} takes {} type parameters, got {}",
            format_type_id(self.type_id),
            expected,
            self.generics.len(),
        );
        for generic in &self.generics {
            generic.validate()?;
        }
        Ok(())
    }
}

/// One entry of a TypeMeta field list. A field carries either a tag id or
/// a name; tag-id fields serialize without their name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    pub field_id: Option<u32>,
    pub field_name: String,
    pub field_type: FieldType,
}

impl FieldInfo {
    pub fn named(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldInfo {
            field_id: None,
            field_name: name.into(),
            field_type,
        }
    }

    pub fn tagged(field_id: u32, name: impl Into<String>, field_type: FieldType) -> Self {
        FieldInfo {
            field_id: Some(field_id),
            field_name: name.into(),
            field_type,
        }
    }
}

/// Schema descriptor for a struct-like type, in wire-canonical field order.
#[derive(Clone, Debug)]
pub struct TypeMeta {
    type_id: u32,
    user_type_id: Option<u32>,
    namespace: MetaString,
    type_name: MetaString,
    register_by_name: bool,
    fields: Vec<FieldInfo>,
    has_fields_meta: bool,
    compressed: bool,
    header_hash: u64,
}

impl TypeMeta {
    /// Build the schema of an id-registered type. Fields are re-sorted
    /// into canonical order here, so declaration order never leaks into
    /// the wire bytes.
    pub fn from_fields(
        type_id: u32,
        user_type_id: u32,
        mut fields: Vec<FieldInfo>,
    ) -> Result<Self> {
        validate_fields(&fields)?;
        sort_fields(&mut fields);
        Ok(TypeMeta {
            type_id,
            user_type_id: Some(user_type_id),
            namespace: NAMESPACE_ENCODER.encode("")?,
            type_name: TYPE_NAME_ENCODER.encode("")?,
            register_by_name: false,
            fields,
            has_fields_meta: true,
            compressed: false,
            header_hash: 0,
        })
    }

    /// Name-registered pendant of [`TypeMeta::from_fields`].
    pub fn from_named_fields(
        type_id: u32,
        namespace: &str,
        type_name: &str,
        mut fields: Vec<FieldInfo>,
    ) -> Result<Self> {
        validate_fields(&fields)?;
        sort_fields(&mut fields);
        Ok(TypeMeta {
            type_id,
            user_type_id: None,
            namespace: NAMESPACE_ENCODER.encode(namespace)?,
            type_name: TYPE_NAME_ENCODER.encode(type_name)?,
            register_by_name: true,
            fields,
            has_fields_meta: true,
            compressed: false,
            header_hash: 0,
        })
    }

    /// Schema of a type with no field list beyond its identity (enums,
    /// ext types).
    pub fn name_only(
        type_id: u32,
        user_type_id: Option<u32>,
        namespace: &str,
        type_name: &str,
        register_by_name: bool,
    ) -> Result<Self> {
        Ok(TypeMeta {
            type_id,
            user_type_id,
            namespace: NAMESPACE_ENCODER.encode(namespace)?,
            type_name: TYPE_NAME_ENCODER.encode(type_name)?,
            register_by_name,
            fields: Vec::new(),
            has_fields_meta: false,
            compressed: false,
            header_hash: 0,
        })
    }

    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    pub fn user_type_id(&self) -> Option<u32> {
        self.user_type_id
    }

    pub fn namespace(&self) -> &MetaString {
        &self.namespace
    }

    pub fn type_name(&self) -> &MetaString {
        &self.type_name
    }

    pub fn register_by_name(&self) -> bool {
        self.register_by_name
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn has_fields_meta(&self) -> bool {
        self.has_fields_meta
    }

    /// The 50-bit body hash carried in the envelope header.
    pub fn header_hash(&self) -> u64 {
        self.header_hash
    }

    /// Truncation of the body hash used by the schema-consistency check.
    pub fn version_hash(&self) -> u32 {
        self.header_hash as u32
    }

    /// Serialize body plus envelope, filling in `header_hash`.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let body = self.body_bytes()?;
        let (low, _) = murmurhash3_x64_128(&body, HASH_SEED);
        let hash = (low as i64).unsigned_abs() & ((1 << 50) - 1);
        self.header_hash = hash;

        let mut header = u64::min(body.len() as u64, BODY_LEN_EXTENDED as u64);
        if self.has_fields_meta {
            header |= 1 << 8;
        }
        if self.compressed {
            header |= 1 << 9;
        }
        header |= hash << 14;

        let mut out = Buffer::new();
        out.write_u64(header);
        if body.len() >= BODY_LEN_EXTENDED {
            out.write_var_uint32((body.len() - BODY_LEN_EXTENDED) as u32);
        }
        out.write_bytes(&body);
        Ok(out.dump())
    }

    fn body_bytes(&self) -> Result<Vec<u8>> {
        let mut body = Buffer::new();
        let field_count = self.fields.len() as u32;
        let mut head = u32::min(field_count, FIELD_COUNT_EXTENDED) as u8;
        if self.register_by_name {
            head |= 1 << 5;
        }
        body.write_u8(head);
        if field_count >= FIELD_COUNT_EXTENDED {
            body.write_var_uint32(field_count - FIELD_COUNT_EXTENDED);
        }
        if self.register_by_name {
            write_packed_meta_string(&mut body, &self.namespace);
            write_packed_meta_string(&mut body, &self.type_name);
        } else {
            body.write_u8(self.type_id as u8);
            body.write_var_uint32(self.user_type_id.unwrap_or(types::USER_TYPE_ID_UNSET));
        }
        for field in &self.fields {
            write_field(&mut body, field)?;
        }
        Ok(body.dump())
    }

    /// Parse envelope plus body from the stream. The compressed flag is
    /// accepted on the wire but a compressed body is rejected.
    pub fn from_bytes(buffer: &mut Buffer) -> Result<TypeMeta> {
        let header = buffer.read_u64()?;
        let mut body_len = (header & 0xff) as usize;
        let has_fields_meta = header & (1 << 8) != 0;
        let compressed = header & (1 << 9) != 0;
        ensure!(!compressed, InvalidData, "compressed type meta body");
        let header_hash = header >> 14;
        if body_len == BODY_LEN_EXTENDED {
            body_len += buffer.read_var_uint32()? as usize;
        }
        let mut body = Buffer::from_slice(buffer.read_bytes(body_len)?);

        let head = body.read_u8()?;
        let mut field_count = (head & 0x1f) as u32;
        let register_by_name = head & (1 << 5) != 0;
        if field_count == FIELD_COUNT_EXTENDED {
            field_count += body.read_var_uint32()?;
        }

        let (type_id, user_type_id, namespace, type_name);
        if register_by_name {
            namespace = read_packed_meta_string(&mut body, &NAMESPACE_ENCODER)?;
            type_name = read_packed_meta_string(&mut body, &TYPE_NAME_ENCODER)?;
            type_id = 0;
            user_type_id = None;
        } else {
            type_id = body.read_u8()? as u32;
            let raw = body.read_var_uint32()?;
            user_type_id = (raw != types::USER_TYPE_ID_UNSET).then_some(raw);
            namespace = NAMESPACE_ENCODER.encode("")?;
            type_name = TYPE_NAME_ENCODER.encode("")?;
        }

        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(read_field(&mut body)?);
        }
        ensure!(
            body.remaining() == 0,
            InvalidData,
            "{} trailing bytes in type meta body",
            body.remaining(),
        );
        validate_fields(&fields)?;
        Ok(TypeMeta {
            type_id,
            user_type_id,
            namespace,
            type_name,
            register_by_name,
            fields,
            has_fields_meta,
            compressed,
            header_hash,
        })
    }
}

impl TypeMeta {
    /// Render the schema as an indented listing, for logs and failure
    /// messages.
    pub fn pretty_fmt(&self) -> String {
        let mut lines = Vec::new();
        let identity = if self.register_by_name {
            format!(
                "{}.{}",
                self.namespace.original(),
                self.type_name.original(),
            )
        } else {
            match self.user_type_id {
                Some(id) => format!("#{}", id),
                None => "#?".to_string(),
            }
        };
        lines.push(format!(
            "{} {}",
            format_type_id(self.type_id).to_lowercase(),
            identity,
        ));
        for field in &self.fields {
            let label = match field.field_id {
                Some(id) => format!("tag {}", id),
                None => field.field_name.clone(),
            };
            lines.push(format!(
                "  - {}: {}",
                label,
                fmt_field_type(&field.field_type),
            ));
        }
        lines.join("\n")
    }
}

fn fmt_field_type(ft: &FieldType) -> String {
    let mut out = String::new();
    if ft.track_ref {
        out.push_str("tracked ");
    } else if ft.nullable {
        out.push_str("nullable ");
    }
    out.push_str(&format_type_id(ft.type_id).to_lowercase());
    if !ft.generics.is_empty() {
        let inner: Vec<String> = ft.generics.iter().map(fmt_field_type).collect();
        out.push('(');
        out.push_str(&inner.join(", "));
        out.push(')');
    }
    out
}

/// Syntactic sugar for building [`FieldType`] trees at registration
/// sites. Scalar names mirror the wire kinds; `nullable` and `tracked`
/// prefix any type; containers take parenthesized children; `%expr`
/// splices an already-built value.
///
/// ```
/// use wirebound::field_type;
///
/// field_type!(varint32);
/// field_type!(nullable string);
/// field_type!(list(varint32));
/// field_type!(map((string), (nullable varint64)));
/// field_type!(tracked struct);
/// ```
#[macro_export]
macro_rules! field_type {
    (bool)=>{ $crate::meta::FieldType::new($crate::types::BOOL) };
    (int8)=>{ $crate::meta::FieldType::new($crate::types::INT8) };
    (int16)=>{ $crate::meta::FieldType::new($crate::types::INT16) };
    (int32)=>{ $crate::meta::FieldType::new($crate::types::INT32) };
    (varint32)=>{ $crate::meta::FieldType::new($crate::types::VARINT32) };
    (int64)=>{ $crate::meta::FieldType::new($crate::types::INT64) };
    (varint64)=>{ $crate::meta::FieldType::new($crate::types::VARINT64) };
    (tagged_int64)=>{ $crate::meta::FieldType::new($crate::types::TAGGED_INT64) };
    (uint8)=>{ $crate::meta::FieldType::new($crate::types::UINT8) };
    (uint16)=>{ $crate::meta::FieldType::new($crate::types::UINT16) };
    (uint32)=>{ $crate::meta::FieldType::new($crate::types::UINT32) };
    (var_uint32)=>{ $crate::meta::FieldType::new($crate::types::VAR_UINT32) };
    (uint64)=>{ $crate::meta::FieldType::new($crate::types::UINT64) };
    (var_uint64)=>{ $crate::meta::FieldType::new($crate::types::VAR_UINT64) };
    (tagged_uint64)=>{ $crate::meta::FieldType::new($crate::types::TAGGED_UINT64) };
    (float16)=>{ $crate::meta::FieldType::new($crate::types::FLOAT16) };
    (bfloat16)=>{ $crate::meta::FieldType::new($crate::types::BFLOAT16) };
    (float32)=>{ $crate::meta::FieldType::new($crate::types::FLOAT32) };
    (float64)=>{ $crate::meta::FieldType::new($crate::types::FLOAT64) };
    (string)=>{ $crate::meta::FieldType::new($crate::types::STRING) };
    (date)=>{ $crate::meta::FieldType::new($crate::types::DATE) };
    (timestamp)=>{ $crate::meta::FieldType::new($crate::types::TIMESTAMP) };
    (duration)=>{ $crate::meta::FieldType::new($crate::types::DURATION) };
    (binary)=>{ $crate::meta::FieldType::new($crate::types::BINARY) };
    (struct)=>{ $crate::meta::FieldType::new($crate::types::STRUCT) };
    (enum)=>{ $crate::meta::FieldType::new($crate::types::ENUM) };
    (ext)=>{ $crate::meta::FieldType::new($crate::types::EXT) };
    (unknown)=>{ $crate::meta::FieldType::new($crate::types::UNKNOWN) };
    (list($($inner:tt)*))=>{
        $crate::meta::FieldType::new($crate::types::LIST)
            .with_generics(::std::vec![$crate::field_type!($($inner)*)])
    };
    (set($($inner:tt)*))=>{
        $crate::meta::FieldType::new($crate::types::SET)
            .with_generics(::std::vec![$crate::field_type!($($inner)*)])
    };
    (map(($($key:tt)*), ($($value:tt)*)))=>{
        $crate::meta::FieldType::new($crate::types::MAP)
            .with_generics(::std::vec![
                $crate::field_type!($($key)*),
                $crate::field_type!($($value)*),
            ])
    };
    (nullable $($inner:tt)*)=>{ $crate::field_type!($($inner)*).nullable() };
    (tracked $($inner:tt)*)=>{ $crate::field_type!($($inner)*).track_ref() };
    (%$ft:expr)=>{ $ft };
}

pub use field_type;

fn write_packed_meta_string(out: &mut Buffer, ms: &MetaString) {
    let encoding: u8 = ms.encoding().into();
    out.write_var_uint32((ms.bytes().len() as u32) << 2 | encoding as u32);
    out.write_bytes(ms.bytes());
}

fn read_packed_meta_string(body: &mut Buffer, encoder: &'static crate::meta::meta_string::MetaStringEncoder) -> Result<MetaString> {
    let header = body.read_var_uint32()?;
    let encoding = MetaStringEncoding::try_from((header & 0x3) as u8)
        .map_err(|_| crate::error::error!(InvalidData, "bad meta string encoding"))?;
    let len = (header >> 2) as usize;
    let decoded = decode_meta_string(body.read_bytes(len)?, encoding)?;
    encoder.encode(&decoded)
}

fn write_field(body: &mut Buffer, field: &FieldInfo) -> Result<()> {
    let mut head =
        field.field_type.track_ref as u8 | (field.field_type.nullable as u8) << 1;
    let (stored_len, name_bytes): (u32, Option<&MetaString>);
    let name_ms;
    match field.field_id {
        Some(id) => {
            head |= SELECTOR_TAG_ID << 6;
            // tag-id fields store id as length - 1
            stored_len = id;
            name_bytes = None;
        }
        None => {
            ensure!(
                !field.field_name.is_empty(),
                EncodingError,
                "field without a tag id needs a name",
            );
            name_ms = FIELD_NAME_ENCODER.encode(&field.field_name)?;
            let selector: u8 = name_ms.encoding().into();
            head |= selector << 6;
            stored_len = name_ms.bytes().len() as u32 - 1;
            name_bytes = Some(&name_ms);
        }
    }
    head |= (u32::min(stored_len, 14) as u8) << 2;
    if stored_len >= FIELD_LEN_EXTENDED {
        head |= (FIELD_LEN_EXTENDED as u8) << 2;
    }
    body.write_u8(head);
    if stored_len >= FIELD_LEN_EXTENDED {
        body.write_var_uint32(stored_len - FIELD_LEN_EXTENDED);
    }
    write_field_type(body, &field.field_type);
    if let Some(ms) = name_bytes {
        body.write_bytes(ms.bytes());
    }
    Ok(())
}

fn read_field(body: &mut Buffer) -> Result<FieldInfo> {
    let head = body.read_u8()?;
    let track_ref = head & 1 != 0;
    let nullable = head & 2 != 0;
    let mut stored_len = (head >> 2 & 0x0f) as u32;
    let selector = head >> 6;
    if stored_len == FIELD_LEN_EXTENDED {
        stored_len += body.read_var_uint32()?;
    }
    let mut field_type = read_field_type(body)?;
    field_type.track_ref = track_ref;
    field_type.nullable = nullable;
    if selector == SELECTOR_TAG_ID {
        Ok(FieldInfo {
            field_id: Some(stored_len),
            field_name: String::new(),
            field_type,
        })
    } else {
        let encoding = MetaStringEncoding::try_from(selector)
            .map_err(|_| crate::error::error!(InvalidData, "bad field name encoding"))?;
        let name_len = stored_len as usize + 1;
        let field_name = decode_meta_string(body.read_bytes(name_len)?, encoding)?;
        Ok(FieldInfo {
            field_id: None,
            field_name,
            field_type,
        })
    }
}

fn write_field_type(body: &mut Buffer, ft: &FieldType) {
    body.write_var_uint32(ft.type_id);
    for generic in &ft.generics {
        body.write_u8(generic.track_ref as u8 | (generic.nullable as u8) << 1);
        write_field_type(body, generic);
    }
}

fn read_field_type(body: &mut Buffer) -> Result<FieldType> {
    let type_id = body.read_var_uint32()?;
    ensure!(
        type_id < types::BOUND,
        InvalidData,
        "field type id {} out of range",
        type_id,
    );
    let arity = match type_id {
        types::LIST | types::SET => 1,
        types::MAP => 2,
        _ => 0,
    };
    let mut generics = Vec::with_capacity(arity);
    for _ in 0..arity {
        let flags = body.read_u8()?;
        let mut child = read_field_type(body)?;
        child.track_ref = flags & 1 != 0;
        child.nullable = flags & 2 != 0;
        generics.push(child);
    }
    Ok(FieldType {
        type_id,
        nullable: false,
        track_ref: false,
        generics,
    })
}

fn validate_fields(fields: &[FieldInfo]) -> Result<()> {
    for (i, field) in fields.iter().enumerate() {
        field.field_type.validate()?;
        if let Some(id) = field.field_id {
            for other in &fields[i + 1..] {
                ensure!(
                    other.field_id != Some(id),
                    InvalidData,
                    "duplicate field tag id {}",
                    id,
                );
            }
        }
    }
    Ok(())
}

/// Group rank of the canonical ordering: primitives first (widest
/// element first), then boxed primitives, then monomorphic user fields,
/// then other scalars, then containers.
fn sort_group(ft: &FieldType) -> u8 {
    if is_primitive_type(ft.type_id) {
        ft.nullable as u8
    } else if matches!(
        ft.type_id,
        types::STRUCT
            | types::NAMED_STRUCT
            | types::COMPATIBLE_STRUCT
            | types::NAMED_COMPATIBLE_STRUCT
            | types::ENUM
            | types::NAMED_ENUM
    ) {
        2
    } else if is_container_type(ft.type_id) {
        4
    } else {
        3
    }
}

/// Apply the canonical field order. Both peers sort with exactly this
/// rule before writing fields or hashing the body.
pub fn sort_fields(fields: &mut [FieldInfo]) {
    fields.sort_by(|a, b| {
        let ga = sort_group(&a.field_type);
        let gb = sort_group(&b.field_type);
        ga.cmp(&gb)
            .then_with(|| {
                if ga <= 1 {
                    primitive_byte_size(b.field_type.type_id)
                        .cmp(&primitive_byte_size(a.field_type.type_id))
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| a.field_type.type_id.cmp(&b.field_type.type_id))
            .then_with(|| match (a.field_id, b.field_id) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.field_name.cmp(&b.field_name),
            })
    });
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::*;

    fn person_fields() -> Vec<FieldInfo> {
        vec![
            FieldInfo::named("name", FieldType::new(STRING).nullable()),
            FieldInfo::named("age", FieldType::new(VARINT32)),
            FieldInfo::named("scores", FieldType::new(LIST).with_generics(vec![
                FieldType::new(FLOAT64),
            ])),
            FieldInfo::named("alive", FieldType::new(BOOL)),
        ]
    }

    #[test]
    fn canonical_order_ignores_declaration_order() {
        let mut a = person_fields();
        let mut b = person_fields();
        b.reverse();
        sort_fields(&mut a);
        sort_fields(&mut b);
        assert_eq!(a, b);
        // primitives first, widest first, then scalars, then containers
        assert_eq!(a[0].field_name, "age");
        assert_eq!(a[1].field_name, "alive");
        assert_eq!(a[2].field_name, "name");
        assert_eq!(a[3].field_name, "scores");
    }

    #[test]
    fn same_fields_same_bytes() {
        let mut shuffled = person_fields();
        shuffled.swap(0, 3);
        shuffled.swap(1, 2);
        let mut m1 = TypeMeta::from_fields(STRUCT, 7, person_fields()).unwrap();
        let mut m2 = TypeMeta::from_fields(STRUCT, 7, shuffled).unwrap();
        assert_eq!(m1.to_bytes().unwrap(), m2.to_bytes().unwrap());
    }

    #[test]
    fn id_registered_round_trip() {
        let mut meta = TypeMeta::from_fields(STRUCT, 42, person_fields()).unwrap();
        let bytes = meta.to_bytes().unwrap();
        let mut buf = Buffer::from_bytes(bytes);
        let parsed = TypeMeta::from_bytes(&mut buf).unwrap();
        assert_eq!(buf.remaining(), 0);
        assert!(!parsed.register_by_name());
        assert_eq!(parsed.user_type_id(), Some(42));
        assert_eq!(parsed.fields(), meta.fields());
        assert_eq!(parsed.header_hash(), meta.header_hash());
        assert_eq!(parsed.version_hash(), meta.version_hash());
    }

    #[test]
    fn name_registered_round_trip() {
        let mut meta = TypeMeta::from_named_fields(
            NAMED_COMPATIBLE_STRUCT,
            "org.example",
            "Person",
            person_fields(),
        )
        .unwrap();
        let bytes = meta.to_bytes().unwrap();
        let parsed = TypeMeta::from_bytes(&mut Buffer::from_bytes(bytes)).unwrap();
        assert!(parsed.register_by_name());
        assert_eq!(parsed.namespace().original(), "org.example");
        assert_eq!(parsed.type_name().original(), "Person");
        assert_eq!(parsed.fields(), meta.fields());
    }

    #[test]
    fn tagged_fields_round_trip_without_names() {
        let fields = vec![
            FieldInfo::tagged(0, "x", FieldType::new(VARINT32)),
            FieldInfo::tagged(1, "y", FieldType::new(VARINT32)),
            FieldInfo::tagged(300, "far", FieldType::new(STRING).nullable()),
        ];
        let mut meta = TypeMeta::from_fields(STRUCT, 9, fields).unwrap();
        let bytes = meta.to_bytes().unwrap();
        let parsed = TypeMeta::from_bytes(&mut Buffer::from_bytes(bytes)).unwrap();
        let ids: Vec<_> = parsed.fields().iter().map(|f| f.field_id).collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(300)]);
        assert!(parsed.fields().iter().all(|f| f.field_name.is_empty()));
    }

    #[test]
    fn duplicate_tag_id_rejected() {
        let fields = vec![
            FieldInfo::tagged(3, "a", FieldType::new(BOOL)),
            FieldInfo::tagged(3, "b", FieldType::new(BOOL)),
        ];
        assert!(matches!(
            TypeMeta::from_fields(STRUCT, 1, fields),
            Err(Error::InvalidData(_)),
        ));
    }

    #[test]
    fn many_fields_extend_the_count() {
        let fields: Vec<FieldInfo> = (0..40)
            .map(|i| FieldInfo::named(format!("f{:02}", i), FieldType::new(VARINT32)))
            .collect();
        let mut meta = TypeMeta::from_fields(STRUCT, 1, fields).unwrap();
        let bytes = meta.to_bytes().unwrap();
        let parsed = TypeMeta::from_bytes(&mut Buffer::from_bytes(bytes)).unwrap();
        assert_eq!(parsed.fields().len(), 40);
    }

    #[test]
    fn long_body_extends_envelope_length() {
        let fields: Vec<FieldInfo> = (0..40)
            .map(|i| {
                FieldInfo::named(
                    format!("quite_a_long_field_name_number_{:03}", i),
                    FieldType::new(STRING).nullable(),
                )
            })
            .collect();
        let mut meta = TypeMeta::from_named_fields(NAMED_STRUCT, "ns", "Big", fields).unwrap();
        let bytes = meta.to_bytes().unwrap();
        let parsed = TypeMeta::from_bytes(&mut Buffer::from_bytes(bytes)).unwrap();
        assert_eq!(parsed.fields().len(), 40);
        assert_eq!(parsed.type_name().original(), "Big");
    }

    #[test]
    fn compressed_body_rejected() {
        let mut meta = TypeMeta::from_fields(STRUCT, 1, person_fields()).unwrap();
        let mut bytes = meta.to_bytes().unwrap();
        bytes[1] |= 0x02; // envelope bit 9
        assert!(matches!(
            TypeMeta::from_bytes(&mut Buffer::from_bytes(bytes)),
            Err(Error::InvalidData(_)),
        ));
    }

    #[test]
    fn hash_sits_in_the_high_bits() {
        let mut meta = TypeMeta::from_fields(STRUCT, 1, person_fields()).unwrap();
        let bytes = meta.to_bytes().unwrap();
        let header = u64::from_le_bytes(bytes[..8].try_into().unwrap());
        assert_eq!(header >> 14, meta.header_hash());
        assert_ne!(meta.header_hash(), 0);
        assert!(meta.header_hash() < 1 << 50);
    }

    #[test]
    fn map_generics_round_trip() {
        let fields = vec![FieldInfo::named(
            "index",
            FieldType::new(MAP).with_generics(vec![
                FieldType::new(STRING),
                FieldType::new(LIST)
                    .nullable()
                    .with_generics(vec![FieldType::new(VARINT64)]),
            ]),
        )];
        let mut meta = TypeMeta::from_fields(STRUCT, 2, fields.clone()).unwrap();
        let bytes = meta.to_bytes().unwrap();
        let parsed = TypeMeta::from_bytes(&mut Buffer::from_bytes(bytes)).unwrap();
        assert_eq!(parsed.fields(), &fields[..]);
    }

    #[test]
    fn bad_arity_rejected() {
        let fields = vec![FieldInfo::named("xs", FieldType::new(LIST))];
        assert!(TypeMeta::from_fields(STRUCT, 1, fields).is_err());
    }

    #[test]
    fn field_type_macro_builds_trees() {
        assert_eq!(crate::field_type!(varint32), FieldType::new(VARINT32));
        assert_eq!(
            crate::field_type!(nullable string),
            FieldType::new(STRING).nullable(),
        );
        assert_eq!(
            crate::field_type!(list(nullable float64)),
            FieldType::new(LIST).with_generics(vec![FieldType::new(FLOAT64).nullable()]),
        );
        assert_eq!(
            crate::field_type!(map((string), (tracked struct))),
            FieldType::new(MAP).with_generics(vec![
                FieldType::new(STRING),
                FieldType::new(STRUCT).track_ref(),
            ]),
        );
        let spliced = FieldType::new(BINARY);
        assert_eq!(crate::field_type!(%spliced.clone()), spliced);
    }

    #[test]
    fn pretty_fmt_lists_fields_in_wire_order() {
        let meta =
            TypeMeta::from_named_fields(NAMED_STRUCT, "org", "Person", person_fields()).unwrap();
        let rendered = meta.pretty_fmt();
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("named_struct org.Person"));
        assert_eq!(lines.next(), Some("  - age: varint32"));
        assert_eq!(lines.next(), Some("  - alive: bool"));
        assert_eq!(lines.next(), Some("  - name: nullable string"));
        assert_eq!(
            lines.next(),
            Some("  - scores: list(float64)"),
        );
        assert_eq!(lines.next(), None);
    }
}
