//! Registry of user-defined types: how a local type key maps to its wire
//! identity, schema, and serializer.
//!
//! Registration happens once, single-threaded, before any stream is
//! produced; `freeze` flips the resolver into its lookup-only state, after
//! which shared references may be used concurrently. Registration mistakes
//! (duplicate keys, registering after freeze) are programmer errors and
//! panic; everything wire-driven returns `Result`.

use crate::error::{bail, ensure, Result};
use crate::meta::{FieldInfo, TypeMeta};
use crate::types::{self, format_type_id, Mode, USER_TYPE_ID_UNSET};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;


/// Local identity of a registered type: either a numeric id or a
/// namespace-qualified name, mirroring the two registration forms.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Id(u32),
    Name { namespace: String, name: String },
}

impl TypeKey {
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeKey::Name {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TypeKey::Id(id) => write!(f, "#{}", id),
            TypeKey::Name { namespace, name } if namespace.is_empty() => write!(f, "{}", name),
            TypeKey::Name { namespace, name } => write!(f, "{}.{}", namespace, name),
        }
    }
}

pub type ExtWriteFn =
    dyn Fn(&Value, &mut crate::resolver::context::WriteContext) -> Result<()> + Send + Sync;
pub type ExtReadFn =
    dyn Fn(&mut crate::resolver::context::ReadContext) -> Result<Value> + Send + Sync;

/// Caller-supplied write/read pair for an ext type; the payload shape is
/// whatever the pair agrees on.
#[derive(Clone)]
pub struct ExtHarness {
    write_fn: Arc<ExtWriteFn>,
    read_fn: Arc<ExtReadFn>,
}

impl ExtHarness {
    pub fn new<W, R>(write_fn: W, read_fn: R) -> ExtHarness
    where
        W: Fn(&Value, &mut crate::resolver::context::WriteContext) -> Result<()>
            + Send
            + Sync
            + 'static,
        R: Fn(&mut crate::resolver::context::ReadContext) -> Result<Value>
            + Send
            + Sync
            + 'static,
    {
        ExtHarness {
            write_fn: Arc::new(write_fn),
            read_fn: Arc::new(read_fn),
        }
    }

    pub fn write_fn(&self) -> Arc<ExtWriteFn> {
        Arc::clone(&self.write_fn)
    }

    pub fn read_fn(&self) -> Arc<ExtReadFn> {
        Arc::clone(&self.read_fn)
    }
}

/// Serializer bound to a registered type. Struct types use the generic
/// meta-driven serializer; an external generator may swap in a prebuilt
/// harness via `register_serializer`, which the resolver then must use.
pub enum Dispatch {
    Struct,
    Enum { variant_count: u32 },
    Ext(ExtHarness),
}

/// Everything the codec knows about one registered type.
pub struct TypeInfo {
    type_key: TypeKey,
    /// Base wire kind: STRUCT, ENUM, or EXT.
    kind: u32,
    user_type_id: Option<u32>,
    namespace: String,
    type_name: String,
    register_by_name: bool,
    meta: Arc<TypeMeta>,
    /// Envelope bytes of `meta`, precomputed so per-stream writes are a
    /// plain copy.
    meta_bytes: Vec<u8>,
    /// Fields in declaration order; `meta` holds the canonical wire order.
    declared_fields: Vec<FieldInfo>,
    dispatch: Dispatch,
}

impl TypeInfo {
    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    pub fn kind(&self) -> u32 {
        self.kind
    }

    pub fn user_type_id(&self) -> Option<u32> {
        self.user_type_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn register_by_name(&self) -> bool {
        self.register_by_name
    }

    pub fn meta(&self) -> &Arc<TypeMeta> {
        &self.meta
    }

    pub fn meta_bytes(&self) -> &[u8] {
        &self.meta_bytes
    }

    pub fn declared_fields(&self) -> &[FieldInfo] {
        &self.declared_fields
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Tag byte this type writes under the given schema mode.
    pub fn wire_tag(&self, mode: Mode) -> u32 {
        match (&self.dispatch, self.register_by_name, mode) {
            (Dispatch::Struct, false, Mode::SchemaConsistent) => types::STRUCT,
            (Dispatch::Struct, false, Mode::Compatible) => types::COMPATIBLE_STRUCT,
            (Dispatch::Struct, true, Mode::SchemaConsistent) => types::NAMED_STRUCT,
            (Dispatch::Struct, true, Mode::Compatible) => types::NAMED_COMPATIBLE_STRUCT,
            (Dispatch::Enum { .. }, false, _) => types::ENUM,
            (Dispatch::Enum { .. }, true, _) => types::NAMED_ENUM,
            (Dispatch::Ext(_), false, _) => types::EXT,
            (Dispatch::Ext(_), true, _) => types::NAMED_EXT,
        }
    }
}

#[derive(Default)]
struct KindModes {
    by_id: usize,
    by_name: usize,
}

/// The registry. `freeze` is one-way; lookups after it are lock-free and
/// safe to share across threads.
#[derive(Default)]
pub struct TypeResolver {
    infos: Vec<Arc<TypeInfo>>,
    by_key: HashMap<TypeKey, usize>,
    by_id: HashMap<(u32, u32), usize>,
    by_name: HashMap<(u32, String, String), usize>,
    modes: HashMap<u32, KindModes>,
    frozen: AtomicBool,
}

impl TypeResolver {
    pub fn new() -> Self {
        TypeResolver::default()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// End the registration phase. Idempotent.
    pub fn freeze(&self) {
        if !self.frozen.swap(true, Ordering::AcqRel) {
            debug!(types = self.infos.len(), "type resolver frozen");
        }
    }

    pub fn register_struct(&mut self, id: u32, fields: Vec<FieldInfo>) -> Result<TypeKey> {
        let mut meta = TypeMeta::from_fields(types::STRUCT, id, fields.clone())?;
        let meta_bytes = meta.to_bytes()?;
        self.insert(TypeInfo {
            type_key: TypeKey::Id(id),
            kind: types::STRUCT,
            user_type_id: Some(id),
            namespace: String::new(),
            type_name: String::new(),
            register_by_name: false,
            meta: Arc::new(meta),
            meta_bytes,
            declared_fields: fields,
            dispatch: Dispatch::Struct,
        })
    }

    pub fn register_struct_by_name(
        &mut self,
        namespace: &str,
        name: &str,
        fields: Vec<FieldInfo>,
    ) -> Result<TypeKey> {
        let mut meta =
            TypeMeta::from_named_fields(types::NAMED_STRUCT, namespace, name, fields.clone())?;
        let meta_bytes = meta.to_bytes()?;
        self.insert(TypeInfo {
            type_key: TypeKey::named(namespace, name),
            kind: types::STRUCT,
            user_type_id: None,
            namespace: namespace.to_string(),
            type_name: name.to_string(),
            register_by_name: true,
            meta: Arc::new(meta),
            meta_bytes,
            declared_fields: fields,
            dispatch: Dispatch::Struct,
        })
    }

    pub fn register_enum(&mut self, id: u32, variant_count: u32) -> Result<TypeKey> {
        let mut meta = TypeMeta::name_only(types::ENUM, Some(id), "", "", false)?;
        let meta_bytes = meta.to_bytes()?;
        self.insert(TypeInfo {
            type_key: TypeKey::Id(id),
            kind: types::ENUM,
            user_type_id: Some(id),
            namespace: String::new(),
            type_name: String::new(),
            register_by_name: false,
            meta: Arc::new(meta),
            meta_bytes,
            declared_fields: Vec::new(),
            dispatch: Dispatch::Enum { variant_count },
        })
    }

    pub fn register_enum_by_name(
        &mut self,
        namespace: &str,
        name: &str,
        variant_count: u32,
    ) -> Result<TypeKey> {
        let mut meta = TypeMeta::name_only(types::NAMED_ENUM, None, namespace, name, true)?;
        let meta_bytes = meta.to_bytes()?;
        self.insert(TypeInfo {
            type_key: TypeKey::named(namespace, name),
            kind: types::ENUM,
            user_type_id: None,
            namespace: namespace.to_string(),
            type_name: name.to_string(),
            register_by_name: true,
            meta: Arc::new(meta),
            meta_bytes,
            declared_fields: Vec::new(),
            dispatch: Dispatch::Enum { variant_count },
        })
    }

    /// Register a type whose payload is owned by a caller-supplied
    /// serializer.
    pub fn register_ext(&mut self, id: u32, harness: ExtHarness) -> Result<TypeKey> {
        let mut meta = TypeMeta::name_only(types::EXT, Some(id), "", "", false)?;
        let meta_bytes = meta.to_bytes()?;
        self.insert(TypeInfo {
            type_key: TypeKey::Id(id),
            kind: types::EXT,
            user_type_id: Some(id),
            namespace: String::new(),
            type_name: String::new(),
            register_by_name: false,
            meta: Arc::new(meta),
            meta_bytes,
            declared_fields: Vec::new(),
            dispatch: Dispatch::Ext(harness),
        })
    }

    pub fn register_ext_by_name(
        &mut self,
        namespace: &str,
        name: &str,
        harness: ExtHarness,
    ) -> Result<TypeKey> {
        let mut meta = TypeMeta::name_only(types::NAMED_EXT, None, namespace, name, true)?;
        let meta_bytes = meta.to_bytes()?;
        self.insert(TypeInfo {
            type_key: TypeKey::named(namespace, name),
            kind: types::EXT,
            user_type_id: None,
            namespace: namespace.to_string(),
            type_name: name.to_string(),
            register_by_name: true,
            meta: Arc::new(meta),
            meta_bytes,
            declared_fields: Vec::new(),
            dispatch: Dispatch::Ext(harness),
        })
    }

    fn insert(&mut self, info: TypeInfo) -> Result<TypeKey> {
        if self.is_frozen() {
            panic!("type registration after resolver freeze");
        }
        if let Some(id) = info.user_type_id {
            ensure!(
                id != USER_TYPE_ID_UNSET,
                InvalidData,
                "user type id {} is reserved",
                id,
            );
        }
        if self.by_key.contains_key(&info.type_key) {
            panic!("type {} registered twice", info.type_key);
        }
        let key = info.type_key.clone();
        let index = self.infos.len();
        if info.register_by_name {
            self.modes.entry(info.kind).or_default().by_name += 1;
            self.by_name.insert(
                (info.kind, info.namespace.clone(), info.type_name.clone()),
                index,
            );
        } else {
            self.modes.entry(info.kind).or_default().by_id += 1;
            self.by_id
                .insert((info.kind, info.user_type_id.unwrap()), index);
        }
        debug!(
            key = %info.type_key,
            kind = %format_type_id(info.kind),
            by_name = info.register_by_name,
            "registered type",
        );
        self.by_key.insert(key.clone(), index);
        self.infos.push(Arc::new(info));
        Ok(key)
    }

    pub fn get(&self, key: &TypeKey) -> Result<Arc<TypeInfo>> {
        match self.by_key.get(key) {
            Some(&i) => Ok(Arc::clone(&self.infos[i])),
            None => bail!(TypeNotRegistered, "{}", key),
        }
    }

    /// Dynamic dispatch for an id carried on the wire.
    pub fn by_wire_id(&self, kind: u32, id: u32) -> Result<Arc<TypeInfo>> {
        self.check_unambiguous(kind)?;
        match self.by_id.get(&(kind, id)) {
            Some(&i) => Ok(Arc::clone(&self.infos[i])),
            None => bail!(
                TypeNotRegistered,
                "{} id {}",
                format_type_id(kind),
                id,
            ),
        }
    }

    /// Dynamic dispatch for a (namespace, name) pair carried on the wire.
    pub fn by_wire_name(&self, kind: u32, namespace: &str, name: &str) -> Result<Arc<TypeInfo>> {
        self.check_unambiguous(kind)?;
        match self
            .by_name
            .get(&(kind, namespace.to_string(), name.to_string()))
        {
            Some(&i) => Ok(Arc::clone(&self.infos[i])),
            None => bail!(
                TypeNotRegistered,
                "{} {}{}{}",
                format_type_id(kind),
                namespace,
                if namespace.is_empty() { "" } else { "." },
                name,
            ),
        }
    }

    /// A kind registered both by id and by name cannot be dispatched
    /// unambiguously; the mix is reported at the first dynamic decode.
    fn check_unambiguous(&self, kind: u32) -> Result<()> {
        if let Some(modes) = self.modes.get(&kind) {
            ensure!(
                modes.by_id == 0 || modes.by_name == 0,
                InvalidData,
                "{} types registered both by id and by name; dynamic dispatch is ambiguous",
                format_type_id(kind),
            );
        }
        Ok(())
    }
}
