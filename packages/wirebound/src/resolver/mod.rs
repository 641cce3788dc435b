//! Type registry and the per-stream resolution caches.

pub mod context;
pub mod meta_context;
pub mod ref_context;
pub mod type_resolver;

pub use context::{ReadContext, WriteContext};
pub use meta_context::{MetaContext, MetaStringContext};
pub use ref_context::{RefReadContext, RefWriteContext};
pub use type_resolver::{Dispatch, ExtHarness, TypeInfo, TypeKey, TypeResolver};
