//! Error kinds surfaced by the codec, and the macros for raising them.
//!
//! Every failure mode maps onto exactly one variant so that callers can
//! distinguish a malformed stream from a missing registration from a plain
//! out-of-bounds read. The codec never masks an error behind a default
//! value; partial output from a failed write must be discarded by the
//! caller.

use crate::types::format_type_id;
use thiserror::Error;


pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Read or write past the buffer bounds without an attached stream to
    /// refill from.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
    /// Syntactically malformed wire data: unknown tag, overlong varint,
    /// odd UTF-16 byte count, chunk overrun, dense-index gap, trailing
    /// bytes after the root value, header mismatch.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// The local expected type id differs from the on-wire id in a context
    /// where they must match.
    #[error("type mismatch: expected {}, got {}", format_type_id(*.expected), format_type_id(*.actual))]
    TypeMismatch { expected: u32, actual: u32 },
    /// Dynamic decode dispatched to a user type id or (namespace, name)
    /// pair nobody registered.
    #[error("type not registered: {0}")]
    TypeNotRegistered(String),
    /// Ref id out of range, duplicate binding of the same ref id, or a ref
    /// flag byte outside the allowed set.
    #[error("ref error: {0}")]
    RefError(String),
    /// MetaString encoding failure, or a temporal value the wire cannot
    /// represent.
    #[error("encoding error: {0}")]
    EncodingError(String),
    /// The 32-bit struct version hash disagrees in schema-consistent mode.
    #[error("struct version mismatch: local {local:#010x}, peer {peer:#010x}")]
    VersionMismatch { local: u32, peer: u32 },
}

/// Construct an `Error` of the given kind from format args.
macro_rules! error {
    ($kind:ident, $($t:tt)*)=>{
        $crate::error::Error::$kind(format!($($t)*))
    };
}

/// Return early with an `Error` of the given kind.
macro_rules! bail {
    ($kind:ident, $($t:tt)*)=>{
        return Err($crate::error!($kind, $($t)*))
    };
}

/// Return early with an `Error` of the given kind if the condition does not
/// hold.
macro_rules! ensure {
    ($c:expr, $kind:ident, $($t:tt)*)=>{
        if !$c {
            $crate::bail!($kind, $($t)*);
        }
    };
}

pub(crate) use {bail, ensure, error};


#[test]
fn error_display_names_type_ids() {
    let e = Error::TypeMismatch { expected: 13, actual: 4 };
    let s = format!("{}", e);
    assert!(s.contains("STRING"), "{}", s);
    assert!(s.contains("INT32"), "{}", s);
}
