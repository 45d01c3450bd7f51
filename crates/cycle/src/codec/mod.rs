// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire codec: value writer, lazy zero-copy views, native images.
//!
//! # Wire format
//!
//! ```text
//! object   := u16 version, body(versions[version])
//! bool     := u8 (0/1)          optional := u8 flag, [body(child)]
//! int/float:= LE bytes          string   := usize len, utf8 bytes
//! enum     := usize ordinal     union    := usize tag, body(fields[tag])
//! reference:= u64 id bits       struct   := body(field) in declaration order
//! list/map := usize count, [usize end offsets], packed bodies
//! ```
//!
//! `usize` is always 8 bytes on the wire. Lists and maps carry an offset
//! table only when their elements are not statically sized.

mod cursor;
mod mutation;
mod native;
mod value;
mod view;
mod wire_size;
mod writer;

pub use cursor::{Cursor, WireError, WireWriter};
pub use mutation::{apply_mutation, decode_mutation, encode_mutation, type_at_path, Mutation};
pub use native::{decode_native, encode_native};
pub use value::Value;
pub use view::{
    read_object, view, ListView, MapView, ObjectRef, ObjectView, RefView, StructView, UnionView,
    View, ViewKind,
};
pub use wire_size::{encoded_len, wire_size};
pub use writer::{encode, encode_latest, encode_object, Writer};

pub(crate) use cursor::{corrupt, OrCorrupt};
pub(crate) use view::read_info;

use std::fmt;

use cycle_schema::SchemaError;

/// Errors produced while encoding values.
#[derive(Debug)]
pub enum CodecError {
    /// Value kind does not match the type node.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// Enum variant or union field ordinal out of range.
    InvalidOrdinal {
        kind: &'static str,
        ordinal: usize,
        count: usize,
    },
    /// Wrong element count for a fixed array, struct or tuple.
    LengthMismatch { expected: usize, found: usize },
    /// A mutation path does not lead to a value.
    InvalidPath { path: Vec<usize>, depth: usize },
    /// Reference node was never bound to an object type.
    UnresolvedReference(String),
    /// Referenced id belongs to a different scheme than the reference target.
    ReferenceScheme { expected: u32, found: u32 },
    /// Version index past the known history of the object type.
    VersionOutOfRange { version: u16, count: usize },
    /// Object written at an older version where the latest is required.
    StaleVersion { version: u16, latest: u16 },
    /// Native images of untagged unions cannot be decoded.
    UntaggedUnion,
    /// Schema lookup failed.
    Schema(SchemaError),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            CodecError::InvalidOrdinal {
                kind,
                ordinal,
                count,
            } => write!(f, "{} ordinal {} out of range (count {})", kind, ordinal, count),
            CodecError::LengthMismatch { expected, found } => {
                write!(f, "length mismatch: expected {}, found {}", expected, found)
            }
            CodecError::InvalidPath { path, depth } => {
                write!(f, "invalid path {:?} (fails at depth {})", path, depth)
            }
            CodecError::UnresolvedReference(name) => write!(f, "unresolved reference to {}", name),
            CodecError::ReferenceScheme { expected, found } => write!(
                f,
                "reference expects scheme {}, id belongs to scheme {}",
                expected, found
            ),
            CodecError::VersionOutOfRange { version, count } => {
                write!(f, "version {} out of range ({} known)", version, count)
            }
            CodecError::StaleVersion { version, latest } => {
                write!(f, "version {} is stale, latest is {}", version, latest)
            }
            CodecError::UntaggedUnion => write!(f, "untagged union has no stored discriminant"),
            CodecError::Schema(e) => write!(f, "schema error: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaError> for CodecError {
    fn from(e: SchemaError) -> Self {
        CodecError::Schema(e)
    }
}

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
