// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;
use std::io;

// ---------------------------------------------------------------------------
// SchemaError
// ---------------------------------------------------------------------------

/// Errors produced while registering or looking up schemas.
#[derive(Debug)]
pub enum SchemaError {
    /// A scheme name (or numeric scheme id) is not part of the set.
    SchemeNotDefined(String),
    /// An object type is not defined inside an otherwise known scheme.
    ObjectNotDefined { scheme: String, object: String },
    /// Two definitions of the same object disagree on their shared history.
    ConflictingVersions { scheme: String, object: String },
    /// An object type was declared without any version.
    EmptyObject { scheme: String, object: String },
    /// A struct, union or enum declares the same name twice.
    DuplicateName { context: String, name: String },
    /// A versioned field has `removed <= added`, or `added == 0`.
    InvalidVersionRange {
        field: String,
        added: u16,
        removed: Option<u16>,
    },
    /// More versions than the `u16` version prefix can address.
    TooManyVersions { object: String, count: usize },
    /// Schema file could not be read or written.
    Io(io::Error),
    /// Schema file is not valid JSON for a scheme definition.
    Parse(serde_json::Error),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::SchemeNotDefined(name) => write!(f, "scheme not defined: {}", name),
            SchemaError::ObjectNotDefined { scheme, object } => {
                write!(f, "object not defined: {}::{}", scheme, object)
            }
            SchemaError::ConflictingVersions { scheme, object } => write!(
                f,
                "conflicting version history for {}::{} (neither is a prefix of the other)",
                scheme, object
            ),
            SchemaError::EmptyObject { scheme, object } => {
                write!(f, "object {}::{} has no versions", scheme, object)
            }
            SchemaError::DuplicateName { context, name } => {
                write!(f, "duplicate name '{}' in {}", name, context)
            }
            SchemaError::InvalidVersionRange {
                field,
                added,
                removed,
            } => match removed {
                Some(removed) => write!(
                    f,
                    "field '{}' has invalid version range [{}, {})",
                    field, added, removed
                ),
                None => write!(f, "field '{}' added in invalid version {}", field, added),
            },
            SchemaError::TooManyVersions { object, count } => {
                write!(f, "object {} declares {} versions (max 65535)", object, count)
            }
            SchemaError::Io(e) => write!(f, "schema I/O error: {}", e),
            SchemaError::Parse(e) => write!(f, "schema parse error: {}", e),
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemaError::Io(e) => Some(e),
            SchemaError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SchemaError {
    fn from(e: io::Error) -> Self {
        SchemaError::Io(e)
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(e: serde_json::Error) -> Self {
        SchemaError::Parse(e)
    }
}

/// Result alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
