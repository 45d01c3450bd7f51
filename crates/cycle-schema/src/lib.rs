// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type model for the cycle object model.
//!
//! Schemes group object types; each object type keeps an append-only list
//! of versions, each version a [`TypeNode`] tree. A [`SchemaSet`] is built
//! once from any number of scheme definitions, merging those that share a
//! name and resolving every cross-object reference up front.
//!
//! # Architecture
//!
//! ```text
//!   SchemeDef (code, JSON file, VersionedObject)
//!        |
//!        v
//!   SchemaSetBuilder --merge + resolve--> SchemaSet
//!        |                                   |
//!        v                                   v
//!   SchemaError                  ObjectInfo / ObjectType lookups
//! ```

pub mod definition;
pub mod error;
pub mod ids;
pub mod persistence;
pub mod registry;
pub mod types;
pub mod versioned;

pub use definition::{ObjectDef, SchemeDef};
pub use error::{Result, SchemaError};
pub use ids::{ObjectId, TypeId};
pub use persistence::{load_scheme_dir, load_scheme_file, save_scheme_file};
pub use registry::{ObjectInfo, ObjectType, SchemaSet, SchemaSetBuilder, SchemeInfo};
pub use types::{Field, FloatWidth, IntWidth, Reference, TypeNode};
pub use versioned::{FieldVersion, VersionedField, VersionedObject};
