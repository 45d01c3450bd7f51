// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Cycle - versioned objects shared between a system and its plugins
//!
//! A system process owns a set of typed objects. Plugins in other processes
//! see them through shared memory, read them lazily without decoding, and
//! send writes back over a small sync protocol.
//!
//! ## Quick Start
//!
//! ```rust
//! use cycle::codec::{encode_latest, read_object, Value};
//! use cycle::schema::{ObjectDef, SchemaSet, SchemeDef, TypeNode};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = SchemaSet::builder()
//!         .scheme(SchemeDef::new("ui").object(ObjectDef::single(
//!             "Label",
//!             TypeNode::structure([("text", TypeNode::string())]),
//!         )))
//!         .build()?;
//!
//!     let label = schema.object_type("ui", "Label")?;
//!     let bytes = encode_latest(&schema, label, &Value::Struct(vec![Value::from("hi")]))?;
//!
//!     let view = read_object(&schema, label, &bytes)?.view();
//!     let text = view.and_then(|v| v.field("text")).and_then(|t| t.as_str());
//!     assert_eq!(text, Some("hi"));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                          Sync Protocol                              |
//! |   SystemEndpoint <--- SystemMessage / PluginMessage ---> SyncChannel|
//! +---------------------------------------------------------------------+
//! |                          Object Index                               |
//! |   (TypeId, ObjectId) -> SharedMem, lazy ObjectView, references      |
//! +---------------------------------------------------------------------+
//! |                 Codec                 |          Shared Memory      |
//! |   wire encode / lazy views / mutation |   MemHandle, SharedMem,     |
//! |   native images                       |   POSIX + local segments    |
//! +---------------------------------------+-----------------------------+
//! |                 Layout Engine         |  Type Model (cycle-schema)  |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`schema`] - type model, re-exported from `cycle-schema`
//! - [`layout`] - native size/alignment/offsets of every type
//! - [`codec`] - wire format, lazy views, mutations and native images
//! - [`shm`] - shared memory buffers and their exporters/importers
//! - [`index`] - per-plugin object index over shared buffers
//! - [`channel`] - byte channels and the sync protocol
//! - [`config`] - constants and per-connection settings

pub mod channel;
pub mod codec;
pub mod config;
pub mod index;
pub mod layout;
pub mod shm;

/// Type model.
pub use cycle_schema as schema;

pub use channel::{
    Access, ChannelError, LoopbackChannel, PluginMessage, PluginRequest, SyncChannel, SyncError,
    SyncState, SystemEndpoint, SystemMessage,
};
#[cfg(unix)]
pub use channel::WindowChannel;
pub use codec::{CodecError, Mutation, ObjectView, Value, View};
pub use config::SyncConfig;
pub use cycle_schema::{ObjectId, ObjectType, SchemaError, SchemaSet, TypeId, TypeNode};
pub use index::{IndexError, IndexedObject, ObjectIndex};
pub use layout::{compute_layout, LayoutError, LayoutNode, SchemaLayouts};
pub use shm::{LocalSegments, MemHandle, MemoryExporter, MemoryImporter, SharedMem, ShmError};
#[cfg(unix)]
pub use shm::PosixSegments;
