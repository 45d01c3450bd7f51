// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object Index: the resident objects of one process, by type and id.
//!
//! Every slot owns the [`SharedMem`] holding one encoded object. Reads hand
//! out lazy [`ObjectView`]s that borrow the index, so a buffer cannot be
//! replaced or released while a view over it is alive. References inside
//! those views resolve back through the same index.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cycle_schema::{ObjectId, ObjectType, SchemaError, SchemaSet, TypeId};

use crate::codec::{read_info, ObjectView};
use crate::shm::SharedMem;

/// Errors of index updates.
#[derive(Debug)]
pub enum IndexError {
    /// Type outside the registered schema set.
    Schema(SchemaError),
    /// The id belongs to another scheme than the type it is stored under.
    SchemeMismatch { type_id: TypeId, id: ObjectId },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Schema(e) => write!(f, "{}", e),
            IndexError::SchemeMismatch { type_id, id } => {
                write!(f, "object {} cannot be stored as type {}", id, type_id)
            }
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndexError::Schema(e) => Some(e),
            IndexError::SchemeMismatch { .. } => None,
        }
    }
}

impl From<SchemaError> for IndexError {
    fn from(e: SchemaError) -> Self {
        IndexError::Schema(e)
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// An object arriving in the index: identity, type and backing buffer.
#[derive(Debug)]
pub struct IndexedObject {
    pub id: ObjectId,
    pub type_id: TypeId,
    pub mem: SharedMem,
}

type Slots = HashMap<u64, (ObjectId, SharedMem)>;

/// Resident objects keyed by type, then by `ObjectId::to_bits`.
#[derive(Debug)]
pub struct ObjectIndex {
    schema: Arc<SchemaSet>,
    slots: HashMap<TypeId, Slots>,
}

impl ObjectIndex {
    pub fn new(schema: Arc<SchemaSet>) -> Self {
        Self {
            schema,
            slots: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &SchemaSet {
        &self.schema
    }

    /// Store or replace an object.
    ///
    /// Returns the buffer previously stored under the same type and id;
    /// dropping it releases the memory.
    pub fn put(&mut self, object: IndexedObject) -> Result<Option<SharedMem>> {
        let IndexedObject { id, type_id, mem } = object;
        self.schema.validate(type_id)?;
        if id.scheme != type_id.scheme {
            return Err(IndexError::SchemeMismatch { type_id, id });
        }
        log::debug!("[INDEX] put {} as {} ({} bytes)", id, type_id, mem.len());
        let previous = self
            .slots
            .entry(type_id)
            .or_default()
            .insert(id.to_bits(), (id, mem));
        Ok(previous.map(|(_, mem)| mem))
    }

    /// Remove and release an object. Absent objects are a no-op.
    pub fn remove(&mut self, type_id: TypeId, id: ObjectId) -> bool {
        let Some(slots) = self.slots.get_mut(&type_id) else {
            return false;
        };
        let removed = slots.remove(&id.to_bits()).is_some();
        if slots.is_empty() {
            self.slots.remove(&type_id);
        }
        if removed {
            log::debug!("[INDEX] removed {} of {}", id, type_id);
        }
        removed
    }

    pub fn get(&self, object: ObjectType, id: ObjectId) -> Option<ObjectView<'_>> {
        self.lookup(object.id(), id)
    }

    /// Same as `get`, for a type id taken from a reference target.
    pub fn lookup(&self, type_id: TypeId, id: ObjectId) -> Option<ObjectView<'_>> {
        let (_, mem) = self.slots.get(&type_id)?.get(&id.to_bits())?;
        let info = self.schema.object_info(type_id).ok()?;
        Some(read_info(info, mem.as_bytes(), Some(self)))
    }

    /// Every stored object of a type, in map order.
    pub fn iter(
        &self,
        object: ObjectType,
    ) -> impl Iterator<Item = (ObjectId, ObjectView<'_>)> + '_ {
        let info = self.schema.object_info(object.id()).ok();
        let slots = info.and(self.slots.get(&object.id()));
        slots
            .into_iter()
            .flat_map(|slots| slots.values())
            .filter_map(move |(id, mem)| {
                let info = info?;
                Some((*id, read_info(info, mem.as_bytes(), Some(self))))
            })
    }

    pub fn contains(&self, type_id: TypeId, id: ObjectId) -> bool {
        self.slots
            .get(&type_id)
            .is_some_and(|slots| slots.contains_key(&id.to_bits()))
    }

    /// Objects stored under one type.
    pub fn count(&self, object: ObjectType) -> usize {
        self.slots.get(&object.id()).map_or(0, HashMap::len)
    }

    /// Objects stored across all types.
    pub fn len(&self) -> usize {
        self.slots.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Release every stored buffer.
    pub fn clear(&mut self) {
        let released = self.len();
        self.slots.clear();
        log::debug!("[INDEX] cleared {} objects", released);
    }
}
