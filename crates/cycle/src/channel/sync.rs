// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Plugin side of the sync protocol.
//!
//! ```text
//!            sync(a)                      sync(b)
//! Unsynced ----------> Synced(a) --Unsync--> Unsynced ---> Synced(b)
//!    ^                     |
//!    +------ unsync() -----+        handshake failure ---> Broken
//! ```
//!
//! The index only reflects the system's state after `Synced` has been
//! observed: every update the system queued before answering is applied
//! before `sync` returns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cycle_schema::{ObjectId, ObjectType, SchemaSet};

use super::message::{Access, PluginMessage, SystemMessage};
use super::{ChannelError, MessageReader, MessageWriter, SyncError};
use crate::codec::{encode_latest, encode_mutation, Mutation, Value};
use crate::config::SyncConfig;
use crate::index::{IndexedObject, ObjectIndex};
use crate::shm::MemoryImporter;

/// Where a [`SyncChannel`] stands in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Unsynced,
    Synced(Access),
    /// A handshake failed half way; the channel is unusable.
    Broken,
}

type Result<T> = std::result::Result<T, SyncError>;

/// Plugin endpoint: owns the local [`ObjectIndex`] and drives the handshake.
pub struct SyncChannel<R, W, I> {
    reader: R,
    writer: W,
    importer: I,
    index: ObjectIndex,
    state: SyncState,
    config: SyncConfig,
}

impl<R, W, I> SyncChannel<R, W, I>
where
    R: MessageReader<SystemMessage>,
    W: MessageWriter<PluginMessage>,
    I: MemoryImporter,
{
    pub fn new(schema: Arc<SchemaSet>, reader: R, writer: W, importer: I) -> Self {
        Self::with_config(schema, reader, writer, importer, SyncConfig::default())
    }

    pub fn with_config(
        schema: Arc<SchemaSet>,
        reader: R,
        writer: W,
        importer: I,
        config: SyncConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            importer,
            index: ObjectIndex::new(schema),
            state: SyncState::Unsynced,
            config,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Local view of the system's objects, current as of the last `sync`.
    pub fn index(&self) -> &ObjectIndex {
        &self.index
    }

    pub fn schema(&self) -> &SchemaSet {
        self.index.schema()
    }

    /// Request `access` and apply every queued update until `Synced`.
    ///
    /// Leaves any previous sync first. With a handshake timeout configured,
    /// expiry fails with [`SyncError::HandshakeTimeout`] and breaks the
    /// channel, as does any other failure inside the handshake.
    pub fn sync(&mut self, access: Access) -> Result<()> {
        match self.state {
            SyncState::Broken => return Err(self.invalid("sync")),
            SyncState::Synced(_) => self.leave()?,
            SyncState::Unsynced => {}
        }
        self.writer.write(&PluginMessage::Sync(access))?;
        log::debug!("[SYNC] requested {:?} access", access);

        match self.handshake() {
            Ok(applied) => {
                self.state = SyncState::Synced(access);
                log::debug!("[SYNC] synced for {:?} after {} updates", access, applied);
                Ok(())
            }
            Err(e) => {
                self.state = SyncState::Broken;
                log::warn!("[SYNC] handshake failed, channel broken: {}", e);
                Err(e)
            }
        }
    }

    /// Leave the synced state. No-op while unsynced.
    pub fn unsync(&mut self) -> Result<()> {
        match self.state {
            SyncState::Broken => Err(self.invalid("unsync")),
            SyncState::Synced(_) => self.leave(),
            SyncState::Unsynced => Ok(()),
        }
    }

    /// Send a full replacement of object `id`, encoded at its latest version.
    pub fn set(&mut self, object: ObjectType, id: ObjectId, value: &Value) -> Result<()> {
        self.require_write("set")?;
        let bytes = encode_latest(self.index.schema(), object, value)?;
        log::trace!("[SYNC] set {} ({} bytes)", id, bytes.len());
        self.writer.write(&PluginMessage::Set { id, bytes })?;
        Ok(())
    }

    /// Send a partial update of object `id`.
    pub fn mutate(&mut self, object: ObjectType, id: ObjectId, mutation: &Mutation) -> Result<()> {
        self.require_write("mutate")?;
        let root = self.index.schema().object_info(object.id())?.latest();
        let bytes = encode_mutation(root, mutation)?;
        log::trace!("[SYNC] mutate {} at {:?}", id, mutation.path);
        self.writer.write(&PluginMessage::Mut { id, bytes })?;
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        self.writer.write(&PluginMessage::Unsync)?;
        self.state = SyncState::Unsynced;
        log::debug!("[SYNC] unsynced");
        Ok(())
    }

    /// Apply updates until `Synced`; returns how many were applied.
    fn handshake(&mut self) -> Result<usize> {
        let deadline = self.config.timeout().map(|t| (t, Instant::now() + t));
        let mut applied = 0;
        loop {
            match self.next_message(deadline)? {
                SystemMessage::IndexObject { id, type_id, mem } => {
                    let mem = self.importer.import(mem)?;
                    // the replaced buffer is released here
                    drop(self.index.put(IndexedObject { id, type_id, mem })?);
                    applied += 1;
                }
                SystemMessage::ForgetObject { type_id, id } => {
                    self.index.remove(type_id, id);
                    applied += 1;
                }
                SystemMessage::Synced => return Ok(applied),
            }
        }
    }

    fn next_message(&mut self, deadline: Option<(Duration, Instant)>) -> Result<SystemMessage> {
        let Some((timeout, deadline)) = deadline else {
            return Ok(self.reader.read()?);
        };
        let left = deadline.saturating_duration_since(Instant::now());
        match self.reader.read_timeout(left) {
            Ok(message) => Ok(message),
            Err(ChannelError::Timeout) => Err(SyncError::HandshakeTimeout(timeout)),
            Err(e) => Err(e.into()),
        }
    }

    fn require_write(&self, operation: &'static str) -> Result<()> {
        match self.state {
            SyncState::Synced(Access::Write) => Ok(()),
            _ => Err(self.invalid(operation)),
        }
    }

    fn invalid(&self, operation: &'static str) -> SyncError {
        SyncError::InvalidSyncState {
            state: self.state,
            operation,
        }
    }
}

impl<R, W, I> std::fmt::Debug for SyncChannel<R, W, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncChannel")
            .field("state", &self.state)
            .field("objects", &self.index.len())
            .finish()
    }
}
