// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! System side of the sync protocol.
//!
//! Updates published between two syncs are queued and delivered, in order,
//! when the plugin next asks to sync. Writes coming back from the plugin are
//! surfaced to the caller as [`PluginRequest`]s.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use cycle_schema::{ObjectId, ObjectType, SchemaSet, TypeId};

use super::message::{Access, PluginMessage, SystemMessage};
use super::{MessageReader, MessageWriter, SyncError};
use crate::codec::{
    apply_mutation, decode_mutation, encode_latest, read_object, CodecError, ObjectView, Value,
};
use crate::shm::{MemHandle, MemoryExporter};

type Result<T> = std::result::Result<T, SyncError>;

/// A write sent by a synced plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginRequest {
    /// Replace the object; `bytes` carry a version prefix.
    Set {
        id: ObjectId,
        /// Type the object was last published under, if any.
        type_id: Option<TypeId>,
        bytes: Vec<u8>,
    },
    /// Partial update against the object's latest version.
    Mut {
        id: ObjectId,
        type_id: Option<TypeId>,
        bytes: Vec<u8>,
    },
}

impl PluginRequest {
    pub fn id(&self) -> ObjectId {
        match self {
            PluginRequest::Set { id, .. } | PluginRequest::Mut { id, .. } => *id,
        }
    }

    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            PluginRequest::Set { type_id, .. } | PluginRequest::Mut { type_id, .. } => *type_id,
        }
    }

    /// Apply the request to `current`, the system's copy of the object.
    ///
    /// `current` always holds the latest version, so a `Set` must be written
    /// at it: older versions fail with `StaleVersion`, newer ones with
    /// `VersionOutOfRange`.
    pub fn apply_to(
        &self,
        schema: &SchemaSet,
        object: ObjectType,
        current: &mut Value,
    ) -> std::result::Result<(), CodecError> {
        let info = schema.object_info(object.id())?;
        match self {
            PluginRequest::Set { bytes, .. } => match read_object(schema, object, bytes)? {
                ObjectView::Known { version, view } => {
                    if version != info.latest_version() {
                        return Err(CodecError::StaleVersion {
                            version,
                            latest: info.latest_version(),
                        });
                    }
                    *current = view.to_value();
                    Ok(())
                }
                ObjectView::Unknown { version, .. } => Err(CodecError::VersionOutOfRange {
                    version,
                    count: info.versions().len(),
                }),
            },
            PluginRequest::Mut { bytes, .. } => {
                let root = info.latest();
                let mutation = decode_mutation(root, bytes)?;
                apply_mutation(root, current, &mutation)
            }
        }
    }
}

/// System endpoint serving one plugin.
///
/// At most one update per object waits in the queue: a newer publish or a
/// forget withdraws the pending one and releases its export. Exports still
/// queued when the endpoint is dropped are released too.
pub struct SystemEndpoint<R, W, E: MemoryExporter> {
    reader: R,
    writer: W,
    exporter: E,
    queue: VecDeque<SystemMessage>,
    published: HashMap<ObjectId, TypeId>,
    access: Option<Access>,
}

impl<R, W, E> SystemEndpoint<R, W, E>
where
    R: MessageReader<PluginMessage>,
    W: MessageWriter<SystemMessage>,
    E: MemoryExporter,
{
    pub fn new(reader: R, writer: W, exporter: E) -> Self {
        Self {
            reader,
            writer,
            exporter,
            queue: VecDeque::new(),
            published: HashMap::new(),
            access: None,
        }
    }

    /// Access the plugin currently holds, `None` while unsynced.
    pub fn access(&self) -> Option<Access> {
        self.access
    }

    /// Updates waiting for the plugin's next sync.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Export `bytes` (version prefix plus body) and queue them for the plugin.
    ///
    /// Replaces an update for `id` that is still waiting.
    pub fn publish(&mut self, type_id: TypeId, id: ObjectId, bytes: &[u8]) -> Result<MemHandle> {
        self.withdraw(id)?;
        let mem = self.exporter.export(bytes)?;
        log::trace!("[SYNC] queued {} as {} ({} bytes)", id, type_id, bytes.len());
        self.queue.push_back(SystemMessage::IndexObject { id, type_id, mem });
        self.published.insert(id, type_id);
        Ok(mem)
    }

    /// Encode `value` at the latest version and publish it.
    pub fn publish_value(
        &mut self,
        schema: &SchemaSet,
        object: ObjectType,
        id: ObjectId,
        value: &Value,
    ) -> Result<MemHandle> {
        let bytes = encode_latest(schema, object, value)?;
        self.publish(object.id(), id, &bytes)
    }

    /// Queue removal of object `id`, dropping any update still waiting for it.
    pub fn forget(&mut self, type_id: TypeId, id: ObjectId) -> Result<()> {
        self.withdraw(id)?;
        self.queue.push_back(SystemMessage::ForgetObject { type_id, id });
        self.published.remove(&id);
        Ok(())
    }

    /// Remove the queued message for `id`, if any.
    fn withdraw(&mut self, id: ObjectId) -> Result<()> {
        let Some(at) = self.queue.iter().position(|message| queued_for(message) == Some(id)) else {
            return Ok(());
        };
        if let Some(SystemMessage::IndexObject { mem, .. }) = self.queue.remove(at) {
            log::trace!("[SYNC] superseded pending update of {}", id);
            self.exporter.release(mem)?;
        }
        Ok(())
    }

    /// Handle one plugin message, blocking until it arrives.
    ///
    /// Sync requests are answered here; writes are returned to the caller.
    pub fn serve(&mut self) -> Result<Option<PluginRequest>> {
        let message = self.reader.read()?;
        self.handle(message)
    }

    /// Like `serve`, failing with a channel timeout after `timeout`.
    pub fn serve_timeout(&mut self, timeout: Duration) -> Result<Option<PluginRequest>> {
        let message = self.reader.read_timeout(timeout)?;
        self.handle(message)
    }

    fn handle(&mut self, message: PluginMessage) -> Result<Option<PluginRequest>> {
        match message {
            PluginMessage::Sync(access) => {
                let flushed = self.queue.len();
                // popped only once written, so a failed flush still releases the rest on drop
                while let Some(update) = self.queue.front() {
                    self.writer.write(update)?;
                    self.queue.pop_front();
                }
                self.writer.write(&SystemMessage::Synced)?;
                self.access = Some(access);
                log::debug!("[SYNC] plugin synced for {:?}, {} updates sent", access, flushed);
                Ok(None)
            }
            PluginMessage::Unsync => {
                self.access = None;
                log::debug!("[SYNC] plugin unsynced");
                Ok(None)
            }
            PluginMessage::Set { id, bytes } => Ok(self.request(id, |type_id| {
                PluginRequest::Set { id, type_id, bytes }
            })),
            PluginMessage::Mut { id, bytes } => Ok(self.request(id, |type_id| {
                PluginRequest::Mut { id, type_id, bytes }
            })),
        }
    }

    fn request(
        &self,
        id: ObjectId,
        build: impl FnOnce(Option<TypeId>) -> PluginRequest,
    ) -> Option<PluginRequest> {
        if self.access != Some(Access::Write) {
            log::warn!("[SYNC] dropped write to {} from plugin without write access", id);
            return None;
        }
        Some(build(self.published.get(&id).copied()))
    }
}

fn queued_for(message: &SystemMessage) -> Option<ObjectId> {
    match message {
        SystemMessage::IndexObject { id, .. } | SystemMessage::ForgetObject { id, .. } => Some(*id),
        SystemMessage::Synced => None,
    }
}

impl<R, W, E: MemoryExporter> Drop for SystemEndpoint<R, W, E> {
    fn drop(&mut self) {
        for message in self.queue.drain(..) {
            if let SystemMessage::IndexObject { id, mem, .. } = message {
                if let Err(e) = self.exporter.release(mem) {
                    log::warn!("[SYNC] failed to release undelivered {}: {}", id, e);
                }
            }
        }
    }
}

impl<R, W, E: MemoryExporter> std::fmt::Debug for SystemEndpoint<R, W, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemEndpoint")
            .field("access", &self.access)
            .field("pending", &self.queue.len())
            .field("published", &self.published.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{LoopbackChannel, LoopbackReader, LoopbackWriter};
    use crate::codec::Mutation;
    use crate::shm::LocalSegments;
    use cycle_schema::{ObjectDef, SchemeDef, TypeNode};

    type System = SystemEndpoint<LoopbackReader, LoopbackWriter, LocalSegments>;

    fn endpoint() -> (System, LoopbackWriter, LoopbackReader) {
        let (to_system, system_rx) = LoopbackChannel::pair();
        let (system_tx, from_system) = LoopbackChannel::pair();
        let system = SystemEndpoint::new(system_rx, system_tx, LocalSegments::new());
        (system, to_system, from_system)
    }

    fn schema() -> SchemaSet {
        SchemaSet::builder()
            .scheme(SchemeDef::new("app").object(ObjectDef::single(
                "Point",
                TypeNode::structure([("x", TypeNode::i32()), ("y", TypeNode::i32())]),
            )))
            .build()
            .unwrap()
    }

    #[test]
    fn test_sync_flushes_queue_in_order() {
        let (mut system, mut plugin_tx, mut plugin_rx) = endpoint();
        let ty = TypeId::new(0, 0);
        let a = ObjectId::new(0, 0, 1);
        let b = ObjectId::new(0, 0, 2);
        system.publish(ty, a, &[0, 0, 1]).unwrap();
        system.publish(ty, b, &[0, 0, 2]).unwrap();
        let newer = system.publish(ty, a, &[0, 0, 3]).unwrap();
        system.forget(ty, b).unwrap();
        assert_eq!(system.pending(), 2);

        plugin_tx.write(&PluginMessage::Sync(Access::Read)).unwrap();
        assert_eq!(system.serve().unwrap(), None);
        assert_eq!(system.access(), Some(Access::Read));
        assert_eq!(system.pending(), 0);

        let first: SystemMessage = plugin_rx.read().unwrap();
        assert_eq!(
            first,
            SystemMessage::IndexObject {
                id: a,
                type_id: ty,
                mem: newer
            }
        );
        let second: SystemMessage = plugin_rx.read().unwrap();
        assert_eq!(second, SystemMessage::ForgetObject { type_id: ty, id: b });
        let third: SystemMessage = plugin_rx.read().unwrap();
        assert_eq!(third, SystemMessage::Synced);
    }

    #[test]
    fn test_undelivered_exports_are_released() {
        let segments = LocalSegments::new();
        let (_to_system, system_rx) = LoopbackChannel::pair();
        let (system_tx, _from_system) = LoopbackChannel::pair();
        let mut system: System = SystemEndpoint::new(system_rx, system_tx, segments.clone());
        let ty = TypeId::new(0, 0);
        let a = ObjectId::new(0, 0, 1);

        for n in 0..100u8 {
            system.publish(ty, a, &[0, 0, n]).unwrap();
        }
        assert_eq!(system.pending(), 1);
        assert_eq!(segments.pending(), 1);

        system.forget(ty, a).unwrap();
        assert_eq!(system.pending(), 1);
        assert_eq!(segments.pending(), 0);

        system.publish(ty, ObjectId::new(0, 0, 2), &[0, 0]).unwrap();
        assert_eq!(segments.pending(), 1);
        drop(system);
        assert_eq!(segments.pending(), 0);
    }

    #[test]
    fn test_writes_need_write_access() {
        let (mut system, mut plugin_tx, _plugin_rx) = endpoint();
        let id = ObjectId::new(0, 0, 5);
        let set = PluginMessage::Set {
            id,
            bytes: vec![0, 0],
        };
        plugin_tx.write(&set).unwrap();
        assert_eq!(system.serve().unwrap(), None);

        plugin_tx.write(&PluginMessage::Sync(Access::Write)).unwrap();
        plugin_tx.write(&set).unwrap();
        system.serve().unwrap();
        let request = system.serve().unwrap().unwrap();
        assert_eq!(request.id(), id);
        assert_eq!(request.type_id(), None);

        plugin_tx.write(&PluginMessage::Unsync).unwrap();
        system.serve().unwrap();
        assert_eq!(system.access(), None);
    }

    #[test]
    fn test_requests_apply_to_values() {
        let schema = schema();
        let point = schema.object_type("app", "Point").unwrap();
        let (mut system, mut plugin_tx, _plugin_rx) = endpoint();
        let id = ObjectId::new(point.id().scheme, 0, 1);
        let mut current = Value::Struct(vec![Value::I32(1), Value::I32(2)]);
        system.publish_value(&schema, point, id, &current).unwrap();

        plugin_tx.write(&PluginMessage::Sync(Access::Write)).unwrap();
        system.serve().unwrap();

        let bytes = encode_latest(
            &schema,
            point,
            &Value::Struct(vec![Value::I32(7), Value::I32(8)]),
        )
        .unwrap();
        plugin_tx.write(&PluginMessage::Set { id, bytes }).unwrap();
        let request = system.serve().unwrap().unwrap();
        assert_eq!(request.type_id(), Some(point.id()));
        request.apply_to(&schema, point, &mut current).unwrap();
        assert_eq!(current, Value::Struct(vec![Value::I32(7), Value::I32(8)]));

        let root = schema.object_info(point.id()).unwrap().latest();
        let bytes =
            crate::codec::encode_mutation(root, &Mutation::new(vec![1], Value::I32(-3))).unwrap();
        plugin_tx.write(&PluginMessage::Mut { id, bytes }).unwrap();
        let request = system.serve().unwrap().unwrap();
        request.apply_to(&schema, point, &mut current).unwrap();
        assert_eq!(current, Value::Struct(vec![Value::I32(7), Value::I32(-3)]));
    }

    #[test]
    fn test_set_must_carry_latest_version() {
        let schema = SchemaSet::builder()
            .scheme(SchemeDef::new("app").object(
                ObjectDef::new("Point")
                    .version(TypeNode::structure([("x", TypeNode::i32())]))
                    .version(TypeNode::structure([
                        ("x", TypeNode::i32()),
                        ("y", TypeNode::i32()),
                    ])),
            ))
            .build()
            .unwrap();
        let point = schema.object_type("app", "Point").unwrap();
        let id = ObjectId::new(point.id().scheme, 0, 1);
        let mut current = Value::Struct(vec![Value::I32(1), Value::I32(2)]);

        let v0 = Value::Struct(vec![Value::I32(9)]);
        let old = crate::codec::encode_object(&schema, point, 0, &v0).unwrap();
        let request = PluginRequest::Set {
            id,
            type_id: Some(point.id()),
            bytes: old,
        };
        assert!(matches!(
            request.apply_to(&schema, point, &mut current),
            Err(CodecError::StaleVersion { version: 0, latest: 1 })
        ));
        assert_eq!(current, Value::Struct(vec![Value::I32(1), Value::I32(2)]));

        let mut future = 7u16.to_le_bytes().to_vec();
        future.extend_from_slice(&[0; 8]);
        let request = PluginRequest::Set {
            id,
            type_id: None,
            bytes: future,
        };
        assert!(matches!(
            request.apply_to(&schema, point, &mut current),
            Err(CodecError::VersionOutOfRange { version: 7, count: 2 })
        ));
    }

    #[test]
    fn test_serve_timeout() {
        let (mut system, _plugin_tx, _plugin_rx) = endpoint();
        assert!(matches!(
            system.serve_timeout(Duration::from_millis(5)),
            Err(SyncError::Channel(crate::channel::ChannelError::Timeout))
        ));
    }
}
