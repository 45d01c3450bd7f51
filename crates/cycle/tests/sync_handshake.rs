// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::redundant_closure_for_method_calls)] // Test code clarity
#![allow(clippy::needless_pass_by_value)] // Test functions

//! System/plugin sync over in-process channels, with the system side served
//! from its own thread.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cycle::channel::{ChannelError, LoopbackReader, LoopbackWriter};
use cycle::codec::Mutation;
use cycle::schema::{ObjectDef, SchemeDef, TypeNode};
use cycle::shm::{MemoryExporter, MemoryImporter};
use cycle::{
    Access, LocalSegments, LoopbackChannel, ObjectId, ObjectType, SchemaSet, SyncChannel,
    SyncConfig, SyncError, SyncState, SystemEndpoint, Value,
};

fn schema() -> Arc<SchemaSet> {
    let set = SchemaSet::builder()
        .scheme(SchemeDef::new("app").object(ObjectDef::single(
            "Counter",
            TypeNode::structure([
                ("n", TypeNode::u32()),
                ("tags", TypeNode::list(TypeNode::string())),
            ]),
        )))
        .build()
        .unwrap();
    Arc::new(set)
}

fn counter(n: u32, tags: &[&str]) -> Value {
    Value::Struct(vec![
        Value::U32(n),
        Value::List(tags.iter().map(|t| Value::from(*t)).collect()),
    ])
}

fn read_n<I: MemoryImporter>(plugin: &Plugin<I>, ty: ObjectType, id: ObjectId) -> Option<u32> {
    plugin
        .index()
        .get(ty, id)
        .and_then(|o| o.view())
        .and_then(|v| v.field("n"))
        .and_then(|v| v.as_u32())
}

type System<E> = SystemEndpoint<LoopbackReader, LoopbackWriter, E>;
type Plugin<I> = SyncChannel<LoopbackReader, LoopbackWriter, I>;

fn connect<E, I>(exporter: E, importer: I, config: SyncConfig) -> (System<E>, Plugin<I>)
where
    E: MemoryExporter,
    I: MemoryImporter,
{
    let (system_tx, plugin_rx) = LoopbackChannel::pair();
    let (plugin_tx, system_rx) = LoopbackChannel::pair();
    let system = SystemEndpoint::new(system_rx, system_tx, exporter);
    let plugin = SyncChannel::with_config(schema(), plugin_rx, plugin_tx, importer, config);
    (system, plugin)
}

/// Serve until the plugin hangs up, applying its writes to `objects` and
/// publishing each result back.
fn serve_forever<E: MemoryExporter + Send + 'static>(
    mut system: System<E>,
    schema: Arc<SchemaSet>,
    mut objects: HashMap<ObjectId, Value>,
) -> JoinHandle<HashMap<ObjectId, Value>> {
    thread::spawn(move || {
        let ty = schema.object_type("app", "Counter").unwrap();
        loop {
            let request = match system.serve() {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(SyncError::Channel(ChannelError::Disconnected)) => return objects,
                Err(e) => panic!("system failed: {}", e),
            };
            assert_eq!(request.type_id(), Some(ty.id()));
            let current = objects.get_mut(&request.id()).unwrap();
            request.apply_to(&schema, ty, current).unwrap();
            let updated = current.clone();
            system.publish_value(&schema, ty, request.id(), &updated).unwrap();
        }
    })
}

#[test]
fn test_set_before_sync_is_rejected() {
    let segments = LocalSegments::new();
    let (_system, mut plugin) = connect(segments.clone(), segments, SyncConfig::default());
    let ty = plugin.schema().object_type("app", "Counter").unwrap();
    let id = ObjectId::new(ty.id().scheme, 0, 1);
    let err = plugin.set(ty, id, &counter(1, &[])).unwrap_err();
    assert!(matches!(
        err,
        SyncError::InvalidSyncState {
            state: SyncState::Unsynced,
            ..
        }
    ));
    assert!(plugin.mutate(ty, id, &Mutation::new(vec![0], Value::U32(1))).is_err());
}

#[test]
fn test_sync_applies_pending_updates_and_writes_round_trip() {
    let schema = schema();
    let ty = schema.object_type("app", "Counter").unwrap();
    let segments = LocalSegments::new();
    let (mut system, mut plugin) =
        connect(segments.clone(), segments.clone(), SyncConfig::default());

    let mut objects = HashMap::new();
    for name in 0..3u32 {
        let id = ObjectId::new(ty.id().scheme, 7, name);
        let value = counter(name * 10, &["seed"]);
        system.publish_value(&schema, ty, id, &value).unwrap();
        objects.insert(id, value);
    }
    assert_eq!(system.pending(), 3);
    let server = serve_forever(system, Arc::clone(&schema), objects);

    plugin.sync(Access::Write).unwrap();
    assert_eq!(plugin.state(), SyncState::Synced(Access::Write));
    assert_eq!(plugin.index().count(ty), 3);
    assert_eq!(segments.pending(), 0);
    let first = ObjectId::new(ty.id().scheme, 7, 1);
    assert_eq!(read_n(&plugin, ty, first), Some(10));

    plugin.set(ty, first, &counter(11, &["a", "b"])).unwrap();
    plugin
        .mutate(ty, ObjectId::new(ty.id().scheme, 7, 2), &Mutation::new(vec![0], Value::U32(99)))
        .unwrap();

    // the system's republished copies arrive with the next sync
    plugin.sync(Access::Read).unwrap();
    assert_eq!(plugin.state(), SyncState::Synced(Access::Read));
    assert_eq!(read_n(&plugin, ty, first), Some(11));
    assert_eq!(read_n(&plugin, ty, ObjectId::new(ty.id().scheme, 7, 2)), Some(99));
    let tags = plugin
        .index()
        .get(ty, first)
        .and_then(|o| o.view())
        .and_then(|v| v.field("tags"))
        .and_then(|v| v.list())
        .map(|list| list.len());
    assert_eq!(tags, Some(2));

    plugin.unsync().unwrap();
    drop(plugin);
    let objects = server.join().unwrap();
    assert_eq!(objects[&first], counter(11, &["a", "b"]));
}

#[test]
fn test_forget_reaches_plugin() {
    let schema = schema();
    let ty = schema.object_type("app", "Counter").unwrap();
    let segments = LocalSegments::new();
    let (mut system, mut plugin) = connect(segments.clone(), segments, SyncConfig::default());
    let id = ObjectId::new(ty.id().scheme, 0, 5);

    system.publish_value(&schema, ty, id, &counter(5, &[])).unwrap();
    system.forget(ty.id(), id).unwrap();
    let server = serve_forever(system, Arc::clone(&schema), HashMap::new());

    plugin.sync(Access::Read).unwrap();
    assert!(!plugin.index().contains(ty.id(), id));
    drop(plugin);
    server.join().unwrap();
}

#[test]
fn test_handshake_timeout_breaks_channel() {
    let segments = LocalSegments::new();
    let config = SyncConfig::new().handshake_timeout(Duration::from_millis(30));
    // the system never serves
    let (_system, mut plugin) = connect(segments.clone(), segments, config);

    let err = plugin.sync(Access::Read).unwrap_err();
    assert!(matches!(err, SyncError::HandshakeTimeout(t) if t == Duration::from_millis(30)));
    assert_eq!(plugin.state(), SyncState::Broken);

    let ty = plugin.schema().object_type("app", "Counter").unwrap();
    let id = ObjectId::new(ty.id().scheme, 0, 1);
    assert!(matches!(
        plugin.set(ty, id, &counter(1, &[])),
        Err(SyncError::InvalidSyncState {
            state: SyncState::Broken,
            ..
        })
    ));
    assert!(plugin.sync(Access::Read).is_err());
}

#[cfg(unix)]
#[test]
fn test_sync_over_posix_segments() {
    use cycle::shm::ShmSegment;
    use cycle::PosixSegments;

    let prefix = format!("cycle_it_{:x}_", fastrand::u32(..));
    let names = PosixSegments::new(prefix.clone());
    let schema = schema();
    let ty = schema.object_type("app", "Counter").unwrap();
    let exporter = PosixSegments::new(prefix.clone());
    let importer = PosixSegments::new(prefix);
    let (mut system, mut plugin) = connect(exporter, importer, SyncConfig::default());

    let id = ObjectId::new(ty.id().scheme, 1, 1);
    let delivered = system.publish_value(&schema, ty, id, &counter(3, &["shm"])).unwrap();
    let other = ObjectId::new(ty.id().scheme, 1, 2);
    let superseded = system.publish_value(&schema, ty, other, &counter(4, &[])).unwrap();
    let latest = system.publish_value(&schema, ty, other, &counter(5, &[])).unwrap();
    assert!(!ShmSegment::exists(&names.segment_name(superseded.handle)));
    let server = serve_forever(system, Arc::clone(&schema), HashMap::new());

    plugin.sync(Access::Read).unwrap();
    assert_eq!(read_n(&plugin, ty, id), Some(3));
    assert_eq!(read_n(&plugin, ty, other), Some(5));
    // imported segments lose their names, the mappings live on in the index
    assert!(!ShmSegment::exists(&names.segment_name(delivered.handle)));
    assert!(!ShmSegment::exists(&names.segment_name(latest.handle)));
    drop(plugin);
    server.join().unwrap();
}
