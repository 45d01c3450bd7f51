// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sync protocol over shared-memory windows, one per direction.

#![cfg(target_os = "linux")]

use std::sync::Arc;
use std::thread;

use cycle::channel::{ChannelError, WindowReader, WindowWriter};
use cycle::schema::{ObjectDef, SchemeDef, TypeNode};
use cycle::{
    Access, LocalSegments, ObjectId, SchemaSet, SyncChannel, SyncConfig, SyncError, SystemEndpoint,
    Value, WindowChannel,
};

fn window_name(direction: &str) -> String {
    format!("/cycle_it_win_{}_{}_{:x}", direction, std::process::id(), fastrand::u32(..))
}

fn schema() -> Arc<SchemaSet> {
    let set = SchemaSet::builder()
        .scheme(SchemeDef::new("doc").object(ObjectDef::single(
            "Page",
            TypeNode::structure([("lines", TypeNode::list(TypeNode::string()))]),
        )))
        .build()
        .unwrap();
    Arc::new(set)
}

fn page(lines: usize) -> Value {
    Value::Struct(vec![Value::List(
        (0..lines).map(|i| Value::from(format!("line {:04}", i))).collect(),
    )])
}

#[test]
fn test_sync_and_large_set_over_windows() {
    // a small window forces multi-chunk frames
    let config = SyncConfig::new().window_size(128);
    let down = WindowChannel::create(&window_name("down"), &config).unwrap();
    let up = WindowChannel::create(&window_name("up"), &config).unwrap();

    let schema = schema();
    let ty = schema.object_type("doc", "Page").unwrap();
    let id = ObjectId::new(ty.id().scheme, 0, 1);
    let segments = LocalSegments::new();

    let mut system: SystemEndpoint<WindowReader, WindowWriter, LocalSegments> =
        SystemEndpoint::new(up.reader(), down.writer(), segments.clone());
    system.publish_value(&schema, ty, id, &page(3)).unwrap();

    let server = {
        let schema = Arc::clone(&schema);
        thread::spawn(move || {
            let mut received = Vec::new();
            loop {
                match system.serve() {
                    Ok(Some(request)) => {
                        let mut value = page(0);
                        request.apply_to(&schema, ty, &mut value).unwrap();
                        received.push(value);
                    }
                    Ok(None) => {}
                    Err(SyncError::Channel(ChannelError::Disconnected)) => return received,
                    Err(e) => panic!("system failed: {}", e),
                }
            }
        })
    };

    let mut plugin = SyncChannel::with_config(
        Arc::clone(&schema),
        down.reader(),
        up.writer(),
        segments,
        config,
    );
    plugin.sync(Access::Write).unwrap();
    let lines = plugin
        .index()
        .get(ty, id)
        .and_then(|o| o.view())
        .and_then(|v| v.field("lines"))
        .and_then(|v| v.list())
        .map(|l| l.len());
    assert_eq!(lines, Some(3));

    let big = page(200);
    plugin.set(ty, id, &big).unwrap();
    plugin.unsync().unwrap();
    drop(plugin);

    let received = server.join().unwrap();
    assert_eq!(received, vec![big]);
    down.unlink().unwrap();
    up.unlink().unwrap();
}
