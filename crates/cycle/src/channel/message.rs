// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protocol messages and their frame encoding.
//!
//! ```text
//! frame := u8 kind, fields...
//!   object id := u32 scheme, u32 source, u32 name
//!   type id   := u32 scheme, u32 name
//!   mem       := u64 handle, usize size
//!   bytes     := usize len, raw bytes
//! ```
//!
//! An unknown kind byte or a truncated frame means the peers disagree on
//! the protocol; decoding panics.

use std::fmt;

use cycle_schema::{ObjectId, TypeId};

use crate::codec::{Cursor, WireError, WireWriter};
use crate::shm::MemHandle;

/// Access requested by a plugin when it syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

/// System -> plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemMessage {
    IndexObject {
        id: ObjectId,
        type_id: TypeId,
        mem: MemHandle,
    },
    ForgetObject {
        type_id: TypeId,
        id: ObjectId,
    },
    Synced,
}

/// Plugin -> system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginMessage {
    Sync(Access),
    Unsync,
    /// Full object: version prefix plus body.
    Set { id: ObjectId, bytes: Vec<u8> },
    /// Encoded `Mutation` against the object's latest version.
    Mut { id: ObjectId, bytes: Vec<u8> },
}

/// A message with a frame encoding.
pub trait WireMessage: Sized {
    fn encode(&self) -> Vec<u8>;

    /// Panics on a frame this side cannot understand.
    fn decode(frame: &[u8]) -> Self;
}

const INDEX_OBJECT: u8 = 1;
const FORGET_OBJECT: u8 = 2;
const SYNCED: u8 = 3;

const SYNC: u8 = 1;
const UNSYNC: u8 = 2;
const SET: u8 = 3;
const MUT: u8 = 4;

const ACCESS_READ: u8 = 0;
const ACCESS_WRITE: u8 = 1;

#[track_caller]
fn violation(what: impl fmt::Display) -> ! {
    panic!("protocol violation: {}", what)
}

trait OrViolation<T> {
    fn or_violation(self) -> T;
}

impl<T> OrViolation<T> for Result<T, WireError> {
    #[track_caller]
    fn or_violation(self) -> T {
        self.unwrap_or_else(|e| violation(e))
    }
}

fn write_object_id(out: &mut WireWriter, id: ObjectId) {
    out.write_u32(id.scheme);
    out.write_u32(id.source);
    out.write_u32(id.name);
}

fn read_object_id(cursor: &mut Cursor<'_>) -> ObjectId {
    let scheme = cursor.read_u32().or_violation();
    let source = cursor.read_u32().or_violation();
    let name = cursor.read_u32().or_violation();
    ObjectId::new(scheme, source, name)
}

fn write_type_id(out: &mut WireWriter, id: TypeId) {
    out.write_u32(id.scheme);
    out.write_u32(id.name);
}

fn read_type_id(cursor: &mut Cursor<'_>) -> TypeId {
    let scheme = cursor.read_u32().or_violation();
    let name = cursor.read_u32().or_violation();
    TypeId::new(scheme, name)
}

fn finish(kind: &str, cursor: &Cursor<'_>) {
    if !cursor.is_eof() {
        violation(format_args!("{} bytes trailing a {} frame", cursor.remaining(), kind));
    }
}

impl WireMessage for SystemMessage {
    fn encode(&self) -> Vec<u8> {
        let mut out = WireWriter::with_capacity(32);
        match self {
            SystemMessage::IndexObject { id, type_id, mem } => {
                out.write_u8(INDEX_OBJECT);
                write_object_id(&mut out, *id);
                write_type_id(&mut out, *type_id);
                out.write_u64(mem.handle);
                out.write_usize(mem.size);
            }
            SystemMessage::ForgetObject { type_id, id } => {
                out.write_u8(FORGET_OBJECT);
                write_type_id(&mut out, *type_id);
                write_object_id(&mut out, *id);
            }
            SystemMessage::Synced => out.write_u8(SYNCED),
        }
        out.into_inner()
    }

    fn decode(frame: &[u8]) -> Self {
        let mut cursor = Cursor::new(frame);
        let message = match cursor.read_u8().or_violation() {
            INDEX_OBJECT => {
                let id = read_object_id(&mut cursor);
                let type_id = read_type_id(&mut cursor);
                let handle = cursor.read_u64().or_violation();
                let size = cursor.read_usize().or_violation();
                SystemMessage::IndexObject {
                    id,
                    type_id,
                    mem: MemHandle::new(handle, size),
                }
            }
            FORGET_OBJECT => {
                let type_id = read_type_id(&mut cursor);
                let id = read_object_id(&mut cursor);
                SystemMessage::ForgetObject { type_id, id }
            }
            SYNCED => SystemMessage::Synced,
            kind => violation(format_args!("unknown system message kind {}", kind)),
        };
        finish("system", &cursor);
        message
    }
}

impl WireMessage for PluginMessage {
    fn encode(&self) -> Vec<u8> {
        let mut out = WireWriter::with_capacity(32);
        match self {
            PluginMessage::Sync(access) => {
                out.write_u8(SYNC);
                out.write_u8(match access {
                    Access::Read => ACCESS_READ,
                    Access::Write => ACCESS_WRITE,
                });
            }
            PluginMessage::Unsync => out.write_u8(UNSYNC),
            PluginMessage::Set { id, bytes } => {
                out.write_u8(SET);
                write_object_id(&mut out, *id);
                out.write_blob(bytes);
            }
            PluginMessage::Mut { id, bytes } => {
                out.write_u8(MUT);
                write_object_id(&mut out, *id);
                out.write_blob(bytes);
            }
        }
        out.into_inner()
    }

    fn decode(frame: &[u8]) -> Self {
        let mut cursor = Cursor::new(frame);
        let message = match cursor.read_u8().or_violation() {
            SYNC => match cursor.read_u8().or_violation() {
                ACCESS_READ => PluginMessage::Sync(Access::Read),
                ACCESS_WRITE => PluginMessage::Sync(Access::Write),
                other => violation(format_args!("unknown access {}", other)),
            },
            UNSYNC => PluginMessage::Unsync,
            SET => {
                let id = read_object_id(&mut cursor);
                let bytes = cursor.read_blob().or_violation().to_vec();
                PluginMessage::Set { id, bytes }
            }
            MUT => {
                let id = read_object_id(&mut cursor);
                let bytes = cursor.read_blob().or_violation().to_vec();
                PluginMessage::Mut { id, bytes }
            }
            kind => violation(format_args!("unknown plugin message kind {}", kind)),
        };
        finish("plugin", &cursor);
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_messages() {
        let messages = [
            SystemMessage::IndexObject {
                id: ObjectId::new(1, 2, 3),
                type_id: TypeId::new(1, 4),
                mem: MemHandle::new(0xdead_beef, 77),
            },
            SystemMessage::ForgetObject {
                type_id: TypeId::new(0, 0),
                id: ObjectId::new(0, 9, 9),
            },
            SystemMessage::Synced,
        ];
        for message in messages {
            assert_eq!(SystemMessage::decode(&message.encode()), message);
        }
        assert_eq!(SystemMessage::Synced.encode(), [SYNCED]);
    }

    #[test]
    fn test_plugin_frame_layout() {
        let frame = PluginMessage::Set {
            id: ObjectId::new(1, 0, 2),
            bytes: vec![0xAA, 0xBB],
        }
        .encode();
        assert_eq!(frame[0], SET);
        assert_eq!(&frame[1..13], &[1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(&frame[13..21], &2u64.to_le_bytes());
        assert_eq!(&frame[21..], &[0xAA, 0xBB]);

        for message in [
            PluginMessage::Sync(Access::Read),
            PluginMessage::Sync(Access::Write),
            PluginMessage::Unsync,
            PluginMessage::Mut {
                id: ObjectId::new(5, 6, 7),
                bytes: vec![],
            },
        ] {
            assert_eq!(PluginMessage::decode(&message.encode()), message);
        }
    }

    #[test]
    #[should_panic(expected = "protocol violation")]
    fn test_unknown_kind_is_fatal() {
        PluginMessage::decode(&[0x7F]);
    }

    #[test]
    #[should_panic(expected = "protocol violation")]
    fn test_truncated_frame_is_fatal() {
        SystemMessage::decode(&[INDEX_OBJECT, 1, 0]);
    }
}
