// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Channel Sync Protocol between a system and a plugin process.
//!
//! # Architecture
//!
//! ```text
//! +-------------------+  SystemMessage   +-------------------+
//! |  SystemEndpoint   +----------------->+   SyncChannel     |
//! |  publish/forget   |  IndexObject     |   ObjectIndex     |
//! |  serve()          |  ForgetObject    |   sync/unsync     |
//! |                   |  Synced          |   set/mutate      |
//! |                   +<-----------------+                   |
//! +-------------------+  PluginMessage   +-------------------+
//!                        Sync/Unsync/Set/Mut
//! ```
//!
//! Messages travel as frames over a byte channel: [`LoopbackChannel`] in
//! process, or a shared-memory [`WindowChannel`] between processes.

mod loopback;
mod message;
mod sync;
mod system;
#[cfg(unix)]
mod window;

pub use loopback::{LoopbackChannel, LoopbackReader, LoopbackWriter};
pub use message::{Access, PluginMessage, SystemMessage, WireMessage};
pub use sync::{SyncChannel, SyncState};
pub use system::{PluginRequest, SystemEndpoint};
#[cfg(unix)]
pub use window::{WindowChannel, WindowReader, WindowWriter};

use std::fmt;
use std::io;
use std::time::Duration;

use crate::codec::CodecError;
use crate::index::IndexError;
use crate::shm::ShmError;

/// Errors of the byte channels.
#[derive(Debug)]
pub enum ChannelError {
    /// The peer went away.
    Disconnected,
    /// Encoded message above `MAX_MESSAGE_SIZE`.
    PayloadTooLarge { size: usize, limit: usize },
    /// No message within the requested time.
    Timeout,
    Io(io::Error),
    /// Setting up a shared-memory window failed.
    Shm(ShmError),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Disconnected => write!(f, "channel disconnected"),
            ChannelError::PayloadTooLarge { size, limit } => {
                write!(f, "message of {} bytes exceeds limit {}", size, limit)
            }
            ChannelError::Timeout => write!(f, "channel read timed out"),
            ChannelError::Io(e) => write!(f, "channel I/O error: {}", e),
            ChannelError::Shm(e) => write!(f, "channel window error: {}", e),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChannelError::Io(e) => Some(e),
            ChannelError::Shm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ChannelError {
    fn from(e: io::Error) -> Self {
        ChannelError::Io(e)
    }
}

impl From<ShmError> for ChannelError {
    fn from(e: ShmError) -> Self {
        ChannelError::Shm(e)
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors of the sync protocol.
#[derive(Debug)]
pub enum SyncError {
    /// Operation not allowed in the current state (or the channel broke).
    InvalidSyncState { state: SyncState, operation: &'static str },
    /// No `Synced` within the configured handshake timeout.
    HandshakeTimeout(Duration),
    Channel(ChannelError),
    Shm(ShmError),
    Index(IndexError),
    Codec(CodecError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::InvalidSyncState { state, operation } => {
                write!(f, "cannot {} while {:?}", operation, state)
            }
            SyncError::HandshakeTimeout(t) => write!(f, "no Synced within {:?}", t),
            SyncError::Channel(e) => write!(f, "{}", e),
            SyncError::Shm(e) => write!(f, "{}", e),
            SyncError::Index(e) => write!(f, "{}", e),
            SyncError::Codec(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Channel(e) => Some(e),
            SyncError::Shm(e) => Some(e),
            SyncError::Index(e) => Some(e),
            SyncError::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ChannelError> for SyncError {
    fn from(e: ChannelError) -> Self {
        SyncError::Channel(e)
    }
}

impl From<ShmError> for SyncError {
    fn from(e: ShmError) -> Self {
        SyncError::Shm(e)
    }
}

impl From<IndexError> for SyncError {
    fn from(e: IndexError) -> Self {
        SyncError::Index(e)
    }
}

impl From<CodecError> for SyncError {
    fn from(e: CodecError) -> Self {
        SyncError::Codec(e)
    }
}

impl From<cycle_schema::SchemaError> for SyncError {
    fn from(e: cycle_schema::SchemaError) -> Self {
        SyncError::Codec(CodecError::Schema(e))
    }
}

// ---------------------------------------------------------------------------
// Frame and message traits
// ---------------------------------------------------------------------------

/// Receiving half of a byte channel: whole frames, in order.
pub trait FrameReader {
    /// Next frame; `None` for `timeout` means wait indefinitely.
    fn read_frame(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>>;
}

/// Sending half of a byte channel.
pub trait FrameWriter {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()>;
}

/// Blocking reader of typed messages.
pub trait MessageReader<M> {
    fn read(&mut self) -> Result<M>;

    /// Like `read`, failing with [`ChannelError::Timeout`] after `timeout`.
    fn read_timeout(&mut self, timeout: Duration) -> Result<M>;
}

/// Writer of typed messages.
pub trait MessageWriter<M> {
    fn write(&mut self, message: &M) -> Result<()>;
}

impl<M: WireMessage, R: FrameReader> MessageReader<M> for R {
    fn read(&mut self) -> Result<M> {
        let frame = self.read_frame(None)?;
        Ok(M::decode(&frame))
    }

    fn read_timeout(&mut self, timeout: Duration) -> Result<M> {
        let frame = self.read_frame(Some(timeout))?;
        Ok(M::decode(&frame))
    }
}

impl<M: WireMessage, W: FrameWriter> MessageWriter<M> for W {
    fn write(&mut self, message: &M) -> Result<()> {
        let frame = message.encode();
        check_size(frame.len())?;
        self.write_frame(&frame)
    }
}

pub(crate) fn check_size(size: usize) -> Result<()> {
    let limit = crate::config::MAX_MESSAGE_SIZE;
    if size > limit {
        return Err(ChannelError::PayloadTooLarge { size, limit });
    }
    Ok(())
}
