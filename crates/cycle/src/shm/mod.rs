// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared memory buffers handed between the system and plugin processes.
//!
//! # Architecture
//!
//! ```text
//! +------------------+   MemHandle     +------------------+
//! |  System process  | {handle, size}  |  Plugin process  |
//! |  MemoryExporter -+---------------->+- MemoryImporter  |
//! |   (create+fill)  |                 |  (open+map)      |
//! +------------------+                 +--------+---------+
//!                                               |
//!                                           SharedMem -> ObjectIndex slot
//! ```
//!
//! A [`SharedMem`] is move-only and releases its mapping on drop, so an
//! index slot is the single owner of the bytes it views.

#[cfg(unix)]
mod futex;
mod local;
#[cfg(unix)]
mod posix;
#[cfg(unix)]
mod segment;

pub use local::LocalSegments;
#[cfg(unix)]
pub use posix::PosixSegments;
#[cfg(unix)]
pub use segment::ShmSegment;

#[cfg(unix)]
pub(crate) use futex::{wait as futex_wait, wake_all as futex_wake_all};

use std::fmt;
use std::io;

/// Errors of shared memory operations.
#[derive(Debug)]
pub enum ShmError {
    /// Segment creation failed.
    Create(io::Error),
    /// Opening an existing segment failed.
    Open(io::Error),
    /// Sizing a new segment failed.
    Truncate(io::Error),
    /// Memory mapping failed.
    Map(io::Error),
    /// Segment name rejected.
    InvalidName(String),
    /// No segment (or pooled buffer) under this name/handle.
    NotFound(String),
    /// Segment smaller than the announced size.
    SizeMismatch { expected: usize, actual: usize },
    Io(io::Error),
}

impl fmt::Display for ShmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(e) => write!(f, "shared memory segment creation failed: {}", e),
            Self::Open(e) => write!(f, "shared memory segment open failed: {}", e),
            Self::Truncate(e) => write!(f, "shared memory segment sizing failed: {}", e),
            Self::Map(e) => write!(f, "memory mapping failed: {}", e),
            Self::InvalidName(name) => write!(f, "invalid segment name: {}", name),
            Self::NotFound(name) => write!(f, "segment not found: {}", name),
            Self::SizeMismatch { expected, actual } => write!(
                f,
                "segment holds {} bytes, {} announced",
                actual, expected
            ),
            Self::Io(e) => write!(f, "shared memory I/O error: {}", e),
        }
    }
}

impl std::error::Error for ShmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Create(e) | Self::Open(e) | Self::Truncate(e) | Self::Map(e) | Self::Io(e) => {
                Some(e)
            }
            _ => None,
        }
    }
}

impl From<io::Error> for ShmError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Result type for shared memory operations.
pub type Result<T> = std::result::Result<T, ShmError>;

// ---------------------------------------------------------------------------
// MemHandle / SharedMem
// ---------------------------------------------------------------------------

/// What travels on the wire to name a buffer: OS handle plus byte size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemHandle {
    pub handle: u64,
    pub size: usize,
}

impl MemHandle {
    pub const fn new(handle: u64, size: usize) -> Self {
        Self { handle, size }
    }
}

enum Backing {
    #[cfg(unix)]
    Mapped(ShmSegment),
    Owned(Box<[u8]>),
}

/// Owned view onto an imported buffer. Released on drop.
pub struct SharedMem {
    handle: u64,
    len: usize,
    backing: Backing,
}

impl SharedMem {
    /// Buffer backed by process-local memory.
    pub fn from_bytes(handle: u64, bytes: impl Into<Box<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            handle,
            len: bytes.len(),
            backing: Backing::Owned(bytes),
        }
    }

    #[cfg(unix)]
    pub(crate) fn mapped(handle: u64, segment: ShmSegment, len: usize) -> Self {
        Self {
            handle,
            len,
            backing: Backing::Mapped(segment),
        }
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.backing {
            #[cfg(unix)]
            Backing::Mapped(segment) => segment.bytes(self.len),
            Backing::Owned(bytes) => bytes,
        }
    }

    pub fn mem_handle(&self) -> MemHandle {
        MemHandle::new(self.handle, self.len)
    }
}

impl fmt::Debug for SharedMem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.backing {
            #[cfg(unix)]
            Backing::Mapped(_) => "mapped",
            Backing::Owned(_) => "owned",
        };
        f.debug_struct("SharedMem")
            .field("handle", &format_args!("{:#x}", self.handle))
            .field("len", &self.len)
            .field("backing", &kind)
            .finish()
    }
}

impl Drop for SharedMem {
    fn drop(&mut self) {
        log::trace!("[SHM] released buffer {:#x} ({} bytes)", self.handle, self.len);
    }
}

// ---------------------------------------------------------------------------
// Importer / exporter
// ---------------------------------------------------------------------------

/// Turns a received [`MemHandle`] into an owned buffer.
pub trait MemoryImporter {
    fn import(&self, handle: MemHandle) -> Result<SharedMem>;
}

/// Publishes bytes so that a peer can import them by handle.
pub trait MemoryExporter {
    fn export(&self, bytes: &[u8]) -> Result<MemHandle>;

    /// Withdraw a buffer that will never be imported.
    fn release(&self, handle: MemHandle) -> Result<()>;
}

impl<T: MemoryImporter + ?Sized> MemoryImporter for &T {
    fn import(&self, handle: MemHandle) -> Result<SharedMem> {
        (**self).import(handle)
    }
}

impl<T: MemoryExporter + ?Sized> MemoryExporter for &T {
    fn export(&self, bytes: &[u8]) -> Result<MemHandle> {
        (**self).export(bytes)
    }

    fn release(&self, handle: MemHandle) -> Result<()> {
        (**self).release(handle)
    }
}
