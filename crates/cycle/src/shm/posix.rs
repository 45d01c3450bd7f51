// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object buffers exported as named POSIX segments.
//!
//! Handle `h` names segment `/<prefix><h:x>`. Handles carry the exporting
//! pid in their upper half so two systems never collide on a name.

use std::sync::atomic::{AtomicU32, Ordering};

use super::segment::{validate_name, ShmSegment};
use super::{MemHandle, MemoryExporter, MemoryImporter, Result, SharedMem};
use crate::config::DEFAULT_SEGMENT_PREFIX;

/// Exporter/importer pair over `/dev/shm`.
#[derive(Debug)]
pub struct PosixSegments {
    prefix: String,
    next: AtomicU32,
    unlink_on_import: bool,
}

impl Default for PosixSegments {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENT_PREFIX)
    }
}

impl PosixSegments {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU32::new(0),
            unlink_on_import: true,
        }
    }

    /// Remove each segment's name once it has been imported (the default);
    /// the mapping stays valid until the `SharedMem` is dropped. Turn it off
    /// only when a segment must be imported more than once.
    pub fn unlink_on_import(mut self, unlink: bool) -> Self {
        self.unlink_on_import = unlink;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn segment_name(&self, handle: u64) -> String {
        format!("/{}{:x}", self.prefix, handle)
    }

    /// Remove the segment behind `handle`. Missing segments are ignored.
    pub fn unlink(&self, handle: u64) -> Result<()> {
        ShmSegment::unlink(&self.segment_name(handle))
    }

    fn next_handle(&self) -> u64 {
        let counter = self.next.fetch_add(1, Ordering::Relaxed);
        (u64::from(std::process::id()) << 32) | u64::from(counter)
    }
}

impl MemoryExporter for PosixSegments {
    fn export(&self, bytes: &[u8]) -> Result<MemHandle> {
        let handle = self.next_handle();
        let name = self.segment_name(handle);
        validate_name(&name)?;
        let mut segment = ShmSegment::create(&name, bytes.len())?;
        segment.bytes_mut(bytes.len()).copy_from_slice(bytes);
        log::debug!("[SHM] exported {} bytes as {}", bytes.len(), name);
        Ok(MemHandle::new(handle, bytes.len()))
    }

    fn release(&self, handle: MemHandle) -> Result<()> {
        log::trace!("[SHM] released unimported {}", self.segment_name(handle.handle));
        self.unlink(handle.handle)
    }
}

impl MemoryImporter for PosixSegments {
    fn import(&self, handle: MemHandle) -> Result<SharedMem> {
        let name = self.segment_name(handle.handle);
        let segment = ShmSegment::open(&name, handle.size)?;
        if self.unlink_on_import {
            ShmSegment::unlink(&name)?;
        }
        log::trace!("[SHM] imported {} ({} bytes)", name, handle.size);
        Ok(SharedMem::mapped(handle.handle, segment, handle.size))
    }
}
