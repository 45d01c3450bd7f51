// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process buffer pool with the exporter/importer interface.
//!
//! Clones share one pool, so a system and a plugin running as threads of
//! the same process can hand buffers over exactly as they would across
//! processes. Importing takes the buffer out of the pool.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{MemHandle, MemoryExporter, MemoryImporter, Result, SharedMem, ShmError};

#[derive(Debug, Default)]
struct Pool {
    next: u64,
    buffers: HashMap<u64, Box<[u8]>>,
}

/// Shared in-memory pool of exported buffers.
#[derive(Debug, Clone, Default)]
pub struct LocalSegments {
    pool: Arc<Mutex<Pool>>,
}

impl LocalSegments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers exported but not imported yet.
    pub fn pending(&self) -> usize {
        self.pool.lock().buffers.len()
    }

    /// Drop an exported buffer nobody imported.
    pub fn discard(&self, handle: u64) -> bool {
        self.pool.lock().buffers.remove(&handle).is_some()
    }
}

impl MemoryExporter for LocalSegments {
    fn export(&self, bytes: &[u8]) -> Result<MemHandle> {
        let mut pool = self.pool.lock();
        pool.next += 1;
        let handle = pool.next;
        pool.buffers.insert(handle, bytes.into());
        Ok(MemHandle::new(handle, bytes.len()))
    }

    fn release(&self, handle: MemHandle) -> Result<()> {
        self.discard(handle.handle);
        Ok(())
    }
}

impl MemoryImporter for LocalSegments {
    fn import(&self, handle: MemHandle) -> Result<SharedMem> {
        let bytes = self
            .pool
            .lock()
            .buffers
            .remove(&handle.handle)
            .ok_or_else(|| ShmError::NotFound(format!("local buffer {:#x}", handle.handle)))?;
        if bytes.len() != handle.size {
            return Err(ShmError::SizeMismatch {
                expected: handle.size,
                actual: bytes.len(),
            });
        }
        Ok(SharedMem::from_bytes(handle.handle, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_takes_ownership() {
        let system = LocalSegments::new();
        let plugin = system.clone();

        let handle = system.export(&[1, 2, 3]).unwrap();
        assert_eq!(system.pending(), 1);
        let mem = plugin.import(handle).unwrap();
        assert_eq!(mem.as_bytes(), [1, 2, 3]);
        assert_eq!(plugin.pending(), 0);
        assert!(matches!(plugin.import(handle), Err(ShmError::NotFound(_))));
    }

    #[test]
    fn test_size_checked() {
        let pool = LocalSegments::new();
        let handle = pool.export(b"abcd").unwrap();
        assert!(matches!(
            pool.import(MemHandle::new(handle.handle, 8)),
            Err(ShmError::SizeMismatch { expected: 8, actual: 4 })
        ));
    }

    #[test]
    fn test_discard() {
        let pool = LocalSegments::new();
        let a = pool.export(b"a").unwrap();
        let b = pool.export(b"b").unwrap();
        assert_ne!(a.handle, b.handle);
        assert!(pool.discard(a.handle));
        assert!(!pool.discard(a.handle));
        assert_eq!(pool.pending(), 1);
        pool.release(b).unwrap();
        assert_eq!(pool.pending(), 0);
    }
}
