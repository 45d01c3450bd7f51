// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cycle Configuration - Single Source of Truth
//!
//! Wire-format constants and channel/shared-memory defaults live here.
//! **Never hardcode them elsewhere!**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time constants (wire widths, window size)
//! - **Level 2 (Dynamic)**: `SyncConfig`, built per connection
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use cycle::config::SyncConfig;
//!
//! let config = SyncConfig::new()
//!     .handshake_timeout(Duration::from_millis(250))
//!     .segment_prefix("app_obj_");
//! assert_eq!(config.segment_prefix_str(), "app_obj_");
//! ```

use std::time::Duration;

// =======================================================================
// Wire format
// =======================================================================

/// Bytes a `usize` occupies on the wire, whatever the target's width.
pub const WIRE_USIZE_BYTES: usize = 8;

/// Bytes of the version prefix in front of every serialized object.
pub const WIRE_VERSION_BYTES: usize = 2;

/// Bytes of a serialized reference (`ObjectId::to_bits`).
pub const REFERENCE_BYTES: usize = 8;

/// Alignment of a reference in native images.
pub const REFERENCE_ALIGN: usize = 8;

/// Size of a string/list/map head in native images.
pub const NATIVE_HANDLE_SIZE: usize = std::mem::size_of::<usize>();

/// Alignment of a string/list/map head in native images.
pub const NATIVE_HANDLE_ALIGN: usize = std::mem::align_of::<usize>();

// =======================================================================
// Shared memory
// =======================================================================

/// Default name prefix of exported object segments (`/<prefix><handle:x>`).
pub const DEFAULT_SEGMENT_PREFIX: &str = "cycle_obj_";

/// Longest POSIX shared memory name accepted (NAME_MAX minus the slash).
pub const MAX_SEGMENT_NAME_LEN: usize = 254;

// =======================================================================
// Channels
// =======================================================================

/// Default size of a shared-memory message window (one page).
pub const DEFAULT_WINDOW_SIZE: usize = 4 * 1024;

/// Header in front of each window chunk: state word, pad, bytes_left, len.
pub const WINDOW_HEADER_SIZE: usize = 24;

/// Smallest usable window: header plus one payload byte.
pub const MIN_WINDOW_SIZE: usize = WINDOW_HEADER_SIZE + 1;

/// Largest encoded message accepted by any channel (16 MiB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

// =======================================================================
// SyncConfig
// =======================================================================

/// Per-connection settings of the sync protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    handshake_timeout: Option<Duration>,
    segment_prefix: String,
    window_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: None,
            segment_prefix: DEFAULT_SEGMENT_PREFIX.to_string(),
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the wait for `Synced`. Unset means block until the peer answers.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    pub fn segment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.segment_prefix = prefix.into();
        self
    }

    /// Window size for shared-memory channels, clamped to `MIN_WINDOW_SIZE`.
    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = size.max(MIN_WINDOW_SIZE);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.handshake_timeout
    }

    pub fn segment_prefix_str(&self) -> &str {
        &self.segment_prefix
    }

    pub fn window_bytes(&self) -> usize {
        self.window_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.timeout(), None);
        assert_eq!(config.segment_prefix_str(), DEFAULT_SEGMENT_PREFIX);
        assert_eq!(config.window_bytes(), DEFAULT_WINDOW_SIZE);
    }

    #[test]
    fn test_window_clamp() {
        assert_eq!(SyncConfig::new().window_size(3).window_bytes(), MIN_WINDOW_SIZE);
    }
}
