// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte channel over a fixed shared-memory window.
//!
//! # Window layout
//!
//! ```text
//! 0        4        8              16             24
//! +--------+--------+--------------+--------------+---------------+
//! | state  | closed | bytes_left   | chunk len    | payload ...   |
//! +--------+--------+--------------+--------------+---------------+
//! ```
//!
//! Writer and reader take turns on `state` (EMPTY: writer's turn, FULL:
//! reader's turn), sleeping on it with futex wait/wake. A frame larger than
//! the payload area goes out in chunks; `bytes_left` counts what follows.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{check_size, ChannelError, FrameReader, FrameWriter, Result};
use crate::config::{SyncConfig, MAX_MESSAGE_SIZE, WINDOW_HEADER_SIZE};
use crate::shm::{futex_wait, futex_wake_all, ShmSegment};

const EMPTY: u32 = 0;
const FULL: u32 = 1;

const CLOSED_OFFSET: usize = 4;
const BYTES_LEFT_OFFSET: usize = 8;
const LEN_OFFSET: usize = 16;

/// Upper bound of one futex sleep, so a peer closing between our check and
/// our wait is noticed.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// One direction of a shared-memory byte channel.
///
/// Clones share the mapping and its handle counts. The window is closed
/// once every writer, or every reader, taken from this mapping is dropped.
#[derive(Debug, Clone)]
pub struct WindowChannel {
    segment: Arc<ShmSegment>,
    writers: Arc<AtomicUsize>,
    readers: Arc<AtomicUsize>,
}

impl WindowChannel {
    /// Create the window segment `name`, sized by `config`.
    pub fn create(name: &str, config: &SyncConfig) -> Result<Self> {
        let segment = ShmSegment::create(name, config.window_bytes())?;
        log::debug!("[SYNC] created window {} ({} bytes)", name, config.window_bytes());
        Ok(Self::mapped(segment))
    }

    /// Map a window created by the peer.
    pub fn open(name: &str, config: &SyncConfig) -> Result<Self> {
        let segment = ShmSegment::open(name, config.window_bytes())?;
        log::debug!("[SYNC] opened window {}", name);
        Ok(Self::mapped(segment))
    }

    fn mapped(segment: ShmSegment) -> Self {
        Self {
            segment: Arc::new(segment),
            writers: Arc::default(),
            readers: Arc::default(),
        }
    }

    /// Remove the segment name; existing mappings stay valid.
    pub fn unlink(&self) -> Result<()> {
        ShmSegment::unlink(self.segment.name())?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.segment.name()
    }

    pub fn writer(&self) -> WindowWriter {
        WindowWriter {
            window: Window::new(Arc::clone(&self.segment), Arc::clone(&self.writers)),
        }
    }

    pub fn reader(&self) -> WindowReader {
        WindowReader {
            window: Window::new(Arc::clone(&self.segment), Arc::clone(&self.readers)),
        }
    }
}

#[derive(Debug)]
struct Window {
    segment: Arc<ShmSegment>,
    capacity: usize,
    /// Live handles on this side of the window.
    handles: Arc<AtomicUsize>,
}

impl Window {
    fn new(segment: Arc<ShmSegment>, handles: Arc<AtomicUsize>) -> Self {
        handles.fetch_add(1, Ordering::AcqRel);
        let capacity = segment.size() - WINDOW_HEADER_SIZE;
        Self {
            segment,
            capacity,
            handles,
        }
    }

    fn word32(&self, offset: usize) -> &AtomicU32 {
        // SAFETY: the mapping is page aligned and at least WINDOW_HEADER_SIZE
        // bytes long; offset is 4-aligned and inside the header.
        unsafe { &*(self.segment.as_ptr().add(offset) as *const AtomicU32) }
    }

    fn word64(&self, offset: usize) -> &AtomicU64 {
        // SAFETY: as in `word32`, with an 8-aligned header offset.
        unsafe { &*(self.segment.as_ptr().add(offset) as *const AtomicU64) }
    }

    fn state(&self) -> &AtomicU32 {
        self.word32(0)
    }

    fn is_closed(&self) -> bool {
        self.word32(CLOSED_OFFSET).load(Ordering::Acquire) != 0
    }

    fn close(&self) {
        self.word32(CLOSED_OFFSET).store(1, Ordering::Release);
        futex_wake_all(self.state());
    }

    /// Block until `state == want`. A timeout applies to the whole wait.
    fn wait_turn(&self, want: u32, timeout: Option<Duration>) -> Result<()> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let current = self.state().load(Ordering::Acquire);
            if current == want {
                return Ok(());
            }
            if self.is_closed() {
                return Err(ChannelError::Disconnected);
            }
            let slice = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Err(ChannelError::Timeout);
                    }
                    left.min(POLL_SLICE)
                }
                None => POLL_SLICE,
            };
            futex_wait(self.state(), current, Some(slice));
        }
    }

    fn hand_over(&self, next: u32) {
        self.state().store(next, Ordering::Release);
        futex_wake_all(self.state());
    }

    fn payload(&self) -> *mut u8 {
        // SAFETY: WINDOW_HEADER_SIZE is inside the mapping.
        unsafe { self.segment.as_ptr().add(WINDOW_HEADER_SIZE) }
    }
}

/// Sending half of a [`WindowChannel`].
#[derive(Debug)]
pub struct WindowWriter {
    window: Window,
}

impl FrameWriter for WindowWriter {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        check_size(frame.len())?;
        let window = &self.window;
        let mut sent = 0;
        loop {
            let chunk = (frame.len() - sent).min(window.capacity);
            window.wait_turn(EMPTY, None)?;
            let bytes_left = frame.len() - sent - chunk;
            window
                .word64(BYTES_LEFT_OFFSET)
                .store(bytes_left as u64, Ordering::Relaxed);
            window.word64(LEN_OFFSET).store(chunk as u64, Ordering::Relaxed);
            // SAFETY: chunk <= capacity, so the copy stays inside the payload
            // area; the reader does not touch it until state becomes FULL.
            unsafe {
                std::ptr::copy_nonoverlapping(frame[sent..].as_ptr(), window.payload(), chunk);
            }
            window.hand_over(FULL);
            sent += chunk;
            if bytes_left == 0 {
                break;
            }
        }
        if frame.len() > window.capacity {
            log::trace!("[SYNC] sent {} byte frame in chunks of {}", frame.len(), window.capacity);
        }
        Ok(())
    }
}

/// Receiving half of a [`WindowChannel`].
#[derive(Debug)]
pub struct WindowReader {
    window: Window,
}

impl FrameReader for WindowReader {
    /// The timeout bounds the wait for the first chunk only; once a frame
    /// has started, the rest is awaited without limit.
    fn read_frame(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let window = &self.window;
        let mut frame = Vec::new();
        let mut first = true;
        loop {
            window.wait_turn(FULL, if first { timeout } else { None })?;
            let bytes_left = window.word64(BYTES_LEFT_OFFSET).load(Ordering::Relaxed) as usize;
            let len = window.word64(LEN_OFFSET).load(Ordering::Relaxed) as usize;
            if len > window.capacity || bytes_left > MAX_MESSAGE_SIZE {
                panic!(
                    "protocol violation: window chunk of {} bytes, {} left",
                    len, bytes_left
                );
            }
            if first {
                frame.reserve(len + bytes_left);
                first = false;
            }
            // SAFETY: len <= capacity; the writer leaves the payload alone
            // until state is handed back as EMPTY below.
            unsafe {
                let chunk = std::slice::from_raw_parts(window.payload(), len);
                frame.extend_from_slice(chunk);
            }
            // Copied out first: the writer may reuse the window right after.
            window.hand_over(EMPTY);
            if bytes_left == 0 {
                return Ok(frame);
            }
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if self.handles.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.close();
        }
    }
}
