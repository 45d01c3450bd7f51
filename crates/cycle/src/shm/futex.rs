// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Futex wait/wake on a state word living in shared memory.
//!
//! Uses the shared `FUTEX_WAIT`/`FUTEX_WAKE` operations: the `_PRIVATE`
//! variants never wake a waiter in another process.

use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Outcome of a [`wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Woken, spuriously or not; re-check the word.
    Woken,
    /// The word no longer held the expected value.
    Changed,
    TimedOut,
}

#[cfg(target_os = "linux")]
const FUTEX_WAIT: i32 = 0;
#[cfg(target_os = "linux")]
const FUTEX_WAKE: i32 = 1;

/// Sleep while `word` holds `expected`, up to `timeout`.
#[cfg(target_os = "linux")]
pub fn wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> Wake {
    let ts = timeout.map(|d| libc::timespec {
        tv_sec: d.as_secs() as libc::time_t,
        tv_nsec: d.subsec_nanos() as libc::c_long,
    });
    let ts_ptr = ts
        .as_ref()
        .map_or(std::ptr::null(), |t| t as *const libc::timespec);

    // SAFETY: word is a live reference for the whole call; the remaining
    // arguments are unused by FUTEX_WAIT.
    let ret = unsafe {
        libc::syscall(
            libc::SYS_futex,
            word as *const AtomicU32 as *const u32,
            FUTEX_WAIT,
            expected,
            ts_ptr,
            std::ptr::null::<u32>(),
            0i32,
        )
    };
    if ret == 0 {
        return Wake::Woken;
    }
    match std::io::Error::last_os_error().raw_os_error() {
        Some(libc::ETIMEDOUT) => Wake::TimedOut,
        Some(libc::EAGAIN) => Wake::Changed,
        _ => Wake::Woken,
    }
}

/// Wake every waiter on `word`.
#[cfg(target_os = "linux")]
pub fn wake_all(word: &AtomicU32) {
    // SAFETY: word is a live reference; FUTEX_WAKE only reads its address.
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word as *const AtomicU32 as *const u32,
            FUTEX_WAKE,
            i32::MAX,
            std::ptr::null::<libc::timespec>(),
            std::ptr::null::<u32>(),
            0i32,
        );
    }
}

// Elsewhere: short sleeps, callers re-check the word in a loop.
#[cfg(not(target_os = "linux"))]
pub fn wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> Wake {
    use std::sync::atomic::Ordering;
    if word.load(Ordering::Acquire) != expected {
        return Wake::Changed;
    }
    let nap = Duration::from_micros(200);
    match timeout {
        Some(t) if t <= nap => {
            std::thread::sleep(t);
            Wake::TimedOut
        }
        _ => {
            std::thread::sleep(nap);
            Wake::Woken
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn wake_all(_word: &AtomicU32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_changed_word_returns_immediately() {
        let word = AtomicU32::new(7);
        assert_eq!(wait(&word, 0, Some(Duration::from_secs(1))), Wake::Changed);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_timeout() {
        let word = AtomicU32::new(0);
        let start = Instant::now();
        assert_eq!(wait(&word, 0, Some(Duration::from_millis(30))), Wake::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_wake_other_thread() {
        let word = Arc::new(AtomicU32::new(0));
        let waiter = {
            let word = Arc::clone(&word);
            thread::spawn(move || {
                while word.load(Ordering::Acquire) == 0 {
                    wait(&word, 0, Some(Duration::from_secs(1)));
                }
                word.load(Ordering::Acquire)
            })
        };
        thread::sleep(Duration::from_millis(10));
        word.store(3, Ordering::Release);
        wake_all(&word);
        assert_eq!(waiter.join().unwrap(), 3);
    }
}
