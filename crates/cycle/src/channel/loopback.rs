// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process byte channel over crossbeam channels.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use super::{ChannelError, FrameReader, FrameWriter, Result};

/// Constructor of one-directional in-process channels.
pub struct LoopbackChannel;

impl LoopbackChannel {
    /// A connected writer/reader pair, unbounded.
    pub fn pair() -> (LoopbackWriter, LoopbackReader) {
        let (tx, rx) = channel::unbounded();
        (LoopbackWriter { tx }, LoopbackReader { rx })
    }
}

#[derive(Debug, Clone)]
pub struct LoopbackWriter {
    tx: Sender<Vec<u8>>,
}

#[derive(Debug)]
pub struct LoopbackReader {
    rx: Receiver<Vec<u8>>,
}

impl LoopbackReader {
    /// Frames queued and not read yet.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl FrameWriter for LoopbackWriter {
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.tx
            .send(frame.to_vec())
            .map_err(|_| ChannelError::Disconnected)
    }
}

impl FrameReader for LoopbackReader {
    fn read_frame(&mut self, timeout: Option<Duration>) -> Result<Vec<u8>> {
        match timeout {
            None => self.rx.recv().map_err(|_| ChannelError::Disconnected),
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => ChannelError::Timeout,
                RecvTimeoutError::Disconnected => ChannelError::Disconnected,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MessageReader, MessageWriter, PluginMessage};

    #[test]
    fn test_frames_in_order() {
        let (mut tx, mut rx) = LoopbackChannel::pair();
        tx.write_frame(b"one").unwrap();
        tx.write_frame(b"two").unwrap();
        assert_eq!(rx.pending(), 2);
        assert_eq!(rx.read_frame(None).unwrap(), b"one");
        assert_eq!(rx.read_frame(None).unwrap(), b"two");
    }

    #[test]
    fn test_timeout_and_disconnect() {
        let (tx, mut rx) = LoopbackChannel::pair();
        assert!(matches!(
            rx.read_frame(Some(Duration::from_millis(5))),
            Err(ChannelError::Timeout)
        ));
        drop(tx);
        assert!(matches!(rx.read_frame(None), Err(ChannelError::Disconnected)));
    }

    #[test]
    fn test_typed_messages() {
        let (mut tx, mut rx) = LoopbackChannel::pair();
        tx.write(&PluginMessage::Unsync).unwrap();
        let message: PluginMessage = rx.read().unwrap();
        assert_eq!(message, PluginMessage::Unsync);
    }
}
