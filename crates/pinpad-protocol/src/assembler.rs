//! Frame assembler for the terminal byte stream.
//!
//! The serial line delivers bytes one at a time, possibly starting in the
//! middle of a frame and possibly with NUL bytes while the terminal boots.
//! [`FrameAssembler`] turns that stream into complete [`Packet`]s.
//!
//! # Framing
//!
//! Every inbound frame is exactly 9 bytes and starts with `^`:
//!
//! ```text
//! ^  P  A  D  ␠  7  ␠  ␠  $
//! 0  1  2  3  4  5  6  7  8
//! ```
//!
//! There is no length field and no end marker check. A frame is complete
//! when 9 bytes have been collected after the sentinel.
//!
//! # Usage
//!
//! ```
//! use pinpad_protocol::{FrameAssembler, Inbound};
//! use pinpad_core::KeyEvent;
//!
//! let mut assembler = FrameAssembler::new();
//!
//! // Garbage before the sentinel is dropped
//! assembler.feed(b"xx^PAD ");
//! assert!(assembler.next_packet().is_none());
//!
//! assembler.feed(b"3  $");
//! let packet = assembler.next_packet().unwrap();
//! assert_eq!(packet.classify(), Inbound::Key(KeyEvent::Digit(3)));
//! ```

use std::collections::VecDeque;

use pinpad_core::constants::{FRAME_LEN, FRAME_START};

use crate::frame::Packet;

/// Recommended initial capacity for the packet queue.
const INITIAL_PACKET_QUEUE_CAPACITY: usize = 4;

/// State machine states for frame assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Waiting for the `^` sentinel.
    ///
    /// Any other byte is discarded in this state.
    WaitingStart,

    /// Collecting the remaining bytes of a frame.
    Accumulating,
}

/// Stateful assembler for 9-byte terminal frames.
///
/// # State Machine
///
/// ```text
/// ┌─────────────┐  '^' byte    ┌──────────────┐  9th byte   ┌─────────────┐
/// │WaitingStart │─────────────>│ Accumulating │────────────>│Packet ready │
/// └─────────────┘              └──────────────┘             └─────────────┘
///       ^  │                                                       │
///       │  │ other bytes (discarded)                               │
///       │  └───────────────────┘                                   │
///       └──────────────────────────────────────────────────────────┘
/// ```
///
/// NUL bytes are skipped in both states without touching the frame in
/// progress.
#[derive(Debug)]
pub struct FrameAssembler {
    /// Bytes of the frame in progress.
    buffer: [u8; FRAME_LEN],

    /// Number of valid bytes in `buffer`.
    len: usize,

    /// Complete packets not yet taken by [`FrameAssembler::next_packet`].
    packets: VecDeque<Packet>,

    /// Bytes dropped while waiting for a sentinel.
    discarded: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: [0; FRAME_LEN],
            len: 0,
            packets: VecDeque::with_capacity(INITIAL_PACKET_QUEUE_CAPACITY),
            discarded: 0,
        }
    }

    /// Push a single byte and return the packet it completes, if any.
    ///
    /// This is the path used by the link engine, which reads the serial line
    /// one byte at a time. Packets returned here are not queued.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinpad_protocol::FrameAssembler;
    ///
    /// let mut assembler = FrameAssembler::new();
    /// let completed: Vec<_> = b"^PONG ab$".iter().filter_map(|b| assembler.push(*b)).collect();
    /// assert_eq!(completed.len(), 1);
    /// ```
    pub fn push(&mut self, byte: u8) -> Option<Packet> {
        // Transport artifact while the terminal initializes
        if byte == 0 {
            return None;
        }

        if self.len == 0 && byte != FRAME_START {
            self.discarded += 1;
            return None;
        }

        self.buffer[self.len] = byte;
        self.len += 1;

        if self.len < FRAME_LEN {
            return None;
        }

        let packet = Packet::from_array(self.buffer);
        self.len = 0;
        Some(packet)
    }

    /// Feed a chunk of bytes, queueing every packet it completes.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if let Some(packet) = self.push(byte) {
                self.packets.push_back(packet);
            }
        }
    }

    /// Take the oldest queued packet.
    pub fn next_packet(&mut self) -> Option<Packet> {
        self.packets.pop_front()
    }

    /// Returns number of packets ready for extraction.
    pub fn packets_available(&self) -> usize {
        self.packets.len()
    }

    /// Returns an iterator that drains all queued packets.
    pub fn drain_packets(&mut self) -> DrainPackets<'_> {
        DrainPackets { assembler: self }
    }

    /// Returns current assembler state.
    pub fn state(&self) -> AssemblerState {
        if self.len == 0 {
            AssemblerState::WaitingStart
        } else {
            AssemblerState::Accumulating
        }
    }

    /// Number of bytes dropped because no frame was in progress.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Drop the frame in progress and all queued packets.
    pub fn clear(&mut self) {
        self.len = 0;
        self.packets.clear();
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over queued packets, see [`FrameAssembler::drain_packets`].
pub struct DrainPackets<'a> {
    assembler: &'a mut FrameAssembler,
}

impl Iterator for DrainPackets<'_> {
    type Item = Packet;

    fn next(&mut self) -> Option<Self::Item> {
        self.assembler.next_packet()
    }
}
