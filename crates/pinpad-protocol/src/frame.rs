//! Complete inbound frames and their classification.

use std::fmt;

use pinpad_core::constants::{
    FRAME_LEN, FRAME_START, HEARTBEAT_TOKEN_LEN, KEY_OFFSET, PAD_PREFIX, PONG_PREFIX,
};
use pinpad_core::{Error, KeyEvent, Result};

/// A complete 9-byte frame received from the terminal.
///
/// A `Packet` always starts with the `^` sentinel and is exactly
/// [`FRAME_LEN`] bytes long; the [`FrameAssembler`](crate::FrameAssembler)
/// never yields anything shorter.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Packet([u8; FRAME_LEN]);

/// Meaning of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Heartbeat acknowledgment carrying the echoed token bytes.
    ///
    /// The bytes are passed through unchecked: a corrupted echo is still an
    /// acknowledgment and is reported as a mismatch.
    Pong([u8; HEARTBEAT_TOKEN_LEN]),

    /// Key pressed on the keypad.
    Key(KeyEvent),

    /// Well-formed frame with an unknown tag or an unusable payload.
    Unknown,
}

impl Packet {
    /// Build a packet from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessageFormat`] unless `bytes` is exactly
    /// [`FRAME_LEN`] long and starts with the sentinel.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinpad_protocol::{Inbound, Packet};
    /// use pinpad_core::KeyEvent;
    ///
    /// let packet = Packet::from_bytes(b"^PAD 4  $").unwrap();
    /// assert_eq!(packet.classify(), Inbound::Key(KeyEvent::Digit(4)));
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let frame: [u8; FRAME_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidMessageFormat(format!(
                "frame must be {FRAME_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        if frame[0] != FRAME_START {
            return Err(Error::InvalidMessageFormat(
                "frame does not start with sentinel".to_string(),
            ));
        }
        Ok(Self(frame))
    }

    pub(crate) fn from_array(frame: [u8; FRAME_LEN]) -> Self {
        debug_assert_eq!(frame[0], FRAME_START);
        Self(frame)
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Classify the frame by its prefix.
    pub fn classify(&self) -> Inbound {
        if self.0.starts_with(PONG_PREFIX) {
            let start = PONG_PREFIX.len();
            let mut echoed = [0u8; HEARTBEAT_TOKEN_LEN];
            echoed.copy_from_slice(&self.0[start..start + HEARTBEAT_TOKEN_LEN]);
            return Inbound::Pong(echoed);
        }

        if self.0.starts_with(PAD_PREFIX) {
            return KeyEvent::from_byte(self.0[KEY_OFFSET])
                .map(Inbound::Key)
                .unwrap_or(Inbound::Unknown);
        }

        Inbound::Unknown
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}
