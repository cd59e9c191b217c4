//! Outbound commands and their fixed-width encoding.
//!
//! Each command is the verb and its arguments right-padded with spaces,
//! followed by the `$` terminator. The width depends on the verb:
//! [`COMMAND_LEN`] bytes for `^PING`, `^BEEP` and `^LCH`, and
//! [`WIDE_COMMAND_LEN`] bytes for `^LCD` and `^LED`.
//!
//! ```text
//! ^PING Xy                             $
//! ^BEEP 2                              $
//! ^LCD Hi alice!\nUnlocking...          $
//! ^LCH *                               $
//! ^LED 3 3000                           $
//! ```

use std::fmt;
use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};
use pinpad_core::constants::{COMMAND_LEN, FRAME_END, LCD_TEXT_MAX, WIDE_COMMAND_LEN};

use crate::token::HeartbeatToken;

/// Tone pattern played by the terminal buzzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BeepKind {
    Long = 0,
    Short = 1,
    /// Short click acknowledging a key press.
    Ack = 2,
}

impl BeepKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Status LEDs on the terminal front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Led {
    /// Flashes on every key press.
    Activity = 1,
    /// Red LED.
    Error = 2,
    /// Green LED.
    Success = 3,
}

impl Led {
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// A command sent to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness probe, answered with `^PONG <token>`.
    Ping(HeartbeatToken),

    /// Play a tone.
    Beep(BeepKind),

    /// Replace the whole display content. A `\n` moves to the second line.
    LcdSet(String),

    /// Append one character at the cursor position.
    LcdPut(char),

    /// Light an LED for the given duration.
    Led { led: Led, duration_ms: u32 },
}

impl Command {
    /// Convenience constructor for [`Command::Led`].
    pub fn led(led: Led, duration_ms: u32) -> Self {
        Self::Led { led, duration_ms }
    }

    /// Bytes this command occupies on the wire, terminator included.
    pub fn wire_len(&self) -> usize {
        match self {
            Self::LcdSet(_) | Self::Led { .. } => WIDE_COMMAND_LEN,
            Self::Ping(_) | Self::Beep(_) | Self::LcdPut(_) => COMMAND_LEN,
        }
    }

    /// Encode into a fresh buffer of exactly [`Command::wire_len`] bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinpad_protocol::{Command, Led};
    ///
    /// let wire = Command::led(Led::Success, 3000).encode();
    /// assert_eq!(wire.len(), 39);
    /// assert!(wire.starts_with(b"^LED 3 3000 "));
    /// assert_eq!(wire.last(), Some(&b'$'));
    /// ```
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Append the encoded command to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        let body_len = self.wire_len() - 1;
        let mut body = String::with_capacity(body_len);

        // Writing into a String cannot fail
        let _ = match self {
            Self::Ping(token) => write!(body, "^PING {token}"),
            Self::Beep(kind) => write!(body, "^BEEP {}", kind.as_u8()),
            Self::LcdSet(text) => write!(body, "^LCD {}", lcd_text(text)),
            Self::LcdPut(c) => write!(body, "^LCH {}", if c.is_ascii() { *c } else { '?' }),
            Self::Led { led, duration_ms } => write!(body, "^LED {} {duration_ms}", led.index()),
        };

        let body = body.as_bytes();
        let len = body.len().min(body_len);

        dst.reserve(body_len + 1);
        dst.put_slice(&body[..len]);
        dst.put_bytes(b' ', body_len - len);
        dst.put_u8(FRAME_END);
    }

    /// Short verb for logs.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Ping(_) => "PING",
            Self::Beep(_) => "BEEP",
            Self::LcdSet(_) => "LCD",
            Self::LcdPut(_) => "LCH",
            Self::Led { .. } => "LED",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ping(token) => write!(f, "PING {token}"),
            Self::Beep(kind) => write!(f, "BEEP {}", kind.as_u8()),
            Self::LcdSet(text) => write!(f, "LCD {text:?}"),
            Self::LcdPut(c) => write!(f, "LCH {c:?}"),
            Self::Led { led, duration_ms } => write!(f, "LED {} {duration_ms}", led.index()),
        }
    }
}

/// Restrict display text to ASCII and cap it at [`LCD_TEXT_MAX`] bytes.
fn lcd_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .take(LCD_TEXT_MAX)
        .collect()
}
