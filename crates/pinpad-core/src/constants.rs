//! Core constants for the pinpad serial protocol and access flow.
//!
//! # Wire Format
//!
//! The terminal speaks a fixed-width ASCII protocol. Frames coming from the
//! terminal are always 9 bytes and start with `^`:
//!
//! ```text
//! ^PONG ab$     heartbeat acknowledgment (token "ab")
//! ^PAD 7  $     key press (key at offset 5)
//! ```
//!
//! Commands sent to the terminal are padded with spaces and closed by the `$`
//! terminator. `^PING`, `^BEEP` and `^LCH` are 38 bytes, the text-carrying
//! `^LCD` and `^LED` are 39:
//!
//! ```text
//! ^BEEP 1                              $
//! ^LCD PIN: *                           $
//! ```
//!
//! # Usage
//!
//! ```
//! use pinpad_core::constants::*;
//!
//! assert_eq!(FRAME_LEN, 9);
//! assert_eq!(WIDE_COMMAND_LEN, COMMAND_LEN + 1);
//! assert_eq!(PONG_PREFIX.len() + HEARTBEAT_TOKEN_LEN + 1, FRAME_LEN);
//! ```

// ============================================================================
// Framing
// ============================================================================

/// Start-of-frame sentinel. Inbound bytes before it are discarded.
pub const FRAME_START: u8 = b'^';

/// Terminator appended to every outbound command.
pub const FRAME_END: u8 = b'$';

/// Exact length of every inbound frame, sentinel included.
pub const FRAME_LEN: usize = 9;

/// Length of a `^PING`, `^BEEP` or `^LCH` command, terminator included.
pub const COMMAND_LEN: usize = 38;

/// Length of a `^LCD` or `^LED` command, terminator included.
pub const WIDE_COMMAND_LEN: usize = COMMAND_LEN + 1;

/// Maximum LCD text per `^LCD` command: two lines and the break between them.
pub const LCD_TEXT_MAX: usize = WIDE_COMMAND_LEN - b"^LCD $".len();

/// Characters per display line.
pub const LCD_COLUMNS: usize = 16;

/// Prefix of a heartbeat acknowledgment frame.
pub const PONG_PREFIX: &[u8] = b"^PONG ";

/// Prefix of a key press frame.
pub const PAD_PREFIX: &[u8] = b"^PAD ";

/// Offset of the key character inside a `^PAD ` frame.
pub const KEY_OFFSET: usize = 5;

// ============================================================================
// Heartbeat
// ============================================================================

/// Number of characters in a heartbeat token.
pub const HEARTBEAT_TOKEN_LEN: usize = 2;

/// First character of the heartbeat token alphabet.
pub const HEARTBEAT_TOKEN_FIRST: u8 = b'@';

/// Size of the heartbeat token alphabet (`'@'..='y'`).
pub const HEARTBEAT_TOKEN_ALPHABET: u8 = 58;

/// Default interval between two heartbeat probes (milliseconds).
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1000;

// ============================================================================
// Serial
// ============================================================================

/// Default serial device of the terminal.
pub const DEFAULT_SERIAL_DEVICE: &str = "/dev/ttyAMA0";

/// Default baud rate of the terminal link.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

// ============================================================================
// PIN entry
// ============================================================================

/// Required length of a valid PIN.
pub const PIN_LENGTH: usize = 6;

/// Key that terminates a PIN entry.
pub const PIN_TERMINATOR: char = '#';

/// Character drawn on the display for every typed key.
pub const MASK_CHAR: char = '*';

/// Entry that locks the door unconditionally, without a credential lookup.
pub const EMERGENCY_CLOSE_PIN: &str = "666";

/// Delay before the display falls back to the door status after a rejected PIN.
pub const DEFAULT_STATUS_RESTORE_DELAY_MS: u64 = 3000;

// ============================================================================
// Credential sync
// ============================================================================

/// Default remote credential source.
pub const DEFAULT_PIN_URL: &str = "http://infra.rzl/BenutzerDB/pins/haupttuer";

/// Default persisted credential file.
pub const DEFAULT_PIN_PATH: &str = "/perm/pins.json";

/// Default interval between two background syncs (seconds).
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Consecutive sync failures before the physical failure indicator engages.
pub const DEFAULT_SYNC_FAILURE_THRESHOLD: u32 = 3;

// ============================================================================
// Control socket
// ============================================================================

/// Default path of the local control socket.
pub const DEFAULT_CONTROL_SOCKET: &str = "/tmp/pinpad-ctrl.sock";

/// Longest command line accepted on the control socket.
pub const MAX_CONTROL_LINE: usize = 32;
