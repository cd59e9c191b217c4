//! Link engine for the pinpad terminal.
//!
//! The terminal is attached over a serial line. This crate owns that line:
//! a blocking reader thread feeds bytes to a single engine loop that
//! assembles frames, answers the heartbeat bookkeeping and publishes key
//! presses, while a writer thread drains outbound [`Command`]s.
//!
//! ```text
//!  serial rx ──> reader thread ──┐
//!                                ├──> engine loop ──> KeyEvents
//!        heartbeat ticker ───────┘         │
//!                                          └──> LinkSender ──> writer thread ──> serial tx
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use pinpad_link::{LinkConfig, SerialConfig, open};
//!
//! # async fn example() -> Result<(), pinpad_link::LinkError> {
//! let mut link = open(&SerialConfig::default(), LinkConfig::default())?;
//! let mut keys = link.take_key_events().expect("first call");
//!
//! link.sender().lcd_set("PIN: ");
//! while let Some(key) = keys.next().await {
//!     println!("pressed {key}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Command`]: pinpad_protocol::Command

pub mod engine;
pub mod error;
pub mod events;
pub mod mock;
pub mod sender;
pub mod serial;

pub use engine::{LinkConfig, LinkHandle, LinkStats, spawn};
pub use error::{LinkError, Result};
pub use events::KeyEvents;
pub use sender::LinkSender;
pub use serial::{SerialConfig, open};
