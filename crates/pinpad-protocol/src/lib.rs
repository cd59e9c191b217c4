//! Wire format of the pinpad terminal link.
//!
//! This crate is pure: it turns bytes into [`Packet`]s and [`Command`]s into
//! bytes. The link engine in `pinpad-link` owns the actual byte stream.

pub mod assembler;
pub mod command;
pub mod frame;
pub mod token;

pub use assembler::{AssemblerState, DrainPackets, FrameAssembler};
pub use command::{BeepKind, Command, Led};
pub use frame::{Inbound, Packet};
pub use token::HeartbeatToken;
