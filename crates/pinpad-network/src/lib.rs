//! Local control socket for the pinpad controller.
//!
//! Lets other processes on the host open or close the door by writing
//! `open` or `close` lines to a Unix socket.

pub mod control;

pub use control::{ControlError, ControlReply, ControlSocket, ControlSocketConfig, handle_line};
