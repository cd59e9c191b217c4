//! Shared domain types and constants for the pinpad door controller.
//!
//! Every other crate in the workspace depends on this one. It carries no I/O:
//! only the vocabulary passed between the link engine, the actuator, the
//! credential store and the PIN validator.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
