//! PIN validation for the pinpad door controller.
//!
//! [`PinEntry`] is the pure entry state machine; [`PinValidator`] wires it to
//! the terminal link, the credential store and the actuator.

pub mod messages;
pub mod state_machine;
pub mod validator;

pub use messages::DisplayMessages;
pub use state_machine::{Decision, KeyOutcome, PinEntry, Submission};
pub use validator::{PinValidator, ValidatorConfig};
