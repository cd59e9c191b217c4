//! PIN entry state machine.
//!
//! Keys accumulate in a buffer until the `#` terminator. The terminator
//! submits the buffer and always empties it, whatever the outcome.
//!
//! # Transitions
//!
//! ```text
//! Collecting(buffer) ──'#'──> Submitted(pin) ──> Decision ──> Collecting("")
//!        ^   │
//!        └───┘ any other key (appended)
//! ```
//!
//! A submission is classified in this order:
//!
//! 1. the escape value `666` requests an unconditional close
//! 2. anything but digits is a format error
//! 3. anything but exactly six digits is a length error (this includes `#`
//!    on an empty buffer)
//! 4. everything else is looked up in the credential store
//!
//! # Examples
//!
//! ```
//! use pinpad_core::KeyEvent;
//! use pinpad_keypad::{KeyOutcome, PinEntry, Submission};
//!
//! let mut entry = PinEntry::new();
//! assert_eq!(entry.press(KeyEvent::Digit(6)), KeyOutcome::Masked { first: true });
//! entry.press(KeyEvent::Digit(6));
//! entry.press(KeyEvent::Digit(6));
//! assert_eq!(entry.press(KeyEvent::Hash), KeyOutcome::Submitted(Submission::EmergencyClose));
//! assert!(entry.is_empty());
//! ```

use std::fmt;

use pinpad_core::ActuatorCommand;
use pinpad_core::KeyEvent;
use pinpad_core::constants::{EMERGENCY_CLOSE_PIN, PIN_LENGTH};
use pinpad_storage::CredentialLookup;

/// Effect of a single key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Key appended to the buffer. `first` is set for the first key.
    Masked { first: bool },

    /// Terminator pressed; the buffer was taken and cleared.
    Submitted(Submission),
}

/// A submitted buffer, classified without a credential lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    EmergencyClose,
    FormatInvalid(String),
    LengthInvalid(String),

    /// Well-formed PIN to look up.
    Candidate(String),
}

impl Submission {
    pub fn classify(pin: String) -> Self {
        if pin == EMERGENCY_CLOSE_PIN {
            Self::EmergencyClose
        } else if !pin.bytes().all(|b| b.is_ascii_digit()) {
            Self::FormatInvalid(pin)
        } else if pin.len() != PIN_LENGTH {
            Self::LengthInvalid(pin)
        } else {
            Self::Candidate(pin)
        }
    }
}

/// Authorization decision for a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Escape value entered: close without checking credentials.
    ShortCircuitClose,

    LengthInvalid { pin: String },

    FormatInvalid { pin: String },

    NotFound { pin: String },

    Authorized { handle: String },
}

impl Decision {
    /// Resolve a submission, consulting `credentials` only for candidates.
    pub fn resolve<L: CredentialLookup + ?Sized>(submission: Submission, credentials: &L) -> Self {
        match submission {
            Submission::EmergencyClose => Self::ShortCircuitClose,
            Submission::FormatInvalid(pin) => Self::FormatInvalid { pin },
            Submission::LengthInvalid(pin) => Self::LengthInvalid { pin },
            Submission::Candidate(pin) => match credentials.lookup(&pin) {
                Some(handle) => Self::Authorized { handle },
                None => Self::NotFound { pin },
            },
        }
    }

    /// Command to send to the actuator, if any.
    pub fn command(&self) -> Option<ActuatorCommand> {
        match self {
            Self::ShortCircuitClose => Some(ActuatorCommand::Close),
            Self::Authorized { .. } => Some(ActuatorCommand::Open),
            _ => None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        self.command().is_none()
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortCircuitClose => write!(f, "emergency close"),
            Self::LengthInvalid { pin } => write!(f, "PIN {pin:?} has invalid length"),
            Self::FormatInvalid { pin } => write!(f, "PIN {pin:?} is not numeric"),
            Self::NotFound { pin } => write!(f, "PIN {pin:?} not found"),
            Self::Authorized { handle } => write!(f, "authorized {handle}"),
        }
    }
}

/// Buffer of keys typed since the last terminator.
#[derive(Debug, Clone, Default)]
pub struct PinEntry {
    buffer: String,
}

impl PinEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.is_terminator() {
            let pin = std::mem::take(&mut self.buffer);
            return KeyOutcome::Submitted(Submission::classify(pin));
        }

        self.buffer.push(key.as_char());
        KeyOutcome::Masked {
            first: self.buffer.len() == 1,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    struct Fixed(HashMap<&'static str, &'static str>);

    impl CredentialLookup for Fixed {
        fn lookup(&self, pin: &str) -> Option<String> {
            self.0.get(pin).map(|h| h.to_string())
        }
    }

    fn credentials() -> Fixed {
        Fixed(HashMap::from([("123456", "secure")]))
    }

    fn submit(keys: &str) -> Submission {
        let mut entry = PinEntry::new();
        let mut outcome = None;
        for c in keys.chars() {
            outcome = Some(entry.press(KeyEvent::from_char(c).unwrap()));
        }
        match outcome {
            Some(KeyOutcome::Submitted(submission)) => submission,
            other => panic!("expected submission, got {other:?}"),
        }
    }

    #[test]
    fn test_first_key_is_flagged() {
        let mut entry = PinEntry::new();
        assert_eq!(entry.press(KeyEvent::Digit(1)), KeyOutcome::Masked { first: true });
        assert_eq!(entry.press(KeyEvent::Digit(2)), KeyOutcome::Masked { first: false });
        assert_eq!(entry.press(KeyEvent::Star), KeyOutcome::Masked { first: false });
        assert_eq!(entry.len(), 3);
    }

    #[rstest]
    #[case("666#", Submission::EmergencyClose)]
    #[case("#", Submission::LengthInvalid(String::new()))]
    #[case("1234#", Submission::LengthInvalid("1234".into()))]
    #[case("1234567#", Submission::LengthInvalid("1234567".into()))]
    #[case("12*456#", Submission::FormatInvalid("12*456".into()))]
    #[case("*#", Submission::FormatInvalid("*".into()))]
    #[case("123456#", Submission::Candidate("123456".into()))]
    fn test_classify(#[case] keys: &str, #[case] expected: Submission) {
        assert_eq!(submit(keys), expected);
    }

    #[test]
    fn test_buffer_cleared_after_every_terminator() {
        let mut entry = PinEntry::new();
        for c in "12#".chars() {
            entry.press(KeyEvent::from_char(c).unwrap());
        }
        assert!(entry.is_empty());
        assert_eq!(entry.press(KeyEvent::Digit(9)), KeyOutcome::Masked { first: true });
    }

    #[rstest]
    #[case("123456#", Decision::Authorized { handle: "secure".into() })]
    #[case("654321#", Decision::NotFound { pin: "654321".into() })]
    #[case("1234#", Decision::LengthInvalid { pin: "1234".into() })]
    #[case("666#", Decision::ShortCircuitClose)]
    fn test_resolve(#[case] keys: &str, #[case] expected: Decision) {
        assert_eq!(Decision::resolve(submit(keys), &credentials()), expected);
    }

    #[test]
    fn test_decision_commands() {
        assert_eq!(Decision::ShortCircuitClose.command(), Some(ActuatorCommand::Close));
        assert_eq!(
            Decision::Authorized { handle: "a".into() }.command(),
            Some(ActuatorCommand::Open)
        );
        assert!(Decision::NotFound { pin: "1".into() }.is_rejection());
        assert!(Decision::FormatInvalid { pin: "*".into() }.is_rejection());
    }
}
