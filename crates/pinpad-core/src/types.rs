use crate::{Result, constants::PIN_TERMINATOR, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single key pressed on the terminal keypad.
///
/// The keypad only has the twelve keys of a telephone layout: `0`-`9`, `*`
/// and `#`. Anything else arriving on the wire is rejected by
/// [`KeyEvent::from_char`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    /// Numeric digit (0-9).
    Digit(u8),

    /// Star key (*).
    Star,

    /// Hash/pound key (#), terminates a PIN entry.
    Hash,
}

impl KeyEvent {
    /// Parse a key from its wire character.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for characters outside `0-9`, `*`, `#`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinpad_core::KeyEvent;
    ///
    /// assert_eq!(KeyEvent::from_char('7').unwrap(), KeyEvent::Digit(7));
    /// assert_eq!(KeyEvent::from_char('#').unwrap(), KeyEvent::Hash);
    /// assert!(KeyEvent::from_char('A').is_err());
    /// ```
    pub fn from_char(c: char) -> Result<Self> {
        match c {
            '0'..='9' => Ok(Self::Digit(c as u8 - b'0')),
            '*' => Ok(Self::Star),
            '#' => Ok(Self::Hash),
            other => Err(Error::InvalidKey(other)),
        }
    }

    /// Parse a key from a raw wire byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Self::from_char(byte as char)
    }

    /// The character this key produces on the wire.
    pub fn as_char(&self) -> char {
        match self {
            Self::Digit(d) => (b'0' + d) as char,
            Self::Star => '*',
            Self::Hash => '#',
        }
    }

    /// Check if this key terminates a PIN entry.
    pub fn is_terminator(&self) -> bool {
        self.as_char() == PIN_TERMINATOR
    }

    /// Check if this key is a digit.
    pub fn is_digit(&self) -> bool {
        matches!(self, Self::Digit(_))
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Intent delivered to the lock actuator.
///
/// This is the only vocabulary shared by every producer of lock commands
/// (PIN validator, control socket) and the single actuator entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorCommand {
    /// Unlock the door.
    Open,

    /// Lock the door.
    Close,
}

impl ActuatorCommand {
    /// Lowercase name used on the control socket and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for ActuatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActuatorCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

/// Physical door position reported by the door contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    /// Door leaf is open.
    Open,

    /// Door leaf is shut.
    #[default]
    Closed,
}

impl DoorState {
    /// Build from the boolean reported by the door contact.
    pub fn from_open(open: bool) -> Self {
        if open { Self::Open } else { Self::Closed }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Phase of a motor sequence inside the actuator controller.
///
/// # Valid Transitions
///
/// - Idle → Driving → Coupling → AwaitingSensor → Decoupling → Idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorPhase {
    /// No motor is energized.
    #[default]
    Idle,

    /// Drive motor spinning, not yet coupled to the cylinder.
    Driving,

    /// Coupling motor pulse connecting drive motor and cylinder.
    Coupling,

    /// Cylinder turning, waiting for the completion sensor.
    AwaitingSensor,

    /// Decoupling motor pulse releasing the cylinder.
    Decoupling,
}

impl fmt::Display for ActuatorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::Idle => "Idle",
            Self::Driving => "Driving",
            Self::Coupling => "Coupling",
            Self::AwaitingSensor => "AwaitingSensor",
            Self::Decoupling => "Decoupling",
        };
        write!(f, "{}", phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case('0', KeyEvent::Digit(0))]
    #[case('5', KeyEvent::Digit(5))]
    #[case('9', KeyEvent::Digit(9))]
    #[case('*', KeyEvent::Star)]
    #[case('#', KeyEvent::Hash)]
    fn test_key_from_char(#[case] c: char, #[case] expected: KeyEvent) {
        let key = KeyEvent::from_char(c).unwrap();
        assert_eq!(key, expected);
        assert_eq!(key.as_char(), c);
    }

    #[rstest]
    #[case('A')]
    #[case(' ')]
    #[case('$')]
    #[case('\0')]
    fn test_key_rejects_unknown_characters(#[case] c: char) {
        assert_eq!(KeyEvent::from_char(c), Err(Error::InvalidKey(c)));
    }

    #[test]
    fn test_only_hash_terminates() {
        assert!(KeyEvent::Hash.is_terminator());
        assert!(!KeyEvent::Star.is_terminator());
        assert!(!KeyEvent::Digit(3).is_terminator());
    }

    #[test]
    fn test_actuator_command_parsing() {
        assert_eq!("open".parse::<ActuatorCommand>().unwrap(), ActuatorCommand::Open);
        assert_eq!("close".parse::<ActuatorCommand>().unwrap(), ActuatorCommand::Close);
        assert!("OPEN".parse::<ActuatorCommand>().is_err());
        assert!("unlock".parse::<ActuatorCommand>().is_err());
    }

    #[test]
    fn test_actuator_command_display_roundtrips() {
        for command in [ActuatorCommand::Open, ActuatorCommand::Close] {
            assert_eq!(command.to_string().parse::<ActuatorCommand>().unwrap(), command);
        }
    }

    #[test]
    fn test_door_state_from_contact() {
        assert_eq!(DoorState::from_open(true), DoorState::Open);
        assert_eq!(DoorState::from_open(false), DoorState::Closed);
        assert!(DoorState::Open.is_open());
        assert_eq!(DoorState::default(), DoorState::Closed);
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&ActuatorPhase::AwaitingSensor).unwrap();
        assert_eq!(json, "\"awaiting_sensor\"");
        assert_eq!(ActuatorPhase::default(), ActuatorPhase::Idle);
    }
}
