//! Error types for GPIO and actuator operations.

use std::io;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while driving GPIO lines.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// A sysfs file of a pin could not be written or read.
    #[error("GPIO {pin} {operation} failed: {source}")]
    Gpio {
        pin: u32,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// A pin reported something other than `0` or `1`.
    #[error("GPIO {pin} returned invalid value {value:?}")]
    InvalidValue { pin: u32, value: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// The actuator worker is gone and no longer accepts commands.
    #[error("Actuator unavailable")]
    ActuatorUnavailable,

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl HardwareError {
    /// Create a new GPIO error.
    pub fn gpio(pin: u32, operation: &'static str, source: io::Error) -> Self {
        Self::Gpio {
            pin,
            operation,
            source,
        }
    }

    /// Create a new invalid value error.
    pub fn invalid_value(pin: u32, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            pin,
            value: value.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }
}
