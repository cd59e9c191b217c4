//! Error types for the terminal link.

use std::io;

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors that stop the link engine.
///
/// Write failures are not in this list: a lost display update is logged and
/// the link keeps running.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The serial device could not be opened or configured.
    #[error("Failed to open serial device {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },

    /// Reading from the transport failed or hit end of stream.
    #[error("Serial transport failed: {0}")]
    Transport(#[from] io::Error),

    /// The reader thread went away without reporting an error.
    #[error("Link reader stopped unexpectedly")]
    ReaderStopped,

    /// The engine task panicked or was cancelled.
    #[error("Link engine stopped: {0}")]
    EngineStopped(String),

    /// A link thread could not be started.
    #[error("Failed to spawn link thread: {0}")]
    Spawn(#[source] io::Error),
}

impl LinkError {
    /// Create a new open error.
    pub fn open(device: impl Into<String>, source: serialport::Error) -> Self {
        Self::Open {
            device: device.into(),
            source,
        }
    }

    /// Check whether the error came from the byte stream itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let error = LinkError::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(error.is_transport());
        assert!(error.to_string().starts_with("Serial transport failed"));
    }

    #[test]
    fn test_open_error_names_device() {
        let source = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        let error = LinkError::open("/dev/ttyAMA0", source);
        assert_eq!(error.to_string(), "Failed to open serial device /dev/ttyAMA0: gone");
        assert!(!error.is_transport());
    }
}
