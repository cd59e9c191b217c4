//! Unix socket accepting `open` / `close` lines.
//!
//! # Protocol
//!
//! ```text
//! client: open\n
//! server: ok\n
//! client: dance\n
//! server: error: unknown cmd\n
//! ```
//!
//! A line longer than the configured limit is answered like an unknown
//! command and ends the connection. Commands go to the same actuator queue the keypad uses, so a
//! socket request never runs concurrently with a keypad request.
//!
//! # Example Usage
//!
//! ```no_run
//! use pinpad_hardware::ActuatorHandle;
//! use pinpad_network::{ControlSocket, ControlSocketConfig};
//!
//! # async fn example(actuator: ActuatorHandle) -> Result<(), pinpad_network::ControlError> {
//! let socket = ControlSocket::bind(ControlSocketConfig::default())?;
//! socket.serve(actuator).await;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use futures::{SinkExt, StreamExt};
use pinpad_core::ActuatorCommand;
use pinpad_core::constants::{DEFAULT_CONTROL_SOCKET, MAX_CONTROL_LINE};
use pinpad_hardware::ActuatorHandle;
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// Configuration for the control socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSocketConfig {
    /// Filesystem path of the socket
    pub path: PathBuf,

    /// Longest accepted line, in bytes
    pub max_line: usize,
}

impl Default for ControlSocketConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CONTROL_SOCKET),
            max_line: MAX_CONTROL_LINE,
        }
    }
}

/// Errors that can occur on the control socket
#[derive(Debug, Error)]
pub enum ControlError {
    /// Failed to listen on the socket path
    #[error("Failed to bind {}: {source}", .path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Connection I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Answer to one request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlReply {
    Ok,
    UnknownCommand,
    ActuatorUnavailable,
}

impl ControlReply {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::UnknownCommand => "error: unknown cmd",
            Self::ActuatorUnavailable => "error: actuator unavailable",
        }
    }
}

impl fmt::Display for ControlReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse one request line and queue the command it names.
pub async fn handle_line(line: &str, actuator: &ActuatorHandle) -> ControlReply {
    let Ok(command) = line.trim().parse::<ActuatorCommand>() else {
        return ControlReply::UnknownCommand;
    };

    info!("Control socket requested {}", command);
    match actuator.submit(command).await {
        Ok(()) => ControlReply::Ok,
        Err(e) => {
            warn!("Control socket could not queue {}: {}", command, e);
            ControlReply::ActuatorUnavailable
        }
    }
}

/// Listening control socket. The socket file is removed on drop.
#[derive(Debug)]
pub struct ControlSocket {
    listener: UnixListener,
    path: PathBuf,
    max_line: usize,
}

impl ControlSocket {
    /// Bind the socket, replacing a stale socket file.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Bind`] if the path cannot be listened on.
    pub fn bind(config: ControlSocketConfig) -> Result<Self, ControlError> {
        match std::fs::remove_file(&config.path) {
            Ok(()) => debug!("Removed stale socket {}", config.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ControlError::Bind {
                    path: config.path,
                    source: e,
                });
            }
        }

        let listener = UnixListener::bind(&config.path).map_err(|source| ControlError::Bind {
            path: config.path.clone(),
            source,
        })?;
        info!("Control socket listening on {}", config.path.display());

        Ok(Self {
            listener,
            path: config.path,
            max_line: config.max_line,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept connections forever, one task per connection.
    pub async fn serve(self, actuator: ActuatorHandle) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let actuator = actuator.clone();
                    let max_line = self.max_line;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, actuator, max_line).await {
                            debug!("Control connection ended: {}", e);
                        }
                    });
                }
                Err(e) => {
                    warn!("Control socket accept failed: {}", e);
                }
            }
        }
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn handle_connection(
    stream: UnixStream,
    actuator: ActuatorHandle,
    max_line: usize,
) -> Result<(), ControlError> {
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(max_line));

    while let Some(line) = framed.next().await {
        let (reply, keep_open) = match line {
            Ok(line) => (handle_line(&line, &actuator).await, true),
            Err(LinesCodecError::Io(e)) => return Err(e.into()),
            // The framed stream ends after a decode error
            Err(_) => (ControlReply::UnknownCommand, false),
        };
        framed.send(reply.as_str()).await.map_err(|e| match e {
            LinesCodecError::Io(e) => ControlError::Io(e),
            other => ControlError::Io(io::Error::other(other.to_string())),
        })?;
        if !keep_open {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_line_forwards_commands() {
        let (actuator, mut requests) = ActuatorHandle::channel(4);

        assert_eq!(handle_line("open", &actuator).await, ControlReply::Ok);
        assert_eq!(handle_line("close\r", &actuator).await, ControlReply::Ok);

        assert_eq!(requests.recv().await.unwrap().command, ActuatorCommand::Open);
        assert_eq!(requests.recv().await.unwrap().command, ActuatorCommand::Close);
    }

    #[tokio::test]
    async fn test_handle_line_rejects_unknown() {
        let (actuator, mut requests) = ActuatorHandle::channel(4);

        assert_eq!(handle_line("OPEN NOW", &actuator).await, ControlReply::UnknownCommand);
        assert_eq!(handle_line("", &actuator).await, ControlReply::UnknownCommand);
        assert!(requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handle_line_without_worker() {
        let (actuator, requests) = ActuatorHandle::channel(4);
        drop(requests);

        assert_eq!(
            handle_line("open", &actuator).await,
            ControlReply::ActuatorUnavailable
        );
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(ControlReply::Ok.to_string(), "ok");
        assert_eq!(ControlReply::UnknownCommand.as_str(), "error: unknown cmd");
    }
}
