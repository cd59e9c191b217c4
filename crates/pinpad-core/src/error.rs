use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid key character: {0:?}")]
    InvalidKey(char),

    #[error("Unknown actuator command: {0}")]
    UnknownCommand(String),

    #[error("Invalid heartbeat token: {0}")]
    InvalidToken(String),

    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;
