//! Crate error type

use crate::sync::ConnectionId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A body is already registered for this connection
    #[error("connection {0} already has a body")]
    DuplicatePeer(ConnectionId),

    /// A presence entry could not be decoded
    #[error("malformed presence state: {0}")]
    MalformedState(#[from] serde_json::Error),

    #[error("invalid tuning: {0}")]
    InvalidTuning(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
