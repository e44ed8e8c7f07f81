//! Client-side error types.

use hangouts_shared::{ApiError, ClientCommand, HangoutState, ProtocolError};
use thiserror::Error;

/// Failure reading or writing the durable store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(&'static str),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored value is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failure handing a frame to the socket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    #[error("socket is not connected")]
    NotConnected,
    #[error("failed to send: {0}")]
    SendFailed(String),
}

/// Errors recorded in [`EngineState::error`](crate::reducer::EngineState).
///
/// All of them are recoverable: the engine keeps running and the UI decides
/// how to render them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("no hangout with {0}")]
    UnknownHangout(String),
    #[error("no hangout selected")]
    NoSelection,
    #[error("{command} is not allowed while {state}")]
    NotPermitted {
        state: HangoutState,
        command: ClientCommand,
    },
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        EngineError::Storage(e.to_string())
    }
}

impl EngineError {
    /// Text for an inline error message.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
