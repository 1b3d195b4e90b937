//! Error types for the live session

use thiserror::Error;

/// Errors surfaced at the session boundary
///
/// Buffer, filter and statistics operations never fail; these only cover
/// talking to the session task and the capture engine.
#[derive(Debug, Error)]
pub enum LiveError {
    /// The capture engine could not produce a packet detail
    #[error("detail fetch for packet {id} failed: {message}")]
    DetailFetch {
        /// Requested packet id
        id: u64,
        /// Engine error message
        message: String,
    },

    /// A detail response arrived after the selection moved on
    #[error("detail for packet {id} is stale")]
    StaleDetail {
        /// Packet id of the discarded response
        id: u64,
    },

    /// The session task is gone
    #[error("live session closed")]
    SessionClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed record data
    #[error("invalid record: {0}")]
    Json(#[from] serde_json::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for LiveError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        LiveError::SessionClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for LiveError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        LiveError::SessionClosed
    }
}
