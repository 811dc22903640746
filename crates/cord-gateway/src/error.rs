//! Gateway error types

use cord_common::ConfigError;
use cord_rest::RestError;
use tokio_tungstenite::tungstenite;

use crate::session::SessionState;

/// Errors raised by the gateway client
///
/// Errors while processing an inbound frame never leave the session; they are
/// logged and the frame is dropped.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Frame text or payload did not have the expected shape
    #[error("Failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// Frame decoded but is missing a required field
    #[error("Malformed frame: {0}")]
    Malformed(&'static str),

    /// Frame is valid but not allowed in the current session state
    #[error("Unexpected op {op} while {state}")]
    UnexpectedFrame { op: u8, state: SessionState },

    /// Socket could not be opened or failed while open
    #[error("Transport error: {0}")]
    Transport(#[from] Box<tungstenite::Error>),

    #[error(transparent)]
    Rest(#[from] RestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A session is already open on this client
    #[error("Already logged in")]
    AlreadyConnected,

    /// No open session to send on
    #[error("Not connected")]
    NotConnected,

    /// Outbound queue is at capacity; the frame was not queued
    #[error("Outbound queue full")]
    QueueFull,
}

impl From<tungstenite::Error> for GatewayError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
