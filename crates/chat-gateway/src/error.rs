//! Gateway errors

use thiserror::Error;

use crate::protocol::CloseCode;
use crate::transport::TransportError;

/// Errors surfaced by the gateway client
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server closed with a code that must not be retried
    #[error("gateway closed with terminal code {code}: {reason}")]
    Closed { code: u16, reason: String },

    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to inflate frame: {0}")]
    Inflate(String),

    #[error("could not resolve gateway endpoint: {0}")]
    Endpoint(String),

    /// The endpoint lookup was refused, e.g. a bad token
    #[error("gateway endpoint lookup rejected: {0}")]
    EndpointRejected(String),

    #[error("invalid gateway options: {0}")]
    InvalidOptions(String),

    #[error("gateway client is shutting down")]
    ShuttingDown,

    #[error("gateway client is not connected")]
    NotConnected,

    #[error("gateway client was already started")]
    AlreadyStarted,
}

impl GatewayError {
    /// Build the terminal error for a close code
    pub fn closed(code: u16, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let reason = if reason.is_empty() {
            CloseCode::from_u16(code).map_or_else(String::new, |c| c.description().to_string())
        } else {
            reason
        };
        Self::Closed { code, reason }
    }

    /// Whether reconnecting could fix this
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Decode(_) | Self::Inflate(_) | Self::Endpoint(_) => true,
            Self::Closed { code, .. } => !CloseCode::is_terminal_code(*code),
            Self::EndpointRejected(_)
            | Self::InvalidOptions(_)
            | Self::ShuttingDown
            | Self::NotConnected
            | Self::AlreadyStarted => false,
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
