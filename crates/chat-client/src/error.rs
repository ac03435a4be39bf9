//! Client errors

use chat_common::ConfigError;
use chat_gateway::GatewayError;
use chat_rest::RestError;
use thiserror::Error;

/// Errors surfaced by [`Client`](crate::Client)
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("REST error: {0}")]
    Rest(#[from] RestError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Whether the gateway gave up for good: a terminal close code or a refused lookup
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Gateway(GatewayError::Closed { .. } | GatewayError::EndpointRejected(_))
        )
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
