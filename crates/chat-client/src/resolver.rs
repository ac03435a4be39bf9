//! Gateway endpoint lookup over REST

use async_trait::async_trait;
use chat_gateway::{EndpointResolver, GatewayError, GatewayResult};
use chat_rest::RestClient;

/// Resolves the gateway URL with `GET /gateway`
#[derive(Debug, Clone)]
pub struct RestEndpoint {
    rest: RestClient,
}

impl RestEndpoint {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl EndpointResolver for RestEndpoint {
    async fn resolve(&self) -> GatewayResult<String> {
        let info = self
            .rest
            .get_gateway()
            .await
            .map_err(|e| {
                if e.is_retryable() {
                    GatewayError::Endpoint(e.to_string())
                } else {
                    GatewayError::EndpointRejected(e.to_string())
                }
            })?;
        tracing::debug!(url = %info.url, "Resolved gateway endpoint");
        Ok(info.url)
    }
}
