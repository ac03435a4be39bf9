//! Gateway endpoint resolution

use async_trait::async_trait;
use url::Url;

use crate::error::{GatewayError, GatewayResult};
use crate::transport::Compression;

/// Finds the base gateway URL, usually through the REST API
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(&self) -> GatewayResult<String>;
}

/// A fixed endpoint
#[derive(Debug, Clone)]
pub struct StaticEndpoint {
    url: String,
}

impl StaticEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl EndpointResolver for StaticEndpoint {
    async fn resolve(&self) -> GatewayResult<String> {
        Ok(self.url.clone())
    }
}

/// Append the version, encoding and compression query to a base URL
pub fn connect_url(base: &str, version: u8, compression: Compression) -> GatewayResult<String> {
    let mut url =
        Url::parse(base).map_err(|e| GatewayError::Endpoint(format!("invalid url {base}: {e}")))?;

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.append_pair("v", &version.to_string());
        query.append_pair("encoding", "json");
        if let Some(compress) = compression.query_value() {
            query.append_pair("compress", compress);
        }
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_url() {
        let url = connect_url("wss://gateway.example.test", 10, Compression::Payload).unwrap();
        assert_eq!(url, "wss://gateway.example.test/?v=10&encoding=json");

        let url = connect_url("wss://gateway.example.test/?v=6", 10, Compression::Stream).unwrap();
        assert_eq!(
            url,
            "wss://gateway.example.test/?v=10&encoding=json&compress=zlib-stream"
        );
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            connect_url("not a url", 10, Compression::None),
            Err(GatewayError::Endpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_static_endpoint() {
        let endpoint = StaticEndpoint::new("wss://a.test");
        assert_eq!(endpoint.resolve().await.unwrap(), "wss://a.test");
    }
}
