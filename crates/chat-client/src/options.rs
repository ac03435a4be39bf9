//! Credentials and client options

use chat_common::{ClientConfig, CompressionSetting};
use chat_gateway::dispatch::DispatcherConfig;
use chat_gateway::protocol::{Intents, PresenceUpdatePayload};
use chat_gateway::{Compression, GatewayOptions};
use chat_rest::{GovernorConfig, RestConfig};
use std::fmt;
use std::time::Duration;

/// Bot credentials
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Token without any `Bot ` prefix, as the gateway expects it
    pub fn bare_token(&self) -> &str {
        let token = self.token.trim();
        token.strip_prefix("Bot ").unwrap_or(token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl From<&ClientConfig> for Credentials {
    fn from(config: &ClientConfig) -> Self {
        Self::new(config.token.clone())
    }
}

/// Everything about a client except the credentials
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Versioned REST base URL
    pub api_base: String,
    pub user_agent_url: String,
    pub http_timeout: Duration,
    pub intents: Intents,
    /// `(shard_id, shard_count)`
    pub shard: (u32, u32),
    pub large_threshold: u8,
    pub compression: Compression,
    pub presence: Option<PresenceUpdatePayload>,
    /// Skip the REST lookup and connect here
    pub gateway_url: Option<String>,
    pub governor: GovernorConfig,
    pub dispatcher: DispatcherConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let rest = RestConfig::new("https://discord.com/api/v10", "");
        Self {
            api_base: rest.base_url,
            user_agent_url: rest.user_agent_url,
            http_timeout: rest.timeout,
            intents: Intents::non_privileged(),
            shard: (0, 1),
            large_threshold: 100,
            compression: Compression::default(),
            presence: None,
            gateway_url: None,
            governor: GovernorConfig::default(),
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl ClientOptions {
    pub fn intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    pub fn shard(mut self, id: u32, count: u32) -> Self {
        self.shard = (id, count);
        self
    }

    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn presence(mut self, presence: PresenceUpdatePayload) -> Self {
        self.presence = Some(presence);
        self
    }

    pub(crate) fn rest_config(&self, credentials: &Credentials) -> RestConfig {
        RestConfig {
            base_url: self.api_base.clone(),
            token: credentials.token().to_string(),
            user_agent_url: self.user_agent_url.clone(),
            timeout: self.http_timeout,
        }
    }

    pub(crate) fn gateway_options(&self, credentials: &Credentials) -> GatewayOptions {
        let mut options = GatewayOptions::new(credentials.bare_token())
            .intents(self.intents)
            .shard(self.shard.0, self.shard.1)
            .large_threshold(self.large_threshold)
            .compression(self.compression);
        options.presence.clone_from(&self.presence);
        options
    }
}

impl From<&ClientConfig> for ClientOptions {
    fn from(config: &ClientConfig) -> Self {
        let compression = match config.gateway.compression {
            CompressionSetting::None => Compression::None,
            CompressionSetting::Payload => Compression::Payload,
            CompressionSetting::Stream => Compression::Stream,
        };

        Self {
            api_base: config.api.versioned_base(),
            user_agent_url: config.api.user_agent_url.clone(),
            http_timeout: Duration::from_secs(config.api.timeout_secs),
            intents: Intents::from_bits_truncate(config.gateway.intents),
            shard: (config.gateway.shard_id, config.gateway.shard_count),
            large_threshold: config.gateway.large_threshold,
            compression,
            presence: None,
            gateway_url: None,
            governor: GovernorConfig {
                max_rate_limit_retries: config.rate_limit.max_retries,
                max_transient_retries: config.rate_limit.max_transient_retries,
                ..GovernorConfig::default()
            },
            dispatcher: DispatcherConfig {
                handler_queue: config.dispatch.handler_queue,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    #[test]
    fn test_from_config() {
        let config = config(&[
            ("CHAT_TOKEN", "abc"),
            ("CHAT_API_BASE", "http://localhost:9000/api"),
            ("CHAT_COMPRESSION", "stream"),
            ("CHAT_SHARD_ID", "1"),
            ("CHAT_SHARD_COUNT", "3"),
            ("CHAT_RATE_LIMIT_MAX_RETRIES", "2"),
            ("CHAT_HANDLER_QUEUE", "8"),
        ]);
        let options = ClientOptions::from(&config);

        assert_eq!(options.api_base, "http://localhost:9000/api/v10");
        assert_eq!(options.compression, Compression::Stream);
        assert_eq!(options.shard, (1, 3));
        assert_eq!(options.governor.max_rate_limit_retries, 2);
        assert_eq!(options.governor.max_transient_retries, 3);
        assert_eq!(options.dispatcher.handler_queue, 8);
        assert_eq!(Credentials::from(&config).token(), "abc");
    }

    #[test]
    fn test_gateway_options() {
        let credentials = Credentials::new("Bot secret");
        let options = ClientOptions::default().shard(2, 4).gateway_options(&credentials);

        assert_eq!(options.token, "secret");
        assert_eq!(options.shard, (2, 4));
        options.validate().unwrap();
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let credentials = Credentials::new("secret");
        assert!(!format!("{credentials:?}").contains("secret"));
    }
}
