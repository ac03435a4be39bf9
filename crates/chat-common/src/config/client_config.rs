//! Client configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Bot token, without the `Bot ` prefix
    pub token: String,
    pub api: ApiConfig,
    pub gateway: GatewaySettings,
    pub rate_limit: RateLimitSettings,
    pub dispatch: DispatchConfig,
}

/// REST API settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub version: u8,
    /// URL advertised in the user agent
    #[serde(default = "default_user_agent_url")]
    pub user_agent_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Versioned base URL, e.g. `https://discord.com/api/v10`
    #[must_use]
    pub fn versioned_base(&self) -> String {
        format!("{}/v{}", self.base_url.trim_end_matches('/'), self.version)
    }
}

/// Gateway connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_intents")]
    pub intents: u64,
    #[serde(default)]
    pub shard_id: u32,
    #[serde(default = "default_shard_count")]
    pub shard_count: u32,
    #[serde(default = "default_large_threshold")]
    pub large_threshold: u8,
    #[serde(default)]
    pub compression: CompressionSetting,
}

/// Gateway compression mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionSetting {
    None,
    #[default]
    Payload,
    Stream,
}

impl FromStr for CompressionSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "payload" => Ok(Self::Payload),
            "stream" | "zlib-stream" => Ok(Self::Stream),
            other => Err(format!("unknown compression mode '{other}'")),
        }
    }
}

/// Request governor retry bounds
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_rate_limit_retries")]
    pub max_retries: u32,
    #[serde(default = "default_transient_retries")]
    pub max_transient_retries: u32,
}

/// Event dispatch settings
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Pending events buffered per handler before new ones are dropped
    #[serde(default = "default_handler_queue")]
    pub handler_queue: usize,
}

// Default value functions
fn default_api_base() -> String {
    "https://discord.com/api".to_string()
}

fn default_api_version() -> u8 {
    10
}

fn default_user_agent_url() -> String {
    "https://github.com/seung/chat-client".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

/// GUILDS | GUILD_MODERATION | GUILD_EMOJIS | GUILD_INTEGRATIONS | GUILD_WEBHOOKS
/// | GUILD_INVITES | GUILD_VOICE_STATES | GUILD_MESSAGES | GUILD_MESSAGE_REACTIONS
/// | GUILD_MESSAGE_TYPING | DIRECT_MESSAGES | DIRECT_MESSAGE_REACTIONS
/// | DIRECT_MESSAGE_TYPING | GUILD_SCHEDULED_EVENTS
fn default_intents() -> u64 {
    0b1_0111_1110_1111_1101
}

fn default_shard_count() -> u32 {
    1
}

fn default_large_threshold() -> u8 {
    100
}

fn default_rate_limit_retries() -> u32 {
    5
}

fn default_transient_retries() -> u32 {
    3
}

fn default_handler_queue() -> usize {
    256
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: impl FnOnce() -> T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(default()),
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `CHAT_TOKEN` is missing or a variable cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup("CHAT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("CHAT_TOKEN"))?;

        let compression = match lookup("CHAT_COMPRESSION") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CHAT_COMPRESSION", raw))?,
            None => CompressionSetting::default(),
        };

        let gateway = GatewaySettings {
            intents: parse_var(&lookup, "CHAT_INTENTS", default_intents)?,
            shard_id: parse_var(&lookup, "CHAT_SHARD_ID", || 0)?,
            shard_count: parse_var(&lookup, "CHAT_SHARD_COUNT", default_shard_count)?,
            large_threshold: parse_var::<u8>(&lookup, "CHAT_LARGE_THRESHOLD", default_large_threshold)?
                .clamp(50, 250),
            compression,
        };

        if gateway.shard_count == 0 || gateway.shard_id >= gateway.shard_count {
            return Err(ConfigError::InvalidValue(
                "CHAT_SHARD_ID",
                format!("shard {} of {}", gateway.shard_id, gateway.shard_count),
            ));
        }

        Ok(Self {
            token: token.trim().to_string(),
            api: ApiConfig {
                base_url: lookup("CHAT_API_BASE").unwrap_or_else(default_api_base),
                version: parse_var(&lookup, "CHAT_API_VERSION", default_api_version)?,
                user_agent_url: lookup("CHAT_USER_AGENT_URL")
                    .unwrap_or_else(default_user_agent_url),
                timeout_secs: parse_var(&lookup, "CHAT_HTTP_TIMEOUT_SECS", default_http_timeout)?,
            },
            gateway,
            rate_limit: RateLimitSettings {
                max_retries: parse_var(
                    &lookup,
                    "CHAT_RATE_LIMIT_MAX_RETRIES",
                    default_rate_limit_retries,
                )?,
                max_transient_retries: parse_var(
                    &lookup,
                    "CHAT_TRANSIENT_MAX_RETRIES",
                    default_transient_retries,
                )?,
            },
            dispatch: DispatchConfig {
                handler_queue: parse_var(&lookup, "CHAT_HANDLER_QUEUE", default_handler_queue)?
                    .max(1),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
