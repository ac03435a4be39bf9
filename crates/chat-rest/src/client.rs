//! REST client
//!
//! Builds authenticated requests from [`RequestSpec`]s and sends them through the
//! governor. Typed helpers cover the endpoints a bot needs to talk back.

use chat_core::{Channel, Emoji, Message, Snowflake, User};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::form_urlencoded;

use crate::error::{RestError, RestResult};
use crate::models::{CreateMessage, EditMessage, GatewayBotInfo, GatewayInfo};
use crate::ratelimit::{GovernorConfig, RequestGovernor};
use crate::routes::{RequestSpec, Route};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Connection settings for the REST API
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Versioned base URL, e.g. `https://discord.com/api/v10`
    pub base_url: String,
    /// Bot token; a bare token gets the `Bot ` prefix
    pub token: String,
    /// URL advertised in the user agent
    pub user_agent_url: String,
    pub timeout: Duration,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            user_agent_url: "https://github.com/seung/chat-client".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// REST API client
#[derive(Debug, Clone)]
pub struct RestClient {
    governor: Arc<RequestGovernor>,
    base_url: String,
    authorization: String,
    user_agent: String,
}

impl RestClient {
    /// Create a client backed by `reqwest`
    pub fn new(config: RestConfig, governor: GovernorConfig) -> RestResult<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Self::with_transport(config, Arc::new(transport), governor)
    }

    /// Create a client over any transport
    pub fn with_transport(
        config: RestConfig,
        transport: Arc<dyn HttpTransport>,
        governor: GovernorConfig,
    ) -> RestResult<Self> {
        let token = config.token.trim();
        if token.is_empty() {
            return Err(RestError::InvalidRequest("token is empty".to_string()));
        }

        let authorization = if token.starts_with("Bot ") || token.starts_with("Bearer ") {
            token.to_string()
        } else {
            format!("Bot {token}")
        };

        Ok(Self {
            governor: Arc::new(RequestGovernor::new(transport, governor)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authorization,
            user_agent: format!(
                "DiscordBot ({}, {})",
                config.user_agent_url,
                env!("CARGO_PKG_VERSION")
            ),
        })
    }

    pub fn governor(&self) -> &RequestGovernor {
        &self.governor
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turn a [`RequestSpec`] into a concrete HTTP request with the standard headers
    pub fn build_request(&self, spec: &RequestSpec) -> HttpRequest {
        let mut request = HttpRequest::new(
            spec.route.method(),
            format!("{}{}", self.base_url, spec.route.path()),
        )
        .header("Authorization", self.authorization.as_str())
        .header("User-Agent", self.user_agent.as_str());

        if let Some(body) = &spec.body {
            request = request
                .header("Content-Type", "application/json")
                .body(body.to_string());
        }

        if let Some(reason) = &spec.reason {
            let encoded: String = form_urlencoded::byte_serialize(reason.as_bytes()).collect();
            request = request.header("X-Audit-Log-Reason", encoded.replace('+', "%20"));
        }

        request
    }

    /// Send any request through the governor
    pub async fn send(&self, spec: RequestSpec) -> RestResult<HttpResponse> {
        let key = spec.route.bucket();
        let request = self.build_request(&spec);
        debug!(bucket = %key, method = %request.method, path = %spec.route.path(), "REST request");
        self.governor.execute(&key, request).await
    }

    async fn send_json<T: DeserializeOwned>(&self, spec: RequestSpec) -> RestResult<T> {
        let response = self.send(spec).await?;
        Ok(response.json()?)
    }

    fn to_body<T: serde::Serialize>(body: &T) -> RestResult<serde_json::Value> {
        Ok(serde_json::to_value(body)?)
    }

    // =========================================================================
    // Gateway
    // =========================================================================

    pub async fn get_gateway(&self) -> RestResult<GatewayInfo> {
        self.send_json(Route::GetGateway.into()).await
    }

    pub async fn get_gateway_bot(&self) -> RestResult<GatewayBotInfo> {
        self.send_json(Route::GetGatewayBot.into()).await
    }

    // =========================================================================
    // Users and channels
    // =========================================================================

    pub async fn get_current_user(&self) -> RestResult<User> {
        self.send_json(Route::GetCurrentUser.into()).await
    }

    pub async fn get_channel(&self, channel_id: Snowflake) -> RestResult<Channel> {
        self.send_json(Route::GetChannel { channel_id }.into()).await
    }

    // =========================================================================
    // Messages
    // =========================================================================

    pub async fn create_message(
        &self,
        channel_id: Snowflake,
        message: &CreateMessage,
    ) -> RestResult<Message> {
        let spec = RequestSpec::new(Route::CreateMessage { channel_id }).json(Self::to_body(message)?);
        self.send_json(spec).await
    }

    pub async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        edit: &EditMessage,
    ) -> RestResult<Message> {
        let spec = RequestSpec::new(Route::EditMessage {
            channel_id,
            message_id,
        })
        .json(Self::to_body(edit)?);
        self.send_json(spec).await
    }

    pub async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> RestResult<()> {
        let mut spec = RequestSpec::new(Route::DeleteMessage {
            channel_id,
            message_id,
        });
        if let Some(reason) = reason {
            spec = spec.reason(reason);
        }
        self.send(spec).await.map(|_| ())
    }

    pub async fn trigger_typing(&self, channel_id: Snowflake) -> RestResult<()> {
        self.send(Route::TriggerTyping { channel_id }.into())
            .await
            .map(|_| ())
    }

    pub async fn create_reaction(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &Emoji,
    ) -> RestResult<()> {
        self.send(
            Route::CreateReaction {
                channel_id,
                message_id,
                emoji: emoji.reaction_form(),
            }
            .into(),
        )
        .await
        .map(|_| ())
    }
}
