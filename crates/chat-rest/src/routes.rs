//! Route catalogue
//!
//! Each route knows its method, its path, and the bucket it is limited under.
//! The bucket family is the path template with the major parameter kept as a key
//! and every minor parameter (message id, emoji, user id) folded away.

use chat_core::Snowflake;
use url::form_urlencoded;

use crate::ratelimit::BucketKey;
use crate::transport::Method;

/// REST endpoints used by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    GetGateway,
    GetGatewayBot,
    GetCurrentUser,
    GetChannel {
        channel_id: Snowflake,
    },
    GetMessage {
        channel_id: Snowflake,
        message_id: Snowflake,
    },
    CreateMessage {
        channel_id: Snowflake,
    },
    EditMessage {
        channel_id: Snowflake,
        message_id: Snowflake,
    },
    DeleteMessage {
        channel_id: Snowflake,
        message_id: Snowflake,
    },
    TriggerTyping {
        channel_id: Snowflake,
    },
    /// `emoji` is `name` for unicode emoji or `name:id` for custom ones
    CreateReaction {
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: String,
    },
    DeleteOwnReaction {
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: String,
    },
    GetGuild {
        guild_id: Snowflake,
    },
    GetGuildMember {
        guild_id: Snowflake,
        user_id: Snowflake,
    },
    AddGuildMemberRole {
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
    },
    RemoveGuildMemberRole {
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
    },
}

impl Route {
    pub const fn method(&self) -> Method {
        match self {
            Self::GetGateway
            | Self::GetGatewayBot
            | Self::GetCurrentUser
            | Self::GetChannel { .. }
            | Self::GetMessage { .. }
            | Self::GetGuild { .. }
            | Self::GetGuildMember { .. } => Method::Get,
            Self::CreateMessage { .. } | Self::TriggerTyping { .. } => Method::Post,
            Self::EditMessage { .. } => Method::Patch,
            Self::CreateReaction { .. } | Self::AddGuildMemberRole { .. } => Method::Put,
            Self::DeleteMessage { .. }
            | Self::DeleteOwnReaction { .. }
            | Self::RemoveGuildMemberRole { .. } => Method::Delete,
        }
    }

    /// Path relative to the versioned base URL, with a leading slash
    pub fn path(&self) -> String {
        match self {
            Self::GetGateway => "/gateway".to_string(),
            Self::GetGatewayBot => "/gateway/bot".to_string(),
            Self::GetCurrentUser => "/users/@me".to_string(),
            Self::GetChannel { channel_id } => format!("/channels/{channel_id}"),
            Self::CreateMessage { channel_id } => format!("/channels/{channel_id}/messages"),
            Self::GetMessage {
                channel_id,
                message_id,
            }
            | Self::EditMessage {
                channel_id,
                message_id,
            }
            | Self::DeleteMessage {
                channel_id,
                message_id,
            } => format!("/channels/{channel_id}/messages/{message_id}"),
            Self::TriggerTyping { channel_id } => format!("/channels/{channel_id}/typing"),
            Self::CreateReaction {
                channel_id,
                message_id,
                emoji,
            }
            | Self::DeleteOwnReaction {
                channel_id,
                message_id,
                emoji,
            } => format!(
                "/channels/{channel_id}/messages/{message_id}/reactions/{}/@me",
                encode_segment(emoji)
            ),
            Self::GetGuild { guild_id } => format!("/guilds/{guild_id}"),
            Self::GetGuildMember { guild_id, user_id } => {
                format!("/guilds/{guild_id}/members/{user_id}")
            }
            Self::AddGuildMemberRole {
                guild_id,
                user_id,
                role_id,
            }
            | Self::RemoveGuildMemberRole {
                guild_id,
                user_id,
                role_id,
            } => format!("/guilds/{guild_id}/members/{user_id}/roles/{role_id}"),
        }
    }

    /// The rate-limit bucket this route is counted against
    pub fn bucket(&self) -> BucketKey {
        match self {
            Self::GetGateway | Self::GetGatewayBot => BucketKey::unscoped("gateway"),
            Self::GetCurrentUser => BucketKey::unscoped("users/@me"),
            Self::GetChannel { channel_id } => BucketKey::new("channels", Some(*channel_id)),
            Self::GetMessage { channel_id, .. } | Self::CreateMessage { channel_id } => {
                BucketKey::new("channels/messages", Some(*channel_id))
            }
            Self::EditMessage { channel_id, .. } => {
                BucketKey::new("channels/messages/edit", Some(*channel_id))
            }
            Self::DeleteMessage { channel_id, .. } => {
                BucketKey::new("channels/messages/delete", Some(*channel_id))
            }
            Self::TriggerTyping { channel_id } => {
                BucketKey::new("channels/typing", Some(*channel_id))
            }
            Self::CreateReaction { channel_id, .. } | Self::DeleteOwnReaction { channel_id, .. } => {
                BucketKey::new("channels/messages/reactions", Some(*channel_id))
            }
            Self::GetGuild { guild_id } => BucketKey::new("guilds", Some(*guild_id)),
            Self::GetGuildMember { guild_id, .. } => {
                BucketKey::new("guilds/members", Some(*guild_id))
            }
            Self::AddGuildMemberRole { guild_id, .. }
            | Self::RemoveGuildMemberRole { guild_id, .. } => {
                BucketKey::new("guilds/members/roles", Some(*guild_id))
            }
        }
    }
}

fn encode_segment(segment: &str) -> String {
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// A REST call: route, optional JSON body, optional audit log reason
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub route: Route,
    pub body: Option<serde_json::Value>,
    pub reason: Option<String>,
}

impl RequestSpec {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            body: None,
            reason: None,
        }
    }

    /// Attach a JSON body
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach an audit log reason
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl From<Route> for RequestSpec {
    fn from(route: Route) -> Self {
        Self::new(route)
    }
}
