//! Dispatch payloads
//!
//! Payloads that are not a plain entity. Events whose `d` is exactly an entity
//! (`CHANNEL_CREATE`, `GUILD_CREATE`, `MESSAGE_CREATE`, ...) reuse the `chat-core` type.

use chat_core::{Activity, Emoji, Member, Snowflake, Status, UnavailableGuild, User};
use serde::{Deserialize, Serialize};

/// READY - sent after a successful Identify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Gateway version
    #[serde(default)]
    pub v: u8,
    pub user: User,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    pub session_id: String,
    /// Where to connect when resuming this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
}

/// MESSAGE_UPDATE - a partial message; only `id` and `channel_id` are guaranteed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageUpdateEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<String>,
}

/// MESSAGE_DELETE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    pub emoji: Emoji,
}

/// TYPING_START
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingStartEvent {
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix time in seconds
    pub timestamp: u64,
}

/// User reference inside a presence; only `id` is guaranteed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialUser {
    pub id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// PRESENCE_UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdateEvent {
    pub user: PartialUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub status: Status,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// GUILD_MEMBER_ADD - a member plus the guild it joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMemberAddEvent {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: Member,
}

/// GUILD_MEMBER_UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMemberUpdateEvent {
    pub guild_id: Snowflake,
    pub user: User,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
}

/// GUILD_MEMBER_REMOVE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildMemberRemoveEvent {
    pub guild_id: Snowflake,
    pub user: User,
}

/// VOICE_STATE_UPDATE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// `None` when the user left voice
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub session_id: String,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ready_event() {
        let ready: ReadyEvent = serde_json::from_value(json!({
            "v": 10,
            "user": {"id": "1", "username": "bot", "bot": true},
            "guilds": [{"id": "2", "unavailable": true}],
            "session_id": "abc",
            "resume_gateway_url": "wss://resume.test"
        }))
        .unwrap();

        assert_eq!(ready.session_id, "abc");
        assert_eq!(ready.guilds.len(), 1);
        assert_eq!(ready.resume_gateway_url.as_deref(), Some("wss://resume.test"));
        assert_eq!(ready.shard, None);
    }

    #[test]
    fn test_member_add_flattens_member() {
        let event: GuildMemberAddEvent = serde_json::from_value(json!({
            "guild_id": "5",
            "user": {"id": "6", "username": "new"},
            "roles": ["7"],
            "joined_at": "2024-01-01T00:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(event.guild_id, Snowflake::new(5));
        assert_eq!(event.member.user.unwrap().username, "new");
        assert!(event.member.roles.contains(&Snowflake::new(7)));
    }

    #[test]
    fn test_reaction_event() {
        let event: ReactionEvent = serde_json::from_value(json!({
            "user_id": "1",
            "channel_id": "2",
            "message_id": "3",
            "emoji": {"id": null, "name": "👍"}
        }))
        .unwrap();

        assert_eq!(event.emoji.reaction_form(), "👍");
        assert!(event.guild_id.is_none());
    }
}
