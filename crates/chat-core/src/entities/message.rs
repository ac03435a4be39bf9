//! Message - a chat message with its author and attachments

use serde::{Deserialize, Serialize};

use super::User;
use crate::value_objects::{parse_mentions, Mention, Snowflake};

/// Message as delivered by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub author: User,
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub pinned: bool,
}

impl Message {
    /// Check if the message was sent in a guild
    #[inline]
    pub fn is_guild(&self) -> bool {
        self.guild_id.is_some()
    }

    /// Check if the message has been edited
    #[inline]
    pub fn is_edited(&self) -> bool {
        self.edited_timestamp.is_some()
    }

    /// Check if `user_id` is mentioned explicitly
    pub fn mentions_user(&self, user_id: Snowflake) -> bool {
        self.mentions.iter().any(|u| u.id == user_id)
    }

    /// Mentions written in the content, including roles, channels and emoji
    pub fn parsed_mentions(&self) -> Vec<Mention> {
        parse_mentions(&self.content)
    }
}

/// File attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    pub size: u64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_deserialize_minimal() {
        let message: Message = serde_json::from_value(serde_json::json!({
            "id": "1",
            "channel_id": "2",
            "author": {"id": "3", "username": "bob"},
            "content": "hi <@4>",
            "timestamp": "2024-01-01T00:00:00+00:00",
            "mentions": [{"id": "4", "username": "alice"}]
        }))
        .unwrap();

        assert!(!message.is_guild());
        assert!(!message.is_edited());
        assert!(message.mentions_user(Snowflake::new(4)));
        assert!(!message.mentions_user(Snowflake::new(3)));
        assert!(message.attachments.is_empty());
        assert_eq!(message.parsed_mentions(), vec![Mention::User(Snowflake::new(4))]);
    }
}
