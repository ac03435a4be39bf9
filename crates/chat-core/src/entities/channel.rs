//! Channel - a text channel, voice channel, DM, or category

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value_objects::Snowflake;

/// Channel type, transmitted as an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelType {
    /// Guild text channel
    #[default]
    GuildText,
    /// Direct message between users
    Dm,
    /// Guild voice channel
    GuildVoice,
    /// Direct message between multiple users
    GroupDm,
    /// Guild category for organizing channels
    GuildCategory,
    /// Announcement channel that can be followed
    GuildAnnouncement,
    /// A type this library does not know yet
    Unknown(u8),
}

impl ChannelType {
    /// Get the numeric value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::GuildText => 0,
            Self::Dm => 1,
            Self::GuildVoice => 2,
            Self::GroupDm => 3,
            Self::GuildCategory => 4,
            Self::GuildAnnouncement => 5,
            Self::Unknown(value) => value,
        }
    }

    /// Check if messages can be sent in this channel type
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            Self::GuildText | Self::Dm | Self::GroupDm | Self::GuildAnnouncement
        )
    }
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::GuildText,
            1 => Self::Dm,
            2 => Self::GuildVoice,
            3 => Self::GroupDm,
            4 => Self::GuildCategory,
            5 => Self::GuildAnnouncement,
            other => Self::Unknown(other),
        }
    }
}

impl Serialize for ChannelType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ChannelType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u8::deserialize(deserializer).map(Self::from)
    }
}

/// Channel as delivered by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub nsfw: bool,
}

impl Channel {
    /// Check if this is a private (DM or group DM) channel
    #[inline]
    #[must_use]
    pub fn is_private(&self) -> bool {
        matches!(self.kind, ChannelType::Dm | ChannelType::GroupDm)
    }

    /// Mention string, e.g. `<#1234>`
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_type_roundtrip_values() {
        assert_eq!(ChannelType::from(0), ChannelType::GuildText);
        assert_eq!(ChannelType::from(4), ChannelType::GuildCategory);
        assert_eq!(ChannelType::from(15), ChannelType::Unknown(15));
        assert_eq!(ChannelType::Unknown(15).as_u8(), 15);
        assert!(ChannelType::Dm.is_text());
        assert!(!ChannelType::GuildVoice.is_text());
    }

    #[test]
    fn test_channel_deserialize() {
        let channel: Channel = serde_json::from_value(serde_json::json!({
            "id": "41771983423143937",
            "type": 1,
            "name": null
        }))
        .unwrap();

        assert_eq!(channel.id, Snowflake::new(41_771_983_423_143_937));
        assert!(channel.is_private());
        assert_eq!(channel.mention(), "<#41771983423143937>");
    }
}
