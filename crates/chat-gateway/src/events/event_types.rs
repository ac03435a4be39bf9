//! Event kinds
//!
//! One kind per [`Event`](super::Event) variant. Dispatch kinds map to the `t`
//! field of op 0 frames; the last three are raised by the client itself.

use std::fmt;

/// Exact runtime kind of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Connection events
    Ready,
    Resumed,

    // Message events
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    ReactionAdd,
    ReactionRemove,
    TypingStart,

    // Presence
    PresenceUpdate,

    // Channel events
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,

    // Guild events
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,

    // Voice
    VoiceStateUpdate,

    /// A dispatch name this library does not decode
    Unknown,

    // Raised by the client
    /// An await fired
    AwaitMatched,
    /// The connection dropped
    Disconnected,
}

impl EventKind {
    /// Name in the `t` field, `None` for client-raised kinds
    #[must_use]
    pub const fn dispatch_name(self) -> Option<&'static str> {
        Some(match self {
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageUpdate => "MESSAGE_UPDATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::ReactionAdd => "MESSAGE_REACTION_ADD",
            Self::ReactionRemove => "MESSAGE_REACTION_REMOVE",
            Self::TypingStart => "TYPING_START",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
            Self::ChannelCreate => "CHANNEL_CREATE",
            Self::ChannelUpdate => "CHANNEL_UPDATE",
            Self::ChannelDelete => "CHANNEL_DELETE",
            Self::GuildCreate => "GUILD_CREATE",
            Self::GuildUpdate => "GUILD_UPDATE",
            Self::GuildDelete => "GUILD_DELETE",
            Self::GuildMemberAdd => "GUILD_MEMBER_ADD",
            Self::GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
            Self::GuildMemberRemove => "GUILD_MEMBER_REMOVE",
            Self::VoiceStateUpdate => "VOICE_STATE_UPDATE",
            Self::Unknown | Self::AwaitMatched | Self::Disconnected => return None,
        })
    }

    /// Parse a dispatch name
    #[must_use]
    pub fn from_dispatch_name(name: &str) -> Option<Self> {
        match name {
            "READY" => Some(Self::Ready),
            "RESUMED" => Some(Self::Resumed),
            "MESSAGE_CREATE" => Some(Self::MessageCreate),
            "MESSAGE_UPDATE" => Some(Self::MessageUpdate),
            "MESSAGE_DELETE" => Some(Self::MessageDelete),
            "MESSAGE_REACTION_ADD" => Some(Self::ReactionAdd),
            "MESSAGE_REACTION_REMOVE" => Some(Self::ReactionRemove),
            "TYPING_START" => Some(Self::TypingStart),
            "PRESENCE_UPDATE" => Some(Self::PresenceUpdate),
            "CHANNEL_CREATE" => Some(Self::ChannelCreate),
            "CHANNEL_UPDATE" => Some(Self::ChannelUpdate),
            "CHANNEL_DELETE" => Some(Self::ChannelDelete),
            "GUILD_CREATE" => Some(Self::GuildCreate),
            "GUILD_UPDATE" => Some(Self::GuildUpdate),
            "GUILD_DELETE" => Some(Self::GuildDelete),
            "GUILD_MEMBER_ADD" => Some(Self::GuildMemberAdd),
            "GUILD_MEMBER_UPDATE" => Some(Self::GuildMemberUpdate),
            "GUILD_MEMBER_REMOVE" => Some(Self::GuildMemberRemove),
            "VOICE_STATE_UPDATE" => Some(Self::VoiceStateUpdate),
            _ => None,
        }
    }

    /// Get the name of this kind
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::AwaitMatched => "AWAIT_MATCHED",
            Self::Disconnected => "DISCONNECTED",
            other => match other.dispatch_name() {
                Some(name) => name,
                None => "UNKNOWN",
            },
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
