//! Typed gateway events

use chat_core::{Channel, Guild, Message, UnavailableGuild};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::attribute::AttrValue;
use super::event_types::EventKind;
use super::payloads::{
    GuildMemberAddEvent, GuildMemberRemoveEvent, GuildMemberUpdateEvent, MessageDeleteEvent,
    MessageUpdateEvent, PresenceUpdateEvent, ReactionEvent, ReadyEvent, TypingStartEvent,
    VoiceStateEvent,
};

/// A decoded event. Immutable once built; handlers receive it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Ready(Box<ReadyEvent>),
    Resumed,
    MessageCreate(Box<Message>),
    MessageUpdate(MessageUpdateEvent),
    MessageDelete(MessageDeleteEvent),
    ReactionAdd(ReactionEvent),
    ReactionRemove(ReactionEvent),
    TypingStart(TypingStartEvent),
    PresenceUpdate(PresenceUpdateEvent),
    ChannelCreate(Channel),
    ChannelUpdate(Channel),
    ChannelDelete(Channel),
    GuildCreate(Box<Guild>),
    GuildUpdate(Box<Guild>),
    GuildDelete(UnavailableGuild),
    GuildMemberAdd(Box<GuildMemberAddEvent>),
    GuildMemberUpdate(GuildMemberUpdateEvent),
    GuildMemberRemove(GuildMemberRemoveEvent),
    VoiceStateUpdate(VoiceStateEvent),
    /// A dispatch this library does not decode, kept raw
    Unknown { name: String, data: Value },
    /// An await registered under `key` matched `event`
    AwaitMatched { key: String, event: Box<Event> },
    /// The gateway connection dropped; `terminal` means no reconnect follows
    Disconnected {
        code: Option<u16>,
        reason: String,
        terminal: bool,
    },
}

fn parse<T: DeserializeOwned>(data: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(data)
}

impl Event {
    /// Decode the `d` of a dispatch frame named `name`
    pub fn decode(name: &str, data: Value) -> Result<Self, serde_json::Error> {
        let Some(kind) = EventKind::from_dispatch_name(name) else {
            return Ok(Self::Unknown {
                name: name.to_string(),
                data,
            });
        };

        Ok(match kind {
            EventKind::Ready => Self::Ready(Box::new(parse(data)?)),
            EventKind::Resumed => Self::Resumed,
            EventKind::MessageCreate => Self::MessageCreate(Box::new(parse(data)?)),
            EventKind::MessageUpdate => Self::MessageUpdate(parse(data)?),
            EventKind::MessageDelete => Self::MessageDelete(parse(data)?),
            EventKind::ReactionAdd => Self::ReactionAdd(parse(data)?),
            EventKind::ReactionRemove => Self::ReactionRemove(parse(data)?),
            EventKind::TypingStart => Self::TypingStart(parse(data)?),
            EventKind::PresenceUpdate => Self::PresenceUpdate(parse(data)?),
            EventKind::ChannelCreate => Self::ChannelCreate(parse(data)?),
            EventKind::ChannelUpdate => Self::ChannelUpdate(parse(data)?),
            EventKind::ChannelDelete => Self::ChannelDelete(parse(data)?),
            EventKind::GuildCreate => Self::GuildCreate(Box::new(parse(data)?)),
            EventKind::GuildUpdate => Self::GuildUpdate(Box::new(parse(data)?)),
            EventKind::GuildDelete => Self::GuildDelete(parse(data)?),
            EventKind::GuildMemberAdd => Self::GuildMemberAdd(Box::new(parse(data)?)),
            EventKind::GuildMemberUpdate => Self::GuildMemberUpdate(parse(data)?),
            EventKind::GuildMemberRemove => Self::GuildMemberRemove(parse(data)?),
            EventKind::VoiceStateUpdate => Self::VoiceStateUpdate(parse(data)?),
            EventKind::Unknown | EventKind::AwaitMatched | EventKind::Disconnected => {
                Self::Unknown {
                    name: name.to_string(),
                    data,
                }
            }
        })
    }

    /// Exact kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::Resumed => EventKind::Resumed,
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::MessageUpdate(_) => EventKind::MessageUpdate,
            Self::MessageDelete(_) => EventKind::MessageDelete,
            Self::ReactionAdd(_) => EventKind::ReactionAdd,
            Self::ReactionRemove(_) => EventKind::ReactionRemove,
            Self::TypingStart(_) => EventKind::TypingStart,
            Self::PresenceUpdate(_) => EventKind::PresenceUpdate,
            Self::ChannelCreate(_) => EventKind::ChannelCreate,
            Self::ChannelUpdate(_) => EventKind::ChannelUpdate,
            Self::ChannelDelete(_) => EventKind::ChannelDelete,
            Self::GuildCreate(_) => EventKind::GuildCreate,
            Self::GuildUpdate(_) => EventKind::GuildUpdate,
            Self::GuildDelete(_) => EventKind::GuildDelete,
            Self::GuildMemberAdd(_) => EventKind::GuildMemberAdd,
            Self::GuildMemberUpdate(_) => EventKind::GuildMemberUpdate,
            Self::GuildMemberRemove(_) => EventKind::GuildMemberRemove,
            Self::VoiceStateUpdate(_) => EventKind::VoiceStateUpdate,
            Self::Unknown { .. } => EventKind::Unknown,
            Self::AwaitMatched { .. } => EventKind::AwaitMatched,
            Self::Disconnected { .. } => EventKind::Disconnected,
        }
    }

    /// Read a named field for predicate matching.
    ///
    /// Ids are exposed as `*_id` keys; names and text as `content`, `name`,
    /// `author_name`, `emoji`, `status`, and so on. Unknown keys return `None`.
    pub fn attribute(&self, key: &str) -> Option<AttrValue> {
        match self {
            Self::Ready(ready) => match key {
                "session_id" => Some(ready.session_id.as_str().into()),
                "user_id" => Some(ready.user.id.into()),
                "user_name" => Some(ready.user.username.as_str().into()),
                _ => None,
            },
            Self::MessageCreate(message) => match key {
                "content" => Some(message.content.as_str().into()),
                "message_id" => Some(message.id.into()),
                "channel_id" => Some(message.channel_id.into()),
                "guild_id" => message.guild_id.map(Into::into),
                "author_id" => Some(message.author.id.into()),
                "author_name" => Some(message.author.username.as_str().into()),
                "bot" => Some(message.author.bot.into()),
                _ => None,
            },
            Self::MessageUpdate(update) => match key {
                "content" => update.content.as_deref().map(Into::into),
                "message_id" => Some(update.id.into()),
                "channel_id" => Some(update.channel_id.into()),
                "guild_id" => update.guild_id.map(Into::into),
                "author_id" => update.author.as_ref().map(|a| a.id.into()),
                _ => None,
            },
            Self::MessageDelete(delete) => match key {
                "message_id" => Some(delete.id.into()),
                "channel_id" => Some(delete.channel_id.into()),
                "guild_id" => delete.guild_id.map(Into::into),
                _ => None,
            },
            Self::ReactionAdd(reaction) | Self::ReactionRemove(reaction) => match key {
                "user_id" => Some(reaction.user_id.into()),
                "channel_id" => Some(reaction.channel_id.into()),
                "message_id" => Some(reaction.message_id.into()),
                "guild_id" => reaction.guild_id.map(Into::into),
                "emoji" => Some(reaction.emoji.reaction_form().into()),
                _ => None,
            },
            Self::TypingStart(typing) => match key {
                "user_id" => Some(typing.user_id.into()),
                "channel_id" => Some(typing.channel_id.into()),
                "guild_id" => typing.guild_id.map(Into::into),
                _ => None,
            },
            Self::PresenceUpdate(presence) => match key {
                "user_id" => Some(presence.user.id.into()),
                "guild_id" => presence.guild_id.map(Into::into),
                "status" => Some(presence.status.as_str().into()),
                _ => None,
            },
            Self::ChannelCreate(channel)
            | Self::ChannelUpdate(channel)
            | Self::ChannelDelete(channel) => match key {
                "channel_id" => Some(channel.id.into()),
                "guild_id" => channel.guild_id.map(Into::into),
                "name" => channel.name.as_deref().map(Into::into),
                "type" => Some(i64::from(channel.kind.as_u8()).into()),
                _ => None,
            },
            Self::GuildCreate(guild) | Self::GuildUpdate(guild) => match key {
                "guild_id" => Some(guild.id.into()),
                "name" => Some(guild.name.as_str().into()),
                "owner_id" => Some(guild.owner_id.into()),
                _ => None,
            },
            Self::GuildDelete(guild) => match key {
                "guild_id" => Some(guild.id.into()),
                "unavailable" => Some(guild.unavailable.into()),
                _ => None,
            },
            Self::GuildMemberAdd(add) => match key {
                "guild_id" => Some(add.guild_id.into()),
                "user_id" => add.member.user.as_ref().map(|u| u.id.into()),
                "user_name" => add.member.user.as_ref().map(|u| u.username.as_str().into()),
                _ => None,
            },
            Self::GuildMemberUpdate(update) => match key {
                "guild_id" => Some(update.guild_id.into()),
                "user_id" => Some(update.user.id.into()),
                "user_name" => Some(update.user.username.as_str().into()),
                "nick" => update.nick.as_deref().map(Into::into),
                _ => None,
            },
            Self::GuildMemberRemove(remove) => match key {
                "guild_id" => Some(remove.guild_id.into()),
                "user_id" => Some(remove.user.id.into()),
                "user_name" => Some(remove.user.username.as_str().into()),
                _ => None,
            },
            Self::VoiceStateUpdate(voice) => match key {
                "guild_id" => voice.guild_id.map(Into::into),
                "channel_id" => voice.channel_id.map(Into::into),
                "user_id" => Some(voice.user_id.into()),
                _ => None,
            },
            Self::Unknown { name, .. } => match key {
                "name" => Some(name.as_str().into()),
                _ => None,
            },
            Self::AwaitMatched { key: await_key, event } => match key {
                "key" => Some(await_key.as_str().into()),
                "kind" => Some(event.kind().name().into()),
                _ => None,
            },
            Self::Disconnected { code, terminal, .. } => match key {
                "code" => code.map(|c| i64::from(c).into()),
                "terminal" => Some((*terminal).into()),
                _ => None,
            },
            Self::Resumed => None,
        }
    }

    /// The message, for `MessageCreate` events
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::MessageCreate(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::Snowflake;
    use serde_json::json;

    fn message_create() -> Event {
        Event::decode(
            "MESSAGE_CREATE",
            json!({
                "id": "10",
                "channel_id": "20",
                "guild_id": "30",
                "author": {"id": "40", "username": "nelly"},
                "content": "!ping",
                "timestamp": "2024-01-01T00:00:00+00:00"
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_message_create() {
        let event = message_create();
        assert_eq!(event.kind(), EventKind::MessageCreate);
        assert_eq!(event.as_message().unwrap().content, "!ping");
    }

    #[test]
    fn test_decode_unknown_dispatch() {
        let event = Event::decode("INTERACTION_CREATE", json!({"id": "1"})).unwrap();
        assert_eq!(event.kind(), EventKind::Unknown);
        assert_eq!(event.attribute("name"), Some(AttrValue::from("INTERACTION_CREATE")));
    }

    #[test]
    fn test_decode_malformed_payload() {
        assert!(Event::decode("MESSAGE_CREATE", json!({"id": "x"})).is_err());
    }

    #[test]
    fn test_resumed_ignores_payload() {
        let event = Event::decode("RESUMED", Value::Null).unwrap();
        assert_eq!(event, Event::Resumed);
    }

    #[test]
    fn test_message_attributes() {
        let event = message_create();
        assert_eq!(event.attribute("content"), Some(AttrValue::from("!ping")));
        assert_eq!(
            event.attribute("channel_id"),
            Some(AttrValue::Id(Snowflake::new(20)))
        );
        assert_eq!(event.attribute("author_name"), Some(AttrValue::from("nelly")));
        assert_eq!(event.attribute("bot"), Some(AttrValue::Bool(false)));
        assert_eq!(event.attribute("status"), None);
    }

    #[test]
    fn test_reaction_attributes() {
        let event = Event::decode(
            "MESSAGE_REACTION_ADD",
            json!({
                "user_id": "1",
                "channel_id": "2",
                "message_id": "3",
                "emoji": {"id": "9", "name": "blob"}
            }),
        )
        .unwrap();

        assert_eq!(event.kind(), EventKind::ReactionAdd);
        assert_eq!(event.attribute("emoji"), Some(AttrValue::from("blob:9")));
        assert_eq!(event.attribute("guild_id"), None);
    }

    #[test]
    fn test_synthetic_event_attributes() {
        let matched = Event::AwaitMatched {
            key: "confirm".to_string(),
            event: Box::new(message_create()),
        };
        assert_eq!(matched.kind(), EventKind::AwaitMatched);
        assert_eq!(matched.attribute("key"), Some(AttrValue::from("confirm")));
        assert_eq!(matched.attribute("kind"), Some(AttrValue::from("MESSAGE_CREATE")));

        let disconnected = Event::Disconnected {
            code: Some(4004),
            reason: "Authentication failed".to_string(),
            terminal: true,
        };
        assert_eq!(disconnected.attribute("code"), Some(AttrValue::Int(4004)));
        assert_eq!(disconnected.attribute("terminal"), Some(AttrValue::Bool(true)));
    }
}
