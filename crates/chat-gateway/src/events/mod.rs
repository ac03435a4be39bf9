//! Gateway events
//!
//! Typed dispatch events, their kinds, and the attributes predicates match on.

mod attribute;
mod event;
mod event_types;
mod payloads;

pub use attribute::AttrValue;
pub use event::Event;
pub use event_types::EventKind;
pub use payloads::{
    GuildMemberAddEvent, GuildMemberRemoveEvent, GuildMemberUpdateEvent, MessageDeleteEvent,
    MessageUpdateEvent, PartialUser, PresenceUpdateEvent, ReactionEvent, ReadyEvent,
    TypingStartEvent, VoiceStateEvent,
};
