//! # chat-core
//!
//! Wire data containers shared by the REST client and the gateway.
//! This crate has zero dependencies on networking or runtime crates.

pub mod entities;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Activity, ActivityType, Attachment, Channel, ChannelType, Emoji, Guild, Member, Message,
    Role, Status, UnavailableGuild, User,
};
pub use value_objects::{parse_mentions, Mention, Snowflake, SnowflakeParseError};
