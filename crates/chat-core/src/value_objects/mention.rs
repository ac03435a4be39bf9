//! Mention markup in message text
//!
//! `<@id>` and `<@!id>` name a user, `<@&id>` a role, `<#id>` a channel, and
//! `<:name:id>` / `<a:name:id>` a custom emoji. Ids must be all digits.

use std::fmt;

use super::Snowflake;

/// One mention found in message content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mention {
    User(Snowflake),
    Role(Snowflake),
    Channel(Snowflake),
    Emoji {
        name: String,
        id: Snowflake,
        animated: bool,
    },
}

impl Mention {
    /// Parse the text between `<` and `>`
    pub fn parse_inner(inner: &str) -> Option<Self> {
        if let Some(rest) = inner.strip_prefix('@') {
            if let Some(id) = rest.strip_prefix('&') {
                return parse_id(id).map(Self::Role);
            }
            let id = rest.strip_prefix('!').unwrap_or(rest);
            return parse_id(id).map(Self::User);
        }

        if let Some(id) = inner.strip_prefix('#') {
            return parse_id(id).map(Self::Channel);
        }

        let (animated, rest) = match inner.strip_prefix("a:") {
            Some(rest) => (true, rest),
            None => (false, inner.strip_prefix(':')?),
        };
        let (name, id) = rest.split_once(':')?;
        if name.is_empty() {
            return None;
        }
        Some(Self::Emoji {
            name: name.to_string(),
            id: parse_id(id)?,
            animated,
        })
    }

    pub fn id(&self) -> Snowflake {
        match self {
            Self::User(id) | Self::Role(id) | Self::Channel(id) | Self::Emoji { id, .. } => *id,
        }
    }
}

impl fmt::Display for Mention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "<@{id}>"),
            Self::Role(id) => write!(f, "<@&{id}>"),
            Self::Channel(id) => write!(f, "<#{id}>"),
            Self::Emoji {
                name,
                id,
                animated,
            } => {
                let prefix = if *animated { "a" } else { "" };
                write!(f, "<{prefix}:{name}:{id}>")
            }
        }
    }
}

fn parse_id(digits: &str) -> Option<Snowflake> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok().map(Snowflake::new)
}

/// Every well-formed mention in `text`, in order of appearance.
///
/// Each `>` closes the nearest `<` before it; malformed markup is skipped.
pub fn parse_mentions(text: &str) -> Vec<Mention> {
    let mut mentions = Vec::new();
    let mut rest = text;

    while let Some(close) = rest.find('>') {
        let head = &rest[..close];
        if let Some(open) = head.rfind('<') {
            if let Some(mention) = Mention::parse_inner(&head[open + 1..]) {
                mentions.push(mention);
            }
        }
        rest = &rest[close + 1..];
    }

    mentions
}
