//! Attribute values exposed by events for predicate matching

use chat_core::Snowflake;
use std::fmt;

/// A typed field value read from an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Id(Snowflake),
    Bool(bool),
}

impl AttrValue {
    /// Text form, used by prefix and regex matchers
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Str(s) => std::borrow::Cow::Borrowed(s),
            Self::Int(i) => std::borrow::Cow::Owned(i.to_string()),
            Self::Id(id) => std::borrow::Cow::Owned(id.to_string()),
            Self::Bool(b) => std::borrow::Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }

    /// Integer form, used by range matchers
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Id(id) => i64::try_from(id.get()).ok(),
            Self::Str(s) => s.parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Equality that treats an id and its decimal string as the same value
    pub fn loosely_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Id(id), Self::Str(s)) | (Self::Str(s), Self::Id(id)) => {
                Snowflake::parse(s).is_ok_and(|parsed| parsed == *id)
            }
            (Self::Id(id), Self::Int(i)) | (Self::Int(i), Self::Id(id)) => {
                u64::try_from(*i).is_ok_and(|i| i == id.get())
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Snowflake> for AttrValue {
    fn from(value: Snowflake) -> Self {
        Self::Id(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
