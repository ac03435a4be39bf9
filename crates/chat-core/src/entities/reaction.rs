//! Emoji used in reactions

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Emoji, either a unicode character (no ID) or a custom guild emoji
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

impl Emoji {
    /// Create a unicode emoji
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            animated: false,
        }
    }

    /// Create a custom emoji
    pub fn custom(name: impl Into<String>, id: Snowflake) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
            animated: false,
        }
    }

    /// Form used in reaction routes: `name:id` for custom emoji, the character otherwise
    pub fn reaction_form(&self) -> String {
        let name = self.name.as_deref().unwrap_or_default();
        match self.id {
            Some(id) => format!("{name}:{id}"),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_form() {
        assert_eq!(Emoji::unicode("👍").reaction_form(), "👍");
        assert_eq!(
            Emoji::custom("blob", Snowflake::new(42)).reaction_form(),
            "blob:42"
        );
    }
}
