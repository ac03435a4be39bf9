//! User - a chat account, human or bot

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// User as delivered by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Name to show in a UI: global display name if set, otherwise the username
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }

    /// Get the legacy tag: username#discriminator (username alone for migrated accounts)
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if d != "0" => format!("{}#{}", self.username, d),
            _ => self.username.clone(),
        }
    }

    /// Mention string, e.g. `<@1234>`
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}
