//! Role - a named permission set inside a guild

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Role as delivered by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub position: i32,
    /// Permission bit set, serialized as a string
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
}

impl Role {
    /// Mention string, e.g. `<@&1234>`
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}
