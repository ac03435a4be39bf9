//! Guild - a community with channels, roles, and members

use serde::{Deserialize, Serialize};

use super::{Channel, Member, Role};
use crate::value_objects::Snowflake;

/// Guild as delivered by the API or a GUILD_CREATE event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub owner_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Guild {
    /// Find a channel by ID
    pub fn channel(&self, id: Snowflake) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Find a role by ID
    pub fn role(&self, id: Snowflake) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }
}

/// Guild placeholder sent in READY or during an outage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}
