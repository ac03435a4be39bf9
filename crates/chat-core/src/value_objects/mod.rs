//! Value objects - immutable types shared by every wire model

mod mention;
mod snowflake;

pub use mention::{parse_mentions, Mention};
pub use snowflake::{Snowflake, SnowflakeParseError};
