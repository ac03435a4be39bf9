//! Wire data containers delivered by the REST API and gateway events

mod channel;
mod guild;
mod member;
mod message;
mod presence;
mod reaction;
mod role;
mod user;

pub use channel::{Channel, ChannelType};
pub use guild::{Guild, UnavailableGuild};
pub use member::Member;
pub use message::{Attachment, Message};
pub use presence::{Activity, ActivityType, Status};
pub use reaction::Emoji;
pub use role::Role;
pub use user::User;
