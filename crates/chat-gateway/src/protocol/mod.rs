//! Gateway protocol definitions
//!
//! Op codes, close codes, the frame envelope, control payloads and intents.

mod close_codes;
mod intents;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use intents::Intents;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{
    HelloPayload, IdentifyPayload, IdentifyProperties, PresenceUpdatePayload,
    RequestGuildMembersPayload, ResumePayload, VoiceStateUpdatePayload,
};

/// Gateway protocol version requested in the URL
pub const GATEWAY_VERSION: u8 = 10;
