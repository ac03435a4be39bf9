//! # chat-client
//!
//! One handle for a bot: the rate-limited REST client plus the gateway session,
//! with handler registration over a shared dispatcher.

pub mod client;
pub mod error;
pub mod options;
pub mod resolver;

pub use client::Client;
pub use error::{ClientError, ClientResult};
pub use options::{ClientOptions, Credentials};
pub use resolver::RestEndpoint;

pub use chat_gateway::{Event, EventKind, Predicate};
