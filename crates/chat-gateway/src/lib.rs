//! # chat-gateway
//!
//! Real-time gateway client: connects, identifies or resumes, keeps the
//! heartbeat going and hands every dispatch to a [`Dispatcher`].

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod protocol;
pub mod transport;

pub use client::{EndpointResolver, GatewayClient, GatewayOptions, StaticEndpoint};
pub use connection::{ConnectionState, GatewayStatus};
pub use dispatch::{AwaitOutcome, Dispatcher, DispatcherConfig, Matcher, Predicate, Registration};
pub use error::{GatewayError, GatewayResult};
pub use events::{AttrValue, Event, EventKind};
pub use protocol::{GatewayMessage, Intents, OpCode};
pub use transport::{Compression, ConnectionTransport, WebSocketTransport};
