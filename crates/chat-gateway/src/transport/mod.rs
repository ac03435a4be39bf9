//! Connection transport
//!
//! The gateway runner talks to the network only through [`ConnectionTransport`],
//! which opens a duplex frame channel. [`WebSocketTransport`] is the real
//! implementation; [`MemoryTransport`] backs protocol tests.

mod inflate;
mod memory;
mod websocket;

pub use inflate::{Compression, Inflater, MAX_MESSAGE_SIZE, ZLIB_SUFFIX};
pub use memory::{MemoryListener, MemoryPeer, MemoryTransport};
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use thiserror::Error;

/// A single transport frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close { code: Option<u16>, reason: String },
}

impl Frame {
    /// Close frame with a code
    pub fn close(code: u16, reason: impl Into<String>) -> Self {
        Self::Close {
            code: Some(code),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("websocket error: {0}")]
    WebSocket(#[source] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("connection closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Outbound half of a connection
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;
}

/// Inbound half of a connection
#[async_trait]
pub trait FrameStream: Send {
    /// Next frame, or `None` once the peer is gone
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// An opened connection, split into halves
pub type Connection = (Box<dyn FrameSink>, Box<dyn FrameStream>);

/// Opens gateway connections
#[async_trait]
pub trait ConnectionTransport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError>;
}
