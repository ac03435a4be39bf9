//! In-memory transport
//!
//! Every `connect` creates a channel pair and hands the server half to the
//! [`MemoryListener`], so a test can play the gateway side frame by frame.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{Connection, ConnectionTransport, Frame, FrameSink, FrameStream, TransportError};
use crate::protocol::GatewayMessage;

/// Client side of the in-memory transport
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    refuse: Arc<AtomicUsize>,
}

/// Receives the server half of each connection
#[derive(Debug)]
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Server half of one connection
#[derive(Debug)]
pub struct MemoryPeer {
    url: String,
    to_client: mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                peers: tx,
                refuse: Arc::new(AtomicUsize::new(0)),
            },
            MemoryListener { peers: rx },
        )
    }

    /// Fail the next `count` connection attempts
    pub fn refuse_next(&self, count: usize) {
        self.refuse.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectionTransport for MemoryTransport {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let (to_client, client_rx) = mpsc::unbounded_channel();
        let (client_tx, from_client) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            url: url.to_string(),
            to_client,
            from_client,
        };
        self.peers.send(peer).map_err(|_| TransportError::Connect {
            url: url.to_string(),
            reason: "listener dropped".to_string(),
        })?;

        Ok((
            Box::new(MemorySink { tx: client_tx }),
            Box::new(MemoryStream { rx: client_rx }),
        ))
    }
}

impl MemoryListener {
    /// Wait for the next connection
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }
}

impl MemoryPeer {
    /// URL the client connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn send(&self, frame: Frame) -> bool {
        self.to_client.send(frame).is_ok()
    }

    /// Send an envelope as a text frame
    pub fn send_message(&self, message: &GatewayMessage) -> bool {
        match message.to_json() {
            Ok(json) => self.send(Frame::Text(json)),
            Err(_) => false,
        }
    }

    pub fn close(&self, code: u16) -> bool {
        self.send(Frame::close(code, ""))
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Next envelope from the client, skipping frames that are not JSON text
    pub async fn recv_message(&mut self) -> Option<GatewayMessage> {
        loop {
            match self.from_client.recv().await? {
                Frame::Text(text) => {
                    if let Ok(message) = GatewayMessage::from_slice(text.as_bytes()) {
                        return Some(message);
                    }
                }
                Frame::Close { .. } => return None,
                Frame::Binary(_) => {}
            }
        }
    }
}

struct MemorySink {
    tx: mpsc::UnboundedSender<Frame>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

struct MemoryStream {
    rx: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl FrameStream for MemoryStream {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}
