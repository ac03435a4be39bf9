//! Connection state published to observers

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Where the runner is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    /// Opening the transport
    Connecting,
    /// Transport open, Hello received, Identify or Resume sent
    Handshaking,
    Ready,
    /// Stopped for good
    Terminated,
}

impl ConnectionState {
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Ready => "ready",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Snapshot of the gateway connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayStatus {
    pub state: ConnectionState,
    pub session_id: Option<String>,
    pub sequence: Option<u64>,
    /// Last heartbeat round trip
    pub latency: Option<Duration>,
    /// Successful reconnects since the client started
    pub reconnects: u32,
}

impl Default for GatewayStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            session_id: None,
            sequence: None,
            latency: None,
            reconnects: 0,
        }
    }
}
