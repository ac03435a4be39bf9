//! Connection bookkeeping
//!
//! Session, heartbeat and reconnect state for a single gateway connection.

mod backoff;
mod heartbeat;
mod session;
mod state;

pub use backoff::Backoff;
pub use heartbeat::{HeartbeatScheduler, HeartbeatState};
pub use session::SessionState;
pub use state::{ConnectionState, GatewayStatus};
