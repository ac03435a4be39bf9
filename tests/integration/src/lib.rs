//! Integration test utilities
//!
//! Mock REST and gateway servers on ephemeral ports, driven through the real
//! `reqwest` and `tokio-tungstenite` transports.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
