//! # chat-common
//!
//! Shared utilities: environment-driven configuration and telemetry.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    ApiConfig, ClientConfig, CompressionSetting, ConfigError, DispatchConfig, GatewaySettings,
    RateLimitSettings,
};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
