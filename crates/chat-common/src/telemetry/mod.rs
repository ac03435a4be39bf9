//! Logging setup
//!
//! Library crates log through `tracing` only. Binaries pick a subscriber with
//! one of the initializers below; `RUST_LOG` overrides the configured level.

mod tracing_setup;

pub use tracing_setup::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
