//! Echo bot
//!
//! Replies to `!echo <text>` with `<text>`.
//!
//! Run with:
//! ```bash
//! CHAT_TOKEN=... cargo run -p chat-client --bin chat-echo
//! ```

use chat_client::{Client, ClientOptions, Credentials, Event, EventKind, Predicate};
use chat_common::{try_init_tracing, ClientConfig};
use chat_rest::CreateMessage;
use std::sync::Arc;
use tracing::{error, info};

const PREFIX: &str = "!echo ";

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Echo bot stopped");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ClientConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        shard = config.gateway.shard_id,
        shards = config.gateway.shard_count,
        "Configuration loaded"
    );

    let client = Client::new(&Credentials::from(&config), ClientOptions::from(&config))?;

    let rest = client.rest().clone();
    client.on(
        EventKind::MessageCreate,
        Predicate::default().prefix("content", PREFIX),
        move |event: Arc<Event>| {
            let rest = rest.clone();
            async move {
                let Some(message) = event.as_message() else {
                    return Ok(());
                };
                if message.author.bot {
                    return Ok(());
                }
                let text = message.content.trim_start_matches(PREFIX);
                rest.create_message(message.channel_id, &CreateMessage::text(text))
                    .await?;
                Ok(())
            }
        },
    );

    client.on(
        EventKind::Disconnected,
        Predicate::default().equals("terminal", true),
        |event: Arc<Event>| async move {
            error!(?event, "Gateway closed for good");
            Ok(())
        },
    );

    client.start().await?;
    info!("Echo bot ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    client.disconnect().await?;
    Ok(())
}
