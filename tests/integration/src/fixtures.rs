//! Test fixtures and payload builders

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique ids
static COUNTER: AtomicU64 = AtomicU64::new(1000);

/// Get a unique id for test data
pub fn unique_id() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

pub const TEST_TOKEN: &str = "integration-token";

/// A user object as the API returns it
pub fn user_json(id: u64, username: &str, bot: bool) -> Value {
    json!({
        "id": id.to_string(),
        "username": username,
        "bot": bot,
    })
}

/// A message object as the API returns it
pub fn message_json(id: u64, channel_id: u64, content: &str) -> Value {
    json!({
        "id": id.to_string(),
        "channel_id": channel_id.to_string(),
        "author": user_json(2, "alice", false),
        "content": content,
        "timestamp": "2024-01-01T00:00:00+00:00",
    })
}

/// `d` of a READY dispatch
pub fn ready_json(session_id: &str, resume_url: Option<&str>) -> Value {
    let mut ready = json!({
        "v": 10,
        "user": user_json(1, "bot", true),
        "guilds": [],
        "session_id": session_id,
    });
    if let Some(url) = resume_url {
        ready["resume_gateway_url"] = Value::String(url.to_string());
    }
    ready
}

/// Body of an API error response
pub fn api_error_json(code: u32, message: &str) -> Value {
    json!({ "code": code, "message": message })
}

/// Body of a 429 response
pub fn rate_limited_json(retry_after: f64, global: bool) -> Value {
    json!({
        "message": "You are being rate limited.",
        "retry_after": retry_after,
        "global": global,
    })
}
