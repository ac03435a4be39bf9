//! REST integration tests
//!
//! Run with: cargo test -p integration-tests --test rest_tests

use std::time::Duration;

use chat_core::Snowflake;
use chat_rest::{ApiErrorCode, CreateMessage, GovernorConfig, RestError};
use integration_tests::{
    api_error_json, message_json, rate_limited_json, MockPlatform, ScriptedResponse,
};

const CHANNEL: Snowflake = Snowflake::new(42);

#[tokio::test]
async fn test_create_message_sends_auth_and_body() {
    let platform = MockPlatform::start().await.unwrap();
    let rest = platform.rest_client().unwrap();

    let message = rest
        .create_message(CHANNEL, &CreateMessage::text("hello"))
        .await
        .unwrap();
    assert_eq!(message.content, "hello");
    assert_eq!(message.channel_id, CHANNEL);

    let requests = platform.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/channels/42/messages");
    assert_eq!(request.header("authorization"), Some("Bot integration-token"));
    assert!(request
        .header("user-agent")
        .is_some_and(|ua| ua.starts_with("DiscordBot (")));
    assert!(request
        .header("content-type")
        .is_some_and(|ct| ct.starts_with("application/json")));
    assert!(request.body.contains(r#""content":"hello""#));
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let platform = MockPlatform::start().await.unwrap();
    platform.script([
        ScriptedResponse::new(429, rate_limited_json(0.01, false)),
        ScriptedResponse::new(429, rate_limited_json(0.01, false)),
    ]);
    let rest = platform.rest_client().unwrap();

    let message = rest
        .create_message(CHANNEL, &CreateMessage::text("third time"))
        .await
        .unwrap();
    assert_eq!(message.content, "third time");
    assert_eq!(platform.requests().len(), 3);
}

#[tokio::test]
async fn test_rate_limit_retries_are_bounded() {
    let platform = MockPlatform::start().await.unwrap();
    platform.script((0..5).map(|_| ScriptedResponse::new(429, rate_limited_json(0.01, false))));
    let rest = platform
        .rest_client_with(GovernorConfig {
            max_rate_limit_retries: 2,
            ..GovernorConfig::default()
        })
        .unwrap();

    let err = rest
        .create_message(CHANNEL, &CreateMessage::text("never"))
        .await
        .unwrap_err();
    assert!(matches!(err, RestError::RateLimitExhausted { .. }));
    assert_eq!(platform.requests().len(), 3);
}

#[tokio::test]
async fn test_fatal_status_returns_typed_error() {
    let platform = MockPlatform::start().await.unwrap();
    platform.script([ScriptedResponse::new(
        404,
        api_error_json(10003, "Unknown Channel"),
    )]);
    let rest = platform.rest_client().unwrap();

    let err = rest
        .create_message(CHANNEL, &CreateMessage::text("lost"))
        .await
        .unwrap_err();
    match err {
        RestError::Api(api) => {
            assert_eq!(api.status, 404);
            assert_eq!(api.code, ApiErrorCode::UnknownChannel);
            assert_eq!(api.message, "Unknown Channel");
        }
        other => panic!("expected an API error, got {other:?}"),
    }
    assert_eq!(platform.requests().len(), 1);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let platform = MockPlatform::start().await.unwrap();
    platform.script([ScriptedResponse::new(
        502,
        serde_json::json!({"message": "bad gateway"}),
    )]);
    let rest = platform.rest_client().unwrap();

    rest.create_message(CHANNEL, &CreateMessage::text("after 502"))
        .await
        .unwrap();
    assert_eq!(platform.requests().len(), 2);
}

#[tokio::test]
async fn test_exhausted_bucket_throttles_next_request() {
    let platform = MockPlatform::start().await.unwrap();
    platform.script([ScriptedResponse::new(200, message_json(1, 42, "first"))
        .header("X-RateLimit-Limit", "5")
        .header("X-RateLimit-Remaining", "0")
        .header("X-RateLimit-Reset-After", "0.5")]);
    let rest = platform.rest_client().unwrap();

    rest.create_message(CHANNEL, &CreateMessage::text("first"))
        .await
        .unwrap();
    rest.create_message(CHANNEL, &CreateMessage::text("second"))
        .await
        .unwrap();

    let requests = platform.requests();
    assert_eq!(requests.len(), 2);
    let gap = requests[1].at.duration_since(requests[0].at);
    assert!(gap >= Duration::from_millis(450), "second request after {gap:?}");
}

#[tokio::test]
async fn test_get_gateway() {
    let platform = MockPlatform::start().await.unwrap();
    let rest = platform.rest_client().unwrap();

    let info = rest.get_gateway().await.unwrap();
    assert_eq!(info.url, platform.gateway_url());
}
