//! # chat-rest
//!
//! REST surface of the chat platform. Every outbound call goes through the
//! [`RequestGovernor`], which serializes requests per rate-limit bucket, honours
//! the global limit, throttles preemptively, and retries 429s and transient failures.

pub mod client;
pub mod error;
pub mod models;
pub mod ratelimit;
pub mod routes;
pub mod transport;

pub use client::{RestClient, RestConfig};
pub use error::{ApiError, ApiErrorCode, RestError, RestResult};
pub use models::{CreateMessage, EditMessage, GatewayBotInfo, GatewayInfo, SessionStartLimit};
pub use ratelimit::{BucketKey, GovernorConfig, RateLimitBucket, RateLimitHeaders, RequestGovernor};
pub use routes::{RequestSpec, Route};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, TransportError,
};
