//! Rate-limit buckets and header bookkeeping

use chat_core::Snowflake;
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::transport::HttpResponse;

/// Ceiling for any wait read from a response
pub const MAX_SERVER_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Seconds sent by the server as a wait, clamped to [`MAX_SERVER_WAIT`]
fn server_wait(seconds: f64) -> Option<Duration> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(Duration::try_from_secs_f64(seconds).map_or(MAX_SERVER_WAIT, |d| d.min(MAX_SERVER_WAIT)))
}

/// Identifies one rate-limit window: route family plus major parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    family: &'static str,
    major: Option<Snowflake>,
}

impl BucketKey {
    pub const fn new(family: &'static str, major: Option<Snowflake>) -> Self {
        Self { family, major }
    }

    /// A route without a major parameter
    pub const fn unscoped(family: &'static str) -> Self {
        Self::new(family, None)
    }

    pub const fn family(&self) -> &'static str {
        self.family
    }

    pub const fn major(&self) -> Option<Snowflake> {
        self.major
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.major {
            Some(major) => write!(f, "{}:{}", self.family, major),
            None => f.write_str(self.family),
        }
    }
}

/// Rate-limit headers of one response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitHeaders {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// Window reset, epoch seconds
    pub reset: Option<f64>,
    /// Window reset, seconds from now
    pub reset_after: Option<f64>,
    pub global: bool,
    /// Server clock at response time
    pub date: Option<DateTime<FixedOffset>>,
}

impl RateLimitHeaders {
    pub fn from_response(response: &HttpResponse) -> Self {
        fn number<T: std::str::FromStr>(response: &HttpResponse, name: &str) -> Option<T> {
            response.header(name).and_then(|v| v.trim().parse().ok())
        }

        Self {
            limit: number(response, "x-ratelimit-limit"),
            remaining: number(response, "x-ratelimit-remaining"),
            reset: number(response, "x-ratelimit-reset"),
            reset_after: number(response, "x-ratelimit-reset-after"),
            global: response
                .header("x-ratelimit-global")
                .is_some_and(|v| v.eq_ignore_ascii_case("true"))
                || response.header("x-ratelimit-scope") == Some("global"),
            date: response
                .header("date")
                .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok()),
        }
    }

    /// Time until the window resets, measured against the server's own clock
    pub fn until_reset(&self) -> Option<Duration> {
        let seconds = match (self.reset, self.date, self.reset_after) {
            (Some(reset), Some(date), _) => reset - date.timestamp_millis() as f64 / 1000.0,
            (_, _, Some(after)) => after,
            (Some(reset), None, None) => reset - Utc::now().timestamp_millis() as f64 / 1000.0,
            (None, _, None) => return None,
        };

        server_wait(seconds).filter(|wait| !wait.is_zero())
    }

    /// Wait needed before the next request, if this response exhausted the bucket
    pub fn exhausted_for(&self) -> Option<Duration> {
        if self.remaining == Some(0) {
            self.until_reset()
        } else {
            None
        }
    }
}

/// Body of a 429 response
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimited {
    pub retry_after: Duration,
    pub global: bool,
}

#[derive(serde::Deserialize)]
struct RateLimitedBody {
    retry_after: Option<f64>,
    #[serde(default)]
    global: bool,
}

impl RateLimited {
    const FALLBACK: Duration = Duration::from_secs(1);

    /// Read `retry_after` from the body, falling back to the `Retry-After` header
    pub fn from_response(response: &HttpResponse, headers: &RateLimitHeaders) -> Self {
        let body = serde_json::from_str::<RateLimitedBody>(&response.body).ok();

        let seconds = body
            .as_ref()
            .and_then(|b| b.retry_after)
            .or_else(|| {
                response
                    .header("retry-after")
                    .and_then(|v| v.trim().parse::<f64>().ok())
            })
            .or(headers.reset_after);

        let retry_after = seconds.and_then(server_wait).unwrap_or(Self::FALLBACK);

        Self {
            retry_after,
            global: headers.global || body.is_some_and(|b| b.global),
        }
    }
}

/// Mutable bookkeeping of one bucket, only touched by the lock holder
#[derive(Debug, Clone, Default)]
pub struct BucketState {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_at: Option<Instant>,
}

impl BucketState {
    /// Apply the headers of a response received at `now`
    pub fn record(&mut self, headers: &RateLimitHeaders, now: Instant) {
        if headers.limit.is_some() {
            self.limit = headers.limit;
        }
        if headers.remaining.is_some() {
            self.remaining = headers.remaining;
        }
        if let Some(reset_at) = headers.until_reset().and_then(|wait| now.checked_add(wait)) {
            self.reset_at = Some(reset_at);
        }
    }

    /// Wait still owed before this bucket may send again
    pub fn pending_wait(&self, now: Instant) -> Option<Duration> {
        match (self.remaining, self.reset_at) {
            (Some(0), Some(reset_at)) if reset_at > now => Some(reset_at - now),
            _ => None,
        }
    }

    /// The window has rolled over
    pub fn reset_window(&mut self) {
        self.remaining = self.limit;
        self.reset_at = None;
    }
}

/// One FIFO lock per bucket key. `tokio::sync::Mutex` queues waiters fairly,
/// so holders are served in submission order.
#[derive(Debug)]
pub struct RateLimitBucket {
    key: BucketKey,
    state: Mutex<BucketState>,
}

impl RateLimitBucket {
    pub fn new(key: BucketKey) -> Self {
        Self {
            key,
            state: Mutex::new(BucketState::default()),
        }
    }

    pub fn key(&self) -> &BucketKey {
        &self.key
    }

    /// Wait for this bucket's turn
    pub async fn acquire(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().await
    }

    /// Current remaining count, without waiting
    pub fn remaining(&self) -> Option<u32> {
        self.state.try_lock().ok().and_then(|s| s.remaining)
    }
}
