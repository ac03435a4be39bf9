//! Request governor
//!
//! Every REST call runs through [`RequestGovernor::execute`]:
//!
//! 1. take the bucket's FIFO lock (held until the call returns)
//! 2. wait out the global lock if a global rate limit is in force
//! 3. send, then record the rate-limit headers
//! 4. on 429 sleep `retry_after` (under the global write lock if global) and retry
//! 5. on a fatal status decode the error body and return it
//! 6. on other failures retry a bounded number of times
//! 7. before releasing the bucket, sleep until reset if the window is exhausted

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use super::bucket::{BucketKey, BucketState, RateLimitBucket, RateLimitHeaders, RateLimited};
use crate::error::{ApiError, RestError, RestResult};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Retry bounds and status classification
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// 429 responses tolerated per call before giving up
    pub max_rate_limit_retries: u32,
    /// Transport failures and 5xx responses tolerated per call
    pub max_transient_retries: u32,
    /// Statuses decoded into an error and never retried
    pub fatal_statuses: Vec<u16>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 5,
            max_transient_retries: 3,
            fatal_statuses: vec![400, 401, 403, 404, 500],
        }
    }
}

impl GovernorConfig {
    /// Fatal: the configured set plus every other 4xx except 429
    pub fn is_fatal(&self, status: u16) -> bool {
        self.fatal_statuses.contains(&status) || ((400..500).contains(&status) && status != 429)
    }
}

/// Owns the bucket table and the global lock
pub struct RequestGovernor {
    transport: Arc<dyn HttpTransport>,
    buckets: DashMap<BucketKey, Arc<RateLimitBucket>>,
    global: RwLock<()>,
    config: GovernorConfig,
}

impl RequestGovernor {
    pub fn new(transport: Arc<dyn HttpTransport>, config: GovernorConfig) -> Self {
        Self {
            transport,
            buckets: DashMap::new(),
            global: RwLock::new(()),
            config,
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Number of buckets created so far
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Get or lazily create the bucket for `key`
    pub fn bucket(&self, key: &BucketKey) -> Arc<RateLimitBucket> {
        self.buckets
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RateLimitBucket::new(key.clone())))
            .clone()
    }

    /// Execute a request under the rate limits of `key`
    pub async fn execute(&self, key: &BucketKey, request: HttpRequest) -> RestResult<HttpResponse> {
        let bucket = self.bucket(key);
        let mut state = bucket.acquire().await;

        // A previous holder may have been cancelled mid-throttle
        self.throttle(key, &mut state).await;

        let mut rate_limited = 0u32;
        let mut transient = 0u32;

        loop {
            // Blocks while a global limit holds the write side
            drop(self.global.read().await);

            trace!(bucket = %key, method = %request.method, url = %request.url, "Sending request");

            let response = match self.transport.execute(&request).await {
                Ok(response) => response,
                Err(e) => {
                    transient += 1;
                    if transient > self.config.max_transient_retries {
                        warn!(bucket = %key, attempts = transient, error = %e, "Giving up on request");
                        return Err(RestError::Transport(e));
                    }
                    warn!(bucket = %key, attempt = transient, error = %e, "Request failed, retrying");
                    continue;
                }
            };

            let headers = RateLimitHeaders::from_response(&response);
            state.record(&headers, Instant::now());

            if response.status == 429 {
                rate_limited += 1;
                if rate_limited > self.config.max_rate_limit_retries {
                    warn!(bucket = %key, attempts = rate_limited, "Rate limit retries exhausted");
                    return Err(RestError::RateLimitExhausted {
                        bucket: key.clone(),
                        attempts: rate_limited,
                    });
                }

                let limited = RateLimited::from_response(&response, &headers);
                if limited.global {
                    warn!(
                        bucket = %key,
                        retry_after_ms = limited.retry_after.as_millis() as u64,
                        "Global rate limit hit, locking all buckets"
                    );
                    let _global = self.global.write().await;
                    sleep(limited.retry_after).await;
                } else {
                    warn!(
                        bucket = %key,
                        retry_after_ms = limited.retry_after.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                    sleep(limited.retry_after).await;
                }
                state.reset_window();
                continue;
            }

            if response.is_success() {
                self.throttle(key, &mut state).await;
                return Ok(response);
            }

            if self.config.is_fatal(response.status) {
                let error = ApiError::from_response(&response);
                debug!(bucket = %key, status = response.status, code = error.code.as_u32(), "API error");
                self.throttle(key, &mut state).await;
                return Err(RestError::Api(error));
            }

            transient += 1;
            if transient > self.config.max_transient_retries {
                warn!(bucket = %key, status = response.status, attempts = transient, "Giving up on request");
                self.throttle(key, &mut state).await;
                return Err(RestError::TransientExhausted {
                    status: response.status,
                    attempts: transient,
                });
            }
            warn!(bucket = %key, status = response.status, attempt = transient, "Server error, retrying");
        }
    }

    /// Preemptive throttle: sleep out an exhausted window while still holding the bucket
    async fn throttle(&self, key: &BucketKey, state: &mut BucketState) {
        if let Some(wait) = state.pending_wait(Instant::now()) {
            debug!(bucket = %key, wait_ms = wait.as_millis() as u64, "Bucket exhausted, waiting for reset");
            sleep(wait).await;
            state.reset_window();
        }
    }
}

impl std::fmt::Debug for RequestGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGovernor")
            .field("buckets", &self.buckets.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorCode;
    use crate::transport::{Method, TransportError};
    use async_trait::async_trait;
    use chat_core::Snowflake;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays scripted responses per URL; unscripted calls answer 200 `{}`
    #[derive(Default)]
    struct ScriptedTransport {
        scripts: Mutex<HashMap<String, VecDeque<Result<HttpResponse, TransportError>>>>,
        calls: Mutex<Vec<(String, Instant)>>,
        latency: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedTransport {
        fn with_latency(latency: Duration) -> Self {
            Self {
                latency,
                ..Self::default()
            }
        }

        fn script(&self, url: &str, responses: Vec<Result<HttpResponse, TransportError>>) {
            self.scripts
                .lock()
                .entry(url.to_string())
                .or_default()
                .extend(responses);
        }

        fn calls(&self) -> Vec<(String, Instant)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.lock().push((request.url.clone(), Instant::now()));
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            if !self.latency.is_zero() {
                sleep(self.latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.scripts
                .lock()
                .get_mut(&request.url)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(HttpResponse::new(200, "{}")))
        }
    }

    fn governor(transport: &Arc<ScriptedTransport>, config: GovernorConfig) -> Arc<RequestGovernor> {
        Arc::new(RequestGovernor::new(transport.clone(), config))
    }

    fn get(url: &str) -> HttpRequest {
        HttpRequest::new(Method::Get, url)
    }

    fn channel_key(id: u64) -> BucketKey {
        BucketKey::new("channels/messages", Some(Snowflake::new(id)))
    }

    fn too_many(retry_after: f64, global: bool) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(
            429,
            format!(r#"{{"message": "slow down", "retry_after": {retry_after}, "global": {global}}}"#),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_bucket_is_fifo() {
        let transport = Arc::new(ScriptedTransport::with_latency(Duration::from_millis(10)));
        let governor = governor(&transport, GovernorConfig::default());
        let key = channel_key(1);

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let governor = governor.clone();
                let key = key.clone();
                tokio::spawn(async move { governor.execute(&key, get(&format!("/r/{i}"))).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let urls: Vec<String> = transport.calls().into_iter().map(|(url, _)| url).collect();
        assert_eq!(urls, vec!["/r/0", "/r/1", "/r/2", "/r/3", "/r/4"]);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(governor.bucket_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_buckets_run_in_parallel() {
        let transport = Arc::new(ScriptedTransport::with_latency(Duration::from_millis(10)));
        let governor = governor(&transport, GovernorConfig::default());

        let a = {
            let governor = governor.clone();
            tokio::spawn(async move { governor.execute(&channel_key(1), get("/a")).await })
        };
        let b = {
            let governor = governor.clone();
            tokio::spawn(async move { governor.execute(&channel_key(2), get("/b")).await })
        };

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 2);
        assert_eq!(governor.bucket_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preemptive_throttle_waits_for_reset() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(
            "/first",
            vec![Ok(HttpResponse::new(200, "{}")
                .with_header("X-RateLimit-Limit", "1")
                .with_header("X-RateLimit-Remaining", "0")
                .with_header("X-RateLimit-Reset", "1704067202")
                .with_header("Date", "Mon, 01 Jan 2024 00:00:00 GMT"))],
        );
        let governor = governor(&transport, GovernorConfig::default());
        let key = channel_key(7);

        let first = {
            let governor = governor.clone();
            let key = key.clone();
            tokio::spawn(async move { governor.execute(&key, get("/first")).await })
        };
        let second = {
            let governor = governor.clone();
            let key = key.clone();
            tokio::spawn(async move { governor.execute(&key, get("/second")).await })
        };

        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].1 - calls[0].1 >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_retries_until_success() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(
            "/limited",
            vec![
                too_many(0.01, false),
                too_many(0.01, false),
                Ok(HttpResponse::new(200, r#"{"ok": true}"#)),
            ],
        );
        let governor = governor(&transport, GovernorConfig::default());

        let response = governor.execute(&channel_key(1), get("/limited")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"ok": true}"#);
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absurd_retry_after_is_clamped() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script("/limited", vec![too_many(1e20, false)]);
        let governor = governor(&transport, GovernorConfig::default());

        let handle = {
            let governor = governor.clone();
            tokio::spawn(async move { governor.execute(&channel_key(1), get("/limited")).await })
        };
        let response = handle.await.expect("governor task panicked").unwrap();

        assert_eq!(response.status, 200);
        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].1 - calls[0].1 >= crate::ratelimit::MAX_SERVER_WAIT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_retries_are_bounded() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script("/limited", (0..10).map(|_| too_many(0.01, false)).collect());
        let config = GovernorConfig {
            max_rate_limit_retries: 2,
            ..GovernorConfig::default()
        };
        let governor = governor(&transport, config);

        let err = governor.execute(&channel_key(1), get("/limited")).await.unwrap_err();

        assert!(matches!(err, RestError::RateLimitExhausted { attempts: 3, .. }));
        assert!(err.is_retryable());
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_limit_freezes_other_buckets() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script("/a", vec![too_many(1.0, true)]);
        let governor = governor(&transport, GovernorConfig::default());

        let start = Instant::now();
        let a = {
            let governor = governor.clone();
            tokio::spawn(async move { governor.execute(&channel_key(1), get("/a")).await })
        };
        let b = {
            let governor = governor.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(100)).await;
                governor.execute(&channel_key(2), get("/b")).await
            })
        };

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());

        let calls = transport.calls();
        let b_call = calls.iter().find(|(url, _)| url == "/b").unwrap();
        assert!(b_call.1 - start >= Duration::from_secs(1));
        assert_eq!(calls.iter().filter(|(url, _)| url == "/a").count(), 2);
    }

    #[tokio::test]
    async fn test_fatal_status_is_decoded_without_retry() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(
            "/forbidden",
            vec![Ok(HttpResponse::new(
                403,
                r#"{"code": 50013, "message": "Missing Permissions"}"#,
            ))],
        );
        let governor = governor(&transport, GovernorConfig::default());

        let err = governor.execute(&channel_key(1), get("/forbidden")).await.unwrap_err();

        match err {
            RestError::Api(api) => {
                assert_eq!(api.status, 403);
                assert_eq!(api.code, ApiErrorCode::MissingPermissions);
                assert_eq!(api.message, "Missing Permissions");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_500_is_fatal_but_502_is_transient() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script("/500", vec![Ok(HttpResponse::new(500, ""))]);
        transport.script(
            "/502",
            vec![
                Ok(HttpResponse::new(502, "bad gateway")),
                Ok(HttpResponse::new(200, "{}")),
            ],
        );
        let governor = governor(&transport, GovernorConfig::default());

        let err = governor.execute(&channel_key(1), get("/500")).await.unwrap_err();
        assert!(matches!(err, RestError::Api(ref api) if api.status == 500));

        let response = governor.execute(&channel_key(1), get("/502")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_transient_retries_are_bounded() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(
            "/flaky",
            (0..10).map(|_| Ok(HttpResponse::new(502, ""))).collect(),
        );
        let governor = governor(&transport, GovernorConfig::default());

        let err = governor.execute(&channel_key(1), get("/flaky")).await.unwrap_err();

        assert!(matches!(
            err,
            RestError::TransientExhausted {
                status: 502,
                attempts: 4
            }
        ));
        assert_eq!(transport.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_aborted_request_is_retried() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.script(
            "/abort",
            vec![Err(TransportError::Aborted("connection reset".to_string()))],
        );
        let governor = governor(&transport, GovernorConfig::default());

        let response = governor.execute(&channel_key(1), get("/abort")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.calls().len(), 2);
    }

    #[test]
    fn test_fatal_classification() {
        let config = GovernorConfig::default();
        assert!(config.is_fatal(400));
        assert!(config.is_fatal(404));
        assert!(config.is_fatal(405));
        assert!(config.is_fatal(500));
        assert!(!config.is_fatal(429));
        assert!(!config.is_fatal(502));
    }
}
