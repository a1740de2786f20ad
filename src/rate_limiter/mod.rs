/*!
 * # Rate Limiting Module
 *
 * Advisory, in-memory rate limiting for the API. Every client address gets a
 * fixed window per tier, and the tier follows the cost of the operation:
 *
 * - `read`: any `GET`/`HEAD`
 * - `stock`: `POST .../increase`, `.../decrease`, `.../transfer`
 * - `write`: every other mutating request
 *
 * Admitted and rejected responses both carry `X-RateLimit-Limit`,
 * `X-RateLimit-Remaining` and `X-RateLimit-Reset`. Health and documentation
 * paths are never limited.
 *
 * ## Usage
 *
 * ```ignore
 * let limiter = RateLimiter::new(RateLimitConfig::from(&app_config));
 * let app = Router::new()
 *     .route("/", get(handler))
 *     .layer(RateLimitLayer::new(limiter));
 * ```
 */
use axum::{
    extract::{ConnectInfo, Request},
    http::{Method, Response},
    response::IntoResponse,
};
use dashmap::DashMap;
use metrics::counter;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum::{AsRefStr, Display};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

const STOCK_ACTIONS: [&str; 3] = ["increase", "decrease", "transfer"];
const EXEMPT_PREFIXES: [&str; 3] = ["/health", "/api-docs", "/swagger-ui"];

/// Numeric strings are always valid header values; the fallback is unreachable in practice.
fn num_to_header_value<T: ToString>(n: T) -> http::HeaderValue {
    http::HeaderValue::from_str(&n.to_string())
        .unwrap_or_else(|_| http::HeaderValue::from_static("0"))
}

/// Cost class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum RateTier {
    Read,
    Write,
    Stock,
}

impl RateTier {
    pub fn classify(method: &Method, path: &str) -> Self {
        if *method == Method::GET || *method == Method::HEAD {
            return RateTier::Read;
        }
        let last_segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        if *method == Method::POST && STOCK_ACTIONS.contains(&last_segment) {
            RateTier::Stock
        } else {
            RateTier::Write
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitEntry {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn roll(&mut self, now: Instant, window: Duration) {
        if now.duration_since(self.window_start) >= window {
            self.count = 0;
            self.window_start = now;
        }
    }

    fn time_until_reset(&self, now: Instant, window: Duration) -> Duration {
        window.saturating_sub(now.duration_since(self.window_start))
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window_duration: Duration,
    pub read_requests: u32,
    pub write_requests: u32,
    pub stock_requests: u32,
    pub enable_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_duration: Duration::from_secs(60),
            read_requests: 150,
            write_requests: 50,
            stock_requests: 30,
            enable_headers: true,
        }
    }
}

impl From<&AppConfig> for RateLimitConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            enabled: cfg.rate_limit_enabled,
            window_duration: Duration::from_secs(cfg.rate_limit_window_secs.max(1)),
            read_requests: cfg.rate_limit_read_requests,
            write_requests: cfg.rate_limit_write_requests,
            stock_requests: cfg.rate_limit_stock_requests,
            enable_headers: true,
        }
    }
}

impl RateLimitConfig {
    pub fn limit_for(&self, tier: RateTier) -> u32 {
        match tier {
            RateTier::Read => self.read_requests,
            RateTier::Write => self.write_requests,
            RateTier::Stock => self.stock_requests,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: Duration,
}

/// Fixed-window counters keyed by tier and client.
#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, RateLimitEntry>>,
    config: Arc<RateLimitConfig>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn entry_key(tier: RateTier, client: &str) -> String {
        format!("{}:{}", tier, client)
    }

    /// Counts one request against `client` in `tier` and reports whether it is admitted.
    /// A rejected request does not consume quota.
    pub fn check_rate_limit(&self, client: &str, tier: RateTier) -> RateLimitResult {
        let limit = self.config.limit_for(tier);
        let window = self.config.window_duration;
        let now = Instant::now();

        let mut entry = self
            .entries
            .entry(Self::entry_key(tier, client))
            .or_insert_with(|| RateLimitEntry::new(now));
        entry.roll(now, window);

        let reset_time = entry.time_until_reset(now, window);
        if entry.count >= limit {
            return RateLimitResult {
                allowed: false,
                limit,
                remaining: 0,
                reset_time,
            };
        }

        entry.count += 1;
        RateLimitResult {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(entry.count),
            reset_time,
        }
    }

    pub fn remaining_quota(&self, client: &str, tier: RateTier) -> u32 {
        let limit = self.config.limit_for(tier);
        match self.entries.get(&Self::entry_key(tier, client)) {
            Some(entry)
                if Instant::now().duration_since(entry.window_start)
                    < self.config.window_duration =>
            {
                limit.saturating_sub(entry.count)
            }
            _ => limit,
        }
    }

    pub fn reset(&self, client: &str, tier: RateTier) {
        self.entries.remove(&Self::entry_key(tier, client));
    }

    /// Drops entries whose window has elapsed.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let window = self.config.window_duration;
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) < window);
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

/// Client address: first `X-Forwarded-For` entry, then `X-Real-IP`, then the socket peer.
pub fn extract_client_key(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return ip.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            let ip = ip_str.trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

fn apply_headers(headers: &mut http::HeaderMap, result: &RateLimitResult) {
    headers.insert("x-ratelimit-limit", num_to_header_value(result.limit));
    headers.insert("x-ratelimit-remaining", num_to_header_value(result.remaining));
    headers.insert(
        "x-ratelimit-reset",
        num_to_header_value(result.reset_time.as_secs()),
    );
}

// Layer implementation for tower
#[derive(Clone)]
pub struct RateLimitLayer {
    rate_limiter: RateLimiter,
}

impl RateLimitLayer {
    pub fn new(rate_limiter: RateLimiter) -> Self {
        Self { rate_limiter }
    }
}

impl<S> tower::Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            rate_limiter: self.rate_limiter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    rate_limiter: RateLimiter,
}

impl<S> tower::Service<Request> for RateLimitService<S>
where
    S: tower::Service<Request, Response = Response<axum::body::Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<axum::body::Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let rate_limiter = self.rate_limiter.clone();
        // Take the service that was driven to readiness and leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let path = request.uri().path().to_string();
            if !rate_limiter.config().enabled || is_exempt(&path) {
                return inner.call(request).await;
            }

            let tier = RateTier::classify(request.method(), &path);
            let client = extract_client_key(&request);
            let result = rate_limiter.check_rate_limit(&client, tier);

            if !result.allowed {
                warn!(%client, %tier, %path, "Rate limit exceeded");
                counter!("rate_limit_denied_total", 1, "tier" => tier.as_ref().to_string());

                let mut response = ServiceError::RateLimitExceeded.into_response();
                if rate_limiter.config().enable_headers {
                    apply_headers(response.headers_mut(), &result);
                }
                return Ok(response);
            }

            counter!("rate_limit_allowed_total", 1, "tier" => tier.as_ref().to_string());
            let mut response = inner.call(request).await?;
            if rate_limiter.config().enable_headers {
                apply_headers(response.headers_mut(), &result);
            }
            Ok(response)
        })
    }
}

// Background cleanup task
pub async fn start_cleanup_task(rate_limiter: RateLimiter, interval: Duration) {
    let mut interval_timer = tokio::time::interval(interval);

    loop {
        interval_timer.tick().await;
        rate_limiter.cleanup_expired();
        debug!(
            tracked = rate_limiter.tracked_keys(),
            "Rate limiter cleanup completed"
        );
    }
}
