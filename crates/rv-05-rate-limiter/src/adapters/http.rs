//! HTTP surface: 429 response contract and a tower layer that guards a route.
//!
//! Denied requests get:
//!
//! ```text
//! HTTP/1.1 429 Too Many Requests
//! Retry-After: 1800
//! X-RateLimit-Limit: 5
//! X-RateLimit-Remaining: 0
//! X-RateLimit-Reset: 1709637630
//!
//! {"error":"Too many requests","message":"...","resetTime":"2024-03-05T11:20:30.123Z","attemptsLeft":0}
//! ```

use crate::domain::config::RateLimitConfig;
use crate::domain::entry::RateLimitDecision;
use crate::service::RateLimiter;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::SecondsFormat;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Build the 429 response for a denied decision.
pub fn rate_limit_response(
    decision: &RateLimitDecision,
    config: &RateLimitConfig,
    now_ms: i64,
) -> Response {
    let retry_after = decision.retry_after_secs(now_ms);
    let minutes = retry_after.div_ceil(60);
    let body = serde_json::json!({
        "error": "Too many requests",
        "message": format!(
            "Too many attempts. Please try again in {minutes} minute{}.",
            if minutes == 1 { "" } else { "s" }
        ),
        "resetTime": decision.reset_at().to_rfc3339_opts(SecondsFormat::Millis, true),
        "attemptsLeft": decision.attempts_left,
    });

    let mut headers = limit_headers(decision, config);
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    (StatusCode::TOO_MANY_REQUESTS, headers, Json(body)).into_response()
}

fn limit_headers(decision: &RateLimitDecision, config: &RateLimitConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(config.max_attempts));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.attempts_left));
    headers.insert(
        X_RATELIMIT_RESET,
        HeaderValue::from(decision.reset_time.div_euclid(1000)),
    );
    headers
}

/// Client identity: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// peer address, then loopback.
pub fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    let real = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());
    if let Some(ip) = real {
        return ip;
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }

    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Guards every request of the wrapped service under one endpoint name and
/// policy.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
    endpoint: Arc<str>,
    config: RateLimitConfig,
}

impl RateLimitLayer {
    pub fn new(
        limiter: Arc<RateLimiter>,
        endpoint: impl Into<Arc<str>>,
        config: RateLimitConfig,
    ) -> Self {
        Self {
            limiter,
            endpoint: endpoint.into(),
            config,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: Arc::clone(&self.limiter),
            endpoint: Arc::clone(&self.endpoint),
            config: self.config,
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
    endpoint: Arc<str>,
    config: RateLimitConfig,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let ip = extract_client_ip(&req);
        let decision = self
            .limiter
            .check_rate_limit(&ip.to_string(), &self.endpoint, &self.config);

        if !decision.allowed {
            let response = rate_limit_response(&decision, &self.config, self.limiter.now_ms());
            return Box::pin(async move { Ok(response) });
        }

        // Take the service that was driven to readiness, leave a clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let headers = limit_headers(&decision, &self.config);
        Box::pin(async move {
            let mut response = inner.call(req).await?;
            response.headers_mut().extend(headers);
            Ok(response)
        })
    }
}
