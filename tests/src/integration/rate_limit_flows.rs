//! # Rate Limit Flows
//!
//! A login route guarded by the vault's limiter: lockout, forgiveness on
//! success, and the lockout recorded in the audit trail.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::start_vault;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use chrono::Utc;
    use rv_05_rate_limiter::{RateLimitConfig, RateLimitLayer, RateLimiter};
    use shared_types::{AuditAction, AuditOptions, ManualClock};
    use std::convert::Infallible;
    use std::sync::Arc;
    use tower::{Layer, ServiceExt};

    const LOGIN: &str = "/api/auth/login";

    fn login_from(ip: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(LOGIN)
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_forgiveness_after_four_failures() {
        let limiter = RateLimiter::new(Arc::new(ManualClock::new(0))).with_cleanup_probability(0.0);
        let login = RateLimitConfig::login();

        for _ in 0..4 {
            assert!(limiter.check_rate_limit("198.51.100.4", LOGIN, &login).allowed);
        }
        limiter.record_successful_auth("198.51.100.4", LOGIN);

        let fifth = limiter.check_rate_limit("198.51.100.4", LOGIN, &login);
        assert!(fifth.allowed);
        assert_eq!(fifth.attempts_left, login.max_attempts - 1);
    }

    #[test]
    fn test_lockout_lifts_after_block_duration() {
        let clock = Arc::new(ManualClock::new(1_709_634_030_123));
        let limiter = RateLimiter::new(clock.clone()).with_cleanup_probability(0.0);
        let login = RateLimitConfig::login();

        for _ in 0..5 {
            assert!(limiter.check_rate_limit("ip", LOGIN, &login).allowed);
        }
        let denied = limiter.check_rate_limit("ip", LOGIN, &login);
        assert!(!denied.allowed);
        assert_eq!(denied.attempts_left, 0);

        // The window (15 min) is over but the block (30 min) is not.
        clock.advance(20 * 60 * 1000);
        assert!(!limiter.check_rate_limit("ip", LOGIN, &login).allowed);

        clock.advance(10 * 60 * 1000);
        let fresh = limiter.check_rate_limit("ip", LOGIN, &login);
        assert!(fresh.allowed);
        assert_eq!(fresh.attempts_left, 4);
    }

    #[tokio::test]
    async fn test_guarded_login_route_locks_out_and_audits() {
        let (_dir, ctx) = start_vault().await;
        let limiter = Arc::clone(ctx.rate_limiter());
        let handler = tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(
                Response::builder()
                    .status(StatusCode::UNAUTHORIZED)
                    .body(Body::empty())
                    .unwrap(),
            )
        });
        let route = RateLimitLayer::new(Arc::clone(&limiter), LOGIN, RateLimitConfig::login())
            .layer(handler);

        for _ in 0..5 {
            let response = route.clone().oneshot(login_from("203.0.113.50")).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        let blocked = route.clone().oneshot(login_from("203.0.113.50")).await.unwrap();
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = blocked.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry_after > 29 * 60 && retry_after <= 30 * 60);

        // The caller that observes the lockout records it.
        let entry = ctx
            .audit()
            .log(
                "anonymous",
                "anonymous",
                AuditAction::AccountLocked,
                "session",
                AuditOptions::default().ip_address("203.0.113.50"),
            )
            .await;
        let on_disk = ctx
            .audit()
            .read_entries(Utc::now().date_naive())
            .await
            .unwrap();
        assert!(on_disk.iter().any(|e| e.id == entry.id));

        let other = route.oneshot(login_from("203.0.113.51")).await.unwrap();
        assert_eq!(other.status(), StatusCode::UNAUTHORIZED);

        ctx.shutdown().await.unwrap();
    }
}
