use crate::{metrics, parse_submission_reference, rate_limiter, AuthState, RedditClient};
use stats_core::{CoreError, Credentials, ItemSource};
use std::time::Duration;

fn create_test_credentials() -> Credentials {
    Credentials {
        client_id: "test_client_id".to_string(),
        client_secret: "test_client_secret".to_string(),
        username: "stats_bot".to_string(),
        password: "test_password".to_string(),
        user_agent: "subreddit-stats/0.1 by stats_bot".to_string(),
    }
}

#[tokio::test]
async fn test_client_creation() {
    let client = RedditClient::new(&create_test_credentials(), 32).unwrap();

    assert_eq!(client.username(), "stats_bot");
    assert_eq!(client.max_more_requests(), 32);
    assert!(matches!(*client.auth_state.lock().await, AuthState::NotAuthenticated));
}

#[test]
fn test_reference_from_permalink() {
    assert_eq!(
        parse_submission_reference("https://www.reddit.com/r/test/comments/abc123/subreddit_stats/")
            .unwrap(),
        "abc123"
    );
    assert_eq!(
        parse_submission_reference("https://old.reddit.com/r/test/comments/xyz9?context=3").unwrap(),
        "xyz9"
    );
    assert_eq!(
        parse_submission_reference("https://www.reddit.com/comments/abc123").unwrap(),
        "abc123"
    );
}

#[test]
fn test_reference_from_short_link_fullname_and_id() {
    assert_eq!(parse_submission_reference("https://redd.it/q1w2e3").unwrap(), "q1w2e3");
    assert_eq!(parse_submission_reference("t3_q1w2e3").unwrap(), "q1w2e3");
    assert_eq!(parse_submission_reference(" q1w2e3 ").unwrap(), "q1w2e3");
}

#[test]
fn test_invalid_references() {
    for reference in [
        "",
        "https://www.reddit.com/r/test/",
        "https://example.com/abc",
        "t1_abc",
        "not an id",
    ] {
        let result = parse_submission_reference(reference);
        assert!(
            matches!(result, Err(CoreError::InvalidInput { .. })),
            "{:?} should be rejected",
            reference
        );
    }
}

#[test]
fn test_bad_reference_fails_before_login() {
    let client = RedditClient::new(&create_test_credentials(), 32).unwrap();

    let result = tokio_test::block_on(client.get_item("https://www.reddit.com/r/test/"));
    assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
    let state = tokio_test::block_on(client.auth_state.lock());
    assert!(state.access_token().is_none());
}

#[tokio::test]
async fn test_rate_limiter_permits() {
    let limiter = rate_limiter::RateLimiter::new(rate_limiter::RateLimitConfig::reddit_oauth());

    let waited = limiter.acquire_permit().await;
    assert!(waited < Duration::from_secs(1));

    let status = limiter.get_rate_limit_status().await;
    assert!(status.available_tokens < 10);
}

#[tokio::test]
async fn test_metrics_collector() {
    let collector = metrics::MetricsCollector::new();

    collector
        .record_request(metrics::RequestMetrics {
            endpoint: "/api/submit".to_string(),
            method: "POST".to_string(),
            status_code: Some(429),
            response_time: Duration::from_millis(150),
            success: false,
            rate_limited: true,
        })
        .await;

    let api_metrics = collector.get_metrics().await;
    assert_eq!(api_metrics.total_requests, 1);
    assert_eq!(api_metrics.failed_requests, 1);
    assert_eq!(api_metrics.rate_limited_requests, 1);
}
