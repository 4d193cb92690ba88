use stats_core::{ConfigError, CoreError, ErrorExt, ErrorReporter, RedditApiError};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "client_id".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let marker_error = CoreError::MarkerNotFound {
        reference: "abc123".to_string(),
    };
    assert_eq!(marker_error.error_code(), "MARKER_NOT_FOUND");
}

#[test]
fn test_retryable_errors() {
    let retryable_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert!(retryable_error.is_retryable());

    let server_error = CoreError::RedditApi(RedditApiError::ServerError { status_code: 502 });
    assert!(server_error.is_retryable());

    let non_retryable_error = CoreError::Config(ConfigError::MissingField {
        field: "client_id".to_string(),
    });
    assert!(!non_retryable_error.is_retryable());

    let marker_error = CoreError::MarkerNotFound {
        reference: "abc123".to_string(),
    };
    assert!(!marker_error.is_retryable());
}

#[test]
fn test_retry_after() {
    let rate_limit_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(
        rate_limit_error.retry_after(),
        Some(Duration::from_secs(60))
    );

    let rejected = CoreError::RedditApi(RedditApiError::SubmitRejected {
        reason: "SUBREDDIT_NOTALLOWED".to_string(),
    });
    assert_eq!(rejected.retry_after(), None);
}

#[test]
fn test_user_friendly_messages() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    let message = reddit_error.user_friendly_message();
    assert!(message.contains("authentication token is invalid"));

    let config_error = CoreError::Config(ConfigError::ConflictingOptions {
        reason: "--pswd can only be used in combination with --user".to_string(),
    });
    assert!(config_error.user_friendly_message().contains("--pswd"));

    let marker_error = CoreError::MarkerNotFound {
        reference: "https://www.reddit.com/r/test/comments/abc123/".to_string(),
    };
    assert!(marker_error
        .user_friendly_message()
        .contains("End marker not found"));
}

#[test]
fn test_error_reporter() {
    let error = CoreError::RedditApi(RedditApiError::InvalidToken);

    // This test just ensures the methods don't panic
    ErrorReporter::new().report_error(&error);
    error.log_warn();
}
