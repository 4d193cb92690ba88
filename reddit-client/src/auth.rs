//! Script-app login through the OAuth2 password grant.

use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use stats_core::{CoreError, Credentials, RedditApiError};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

pub const AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Reddit tokens last an hour; assume that when the response omits it.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);
/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }

    fn from_response(response: &BasicTokenResponse) -> Self {
        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response.refresh_token().map(|token| token.secret().clone()),
            expires_at: SystemTime::now() + lifetime,
            scope: response
                .scopes()
                .map(|scopes| scopes.iter().map(|scope| scope.as_str().to_string()).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { token: RedditToken },
    TokenExpired { token: RedditToken },
}

impl AuthState {
    pub fn from_token(token: RedditToken) -> Self {
        if token.is_expired() {
            AuthState::TokenExpired { token }
        } else {
            AuthState::Authenticated { token }
        }
    }

    /// The bearer token, if one is present and still valid.
    pub fn access_token(&self) -> Option<&str> {
        match self {
            AuthState::Authenticated { token } if !token.is_expired() => Some(&token.access_token),
            _ => None,
        }
    }
}

pub struct PasswordAuthenticator {
    oauth: BasicClient,
    http: Client,
    username: String,
    password: String,
}

impl PasswordAuthenticator {
    pub fn new(credentials: &Credentials, http: Client) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(AUTH_URL.to_string()).map_err(invalid_endpoint)?;
        let token_url = TokenUrl::new(TOKEN_URL.to_string()).map_err(invalid_endpoint)?;

        let oauth = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::BasicAuth);

        Ok(Self {
            oauth,
            http,
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn required_scopes() -> Vec<&'static str> {
        vec!["identity", "read", "submit"]
    }

    pub async fn request_token(&self) -> Result<RedditToken, CoreError> {
        debug!("Requesting access token for {}", self.username);
        let username = ResourceOwnerUsername::new(self.username.clone());
        let password = ResourceOwnerPassword::new(self.password.clone());
        let http = self.http.clone();

        let response = self
            .oauth
            .exchange_password(&username, &password)
            .add_scopes(
                Self::required_scopes()
                    .into_iter()
                    .map(|scope| Scope::new(scope.to_string())),
            )
            .request_async(|request| send_token_request(http, request))
            .await
            .map_err(|e| {
                let reason = match e {
                    RequestTokenError::ServerResponse(response) => response.to_string(),
                    RequestTokenError::Request(e) => format!("token request failed: {}", e),
                    // Reddit answers bad credentials with a 200 and an error body.
                    RequestTokenError::Parse(_, body) => {
                        format!("unexpected token response: {}", String::from_utf8_lossy(&body))
                    }
                    RequestTokenError::Other(message) => message,
                };
                CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
            })?;

        info!("Authenticated as {}", self.username);
        Ok(RedditToken::from_response(&response))
    }
}

fn invalid_endpoint(e: url::ParseError) -> CoreError {
    CoreError::Internal {
        message: format!("invalid OAuth endpoint: {}", e),
    }
}

/// Token exchange over the shared client, so the token request carries the
/// same user agent as every API call.
async fn send_token_request(http: Client, request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
    let response = http
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: SystemTime) -> RedditToken {
        RedditToken {
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at,
            scope: vec!["identity".to_string(), "read".to_string(), "submit".to_string()],
        }
    }

    #[test]
    fn test_token_expiry() {
        let valid = token(SystemTime::now() + Duration::from_secs(3600));
        assert!(!valid.is_expired());

        let stale = token(SystemTime::now() - Duration::from_secs(10));
        assert!(stale.is_expired());

        // Inside the renewal margin counts as expired.
        let closing = token(SystemTime::now() + Duration::from_secs(30));
        assert!(closing.is_expired());
    }

    #[test]
    fn test_auth_state_from_token() {
        let state = AuthState::from_token(token(SystemTime::now() + Duration::from_secs(3600)));
        assert!(matches!(state, AuthState::Authenticated { .. }));
        assert_eq!(state.access_token(), Some("token"));

        let state = AuthState::from_token(token(SystemTime::now() - Duration::from_secs(1)));
        assert!(matches!(state, AuthState::TokenExpired { .. }));
        assert_eq!(state.access_token(), None);

        assert_eq!(AuthState::NotAuthenticated.access_token(), None);
    }

    #[test]
    fn test_token_serialization() {
        let token = RedditToken {
            access_token: "test_access_token".to_string(),
            refresh_token: Some("test_refresh_token".to_string()),
            expires_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1640995200),
            scope: vec!["identity".to_string(), "read".to_string()],
        };

        let serialized = serde_json::to_string(&token).unwrap();
        assert!(serialized.contains("test_access_token"));

        let deserialized: RedditToken = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.access_token, token.access_token);
        assert_eq!(deserialized.refresh_token, token.refresh_token);
        assert_eq!(deserialized.expires_at, token.expires_at);
        assert_eq!(deserialized.scope, token.scope);
    }

    #[test]
    fn test_required_scopes() {
        assert_eq!(
            PasswordAuthenticator::required_scopes(),
            vec!["identity", "read", "submit"]
        );
    }

    #[test]
    fn test_authenticator_creation() {
        let credentials = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            username: "stats_bot".to_string(),
            password: "hunter2".to_string(),
            user_agent: "subreddit-stats/0.1 by stats_bot".to_string(),
        };
        let authenticator = PasswordAuthenticator::new(&credentials, Client::new()).unwrap();
        assert_eq!(authenticator.username(), "stats_bot");
    }
}
