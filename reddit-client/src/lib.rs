pub mod api;
pub mod auth;
pub mod comments;
pub mod metrics;
pub mod rate_limiter;

#[cfg(test)]
mod tests;

pub use auth::{AuthState, PasswordAuthenticator, RedditToken};

use api::{RedditApiClient, RedditPostData};
use async_trait::async_trait;
use comments::CommentTree;
use stats_core::{
    CoreError, Credentials, Item, ItemPage, ItemSource, RedditApiError, ReplyFetch, ReportSink,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Authenticated Reddit session used for both reading and posting.
pub struct RedditClient {
    api: RedditApiClient,
    authenticator: PasswordAuthenticator,
    auth_state: Mutex<AuthState>,
    username: String,
    max_more_requests: usize,
}

impl RedditClient {
    pub fn new(credentials: &Credentials, max_more_requests: usize) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(credentials.user_agent.clone())?;
        let authenticator = PasswordAuthenticator::new(credentials, api.http_client().clone())?;

        Ok(Self {
            api,
            authenticator,
            auth_state: Mutex::new(AuthState::NotAuthenticated),
            username: credentials.username.clone(),
            max_more_requests,
        })
    }

    /// Log in and confirm the account name with `/api/v1/me`.
    pub async fn login(&mut self) -> Result<(), CoreError> {
        let token = self.access_token().await?;
        let me = self.api.get_me(&token).await?;
        if me.name != self.username {
            debug!("Account name is {} (configured as {})", me.name, self.username);
        }
        self.username = me.name;
        info!("Logged in as {}", self.username);
        Ok(())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn max_more_requests(&self) -> usize {
        self.max_more_requests
    }

    pub async fn log_metrics(&self) {
        self.api.log_metrics().await;
    }

    /// Current bearer token, logging in again once the old one expires.
    async fn access_token(&self) -> Result<String, CoreError> {
        let mut state = self.auth_state.lock().await;
        if let Some(token) = state.access_token() {
            return Ok(token.to_string());
        }

        if matches!(*state, AuthState::TokenExpired { .. } | AuthState::Authenticated { .. }) {
            debug!("Access token expired, requesting a new one");
        }
        let token = self.authenticator.request_token().await?;
        let access_token = token.access_token.clone();
        *state = AuthState::from_token(token);
        Ok(access_token)
    }
}

/// Submission id from a permalink, a short link, a `t3_` fullname or a bare id.
pub fn parse_submission_reference(reference: &str) -> Result<String, CoreError> {
    let reference = reference.trim();
    let invalid = || CoreError::InvalidInput {
        message: format!("not a submission URL or id: {}", reference),
    };

    if reference.starts_with("http://") || reference.starts_with("https://") {
        let url = url::Url::parse(reference).map_err(|_| invalid())?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let id = match segments.iter().position(|segment| *segment == "comments") {
            Some(index) => segments.get(index + 1).copied(),
            None if url.host_str() == Some("redd.it") => segments.first().copied(),
            None => None,
        };
        return id
            .filter(|id| is_base36(id))
            .map(str::to_string)
            .ok_or_else(invalid);
    }

    let id = reference.strip_prefix("t3_").unwrap_or(reference);
    if is_base36(id) {
        Ok(id.to_string())
    } else {
        Err(invalid())
    }
}

fn is_base36(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[async_trait]
impl ItemSource for RedditClient {
    fn username(&self) -> &str {
        &self.username
    }

    async fn new_items_page(
        &self,
        section: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<ItemPage, CoreError> {
        let token = self.access_token().await?;
        let listing = self.api.get_new_posts(&token, section, limit, after).await?;

        Ok(ItemPage {
            items: listing
                .data
                .children
                .into_iter()
                .map(|child| Item::from(child.data))
                .collect(),
            after: listing.data.after,
        })
    }

    async fn fetch_replies(&self, item: &Item) -> Result<ReplyFetch, CoreError> {
        let token = self.access_token().await?;
        let (_, things) = self.api.get_comments(&token, &item.id).await?;

        let mut tree = CommentTree::new();
        tree.absorb(things, &item.title);

        let link_fullname = format!("t3_{}", item.id);
        let partial = tree
            .expand(&item.title, self.max_more_requests, |batch| {
                self.api.get_more_children(&token, &link_fullname, batch)
            })
            .await?;

        debug!("{} comments on {}", tree.replies.len(), item.id);
        Ok(match partial {
            None => ReplyFetch::Complete(tree.replies),
            Some(reason) => ReplyFetch::Partial {
                replies: tree.replies,
                reason,
            },
        })
    }

    async fn get_item(&self, reference: &str) -> Result<Item, CoreError> {
        let id = parse_submission_reference(reference)?;
        let token = self.access_token().await?;

        let post: Option<RedditPostData> = self.api.get_by_id(&token, &format!("t3_{}", id)).await?;
        post.map(Item::from)
            .ok_or_else(|| CoreError::RedditApi(RedditApiError::PostNotFound { post_id: id }))
    }
}

#[async_trait]
impl ReportSink for RedditClient {
    fn username(&self) -> &str {
        &self.username
    }

    async fn submit(&self, destination: &str, title: &str, body: &str) -> Result<(), CoreError> {
        let token = self.access_token().await?;
        self.api
            .submit_self_post(&token, destination, title, body)
            .await
            .map(|_| ())
    }
}
