use crate::metrics::{MetricsCollector, RequestMetrics};
use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use reqwest::{Client, Method, Response};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use stats_core::{AuthorIdentity, CoreError, Item, RedditApiError, Reply};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
pub const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

/// Upper bound on ids per `morechildren` call.
pub const MORE_CHILDREN_BATCH: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: Option<String>,
    pub subreddit: String,
    pub url: String,
    pub permalink: String,
    pub created_utc: f64,
    pub score: i64,
    pub num_comments: u32,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub downs: i64,
    #[serde(default)]
    pub is_self: bool,
}

/// Comment listings mix real comments with "load more" stubs.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommentThing {
    #[serde(rename = "t1")]
    Comment(RedditCommentData),
    #[serde(rename = "more")]
    More(RedditMoreData),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentListing {
    pub data: CommentListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentListingData {
    #[serde(default)]
    pub children: Vec<CommentThing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    pub permalink: String,
    pub score: i64,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub downs: i64,
    pub link_id: String,
    pub parent_id: String,
    /// Nested replies. Reddit sends `""` when there are none.
    #[serde(default, deserialize_with = "replies_or_empty")]
    pub replies: Vec<CommentThing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditMoreData {
    pub id: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub children: Vec<String>,
    pub parent_id: String,
}

impl RedditMoreData {
    /// "Continue this thread" links carry no ids and cannot be expanded
    /// through `morechildren`.
    pub fn is_continue_thread(&self) -> bool {
        self.children.is_empty()
    }
}

fn replies_or_empty<'de, D>(deserializer: D) -> Result<Vec<CommentThing>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Replies {
        Listing(CommentListing),
        Empty(String),
    }

    Ok(match Option::<Replies>::deserialize(deserializer)? {
        Some(Replies::Listing(listing)) => listing.data.children,
        Some(Replies::Empty(_)) | None => Vec::new(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditUserData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub link_karma: i64,
    #[serde(default)]
    pub comment_karma: i64,
}

#[derive(Debug, Deserialize)]
struct JsonEnvelope<T> {
    json: JsonBody<T>,
}

#[derive(Debug, Deserialize)]
struct JsonBody<T> {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenData {
    #[serde(default)]
    things: Vec<CommentThing>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitData {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
}

/// `[["SUBREDDIT_NOEXIST", "that subreddit doesn't exist", "sr"]]` to
/// `SUBREDDIT_NOEXIST: that subreddit doesn't exist (sr)`.
fn describe_api_errors(errors: &[Vec<serde_json::Value>]) -> String {
    errors
        .iter()
        .map(|error| {
            let parts: Vec<&str> = error.iter().filter_map(|part| part.as_str()).collect();
            match parts.as_slice() {
                [code, message, field] => format!("{}: {} ({})", code, message, field),
                [code, message] => format!("{}: {}", code, message),
                _ => parts.join(" "),
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn absolute_permalink(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else {
        format!("{}{}", REDDIT_WEB_BASE, permalink)
    }
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsCollector>,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(http_client, user_agent))
    }

    pub fn with_client(http_client: Client, user_agent: String) -> Self {
        Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::reddit_oauth())),
            metrics: Arc::new(MetricsCollector::new()),
            user_agent,
        }
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", REDDIT_API_BASE, endpoint);

        let waited = self.rate_limiter.acquire_permit().await;
        debug!("Acquired rate limit permit for {} {} after {:?}", method, endpoint, waited);

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .header("User-Agent", &self.user_agent);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }
        if let Some(fields) = form {
            request_builder = request_builder.form(fields);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let start_time = Instant::now();
        let sent = request_builder.send().await;
        let response_time = start_time.elapsed();

        let (status_code, result) = match sent {
            Ok(response) => {
                let status = response.status().as_u16();
                self.observe_rate_headers(&response).await;
                (Some(status), check_status(response, endpoint))
            }
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                let error = if e.is_timeout() {
                    CoreError::RedditApi(RedditApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                };
                (None, Err(error))
            }
        };

        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                status_code,
                response_time,
                success: result.is_ok(),
                rate_limited: status_code == Some(429),
            })
            .await;

        result
    }

    async fn observe_rate_headers(&self, response: &Response) {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<f64>().ok())
        };
        if let (Some(remaining), Some(reset)) = (header("x-ratelimit-remaining"), header("x-ratelimit-reset")) {
            self.rate_limiter
                .observe_server_budget(remaining, Duration::from_secs_f64(reset.max(0.0)))
                .await;
        }
    }

    pub async fn get_me(&self, access_token: &str) -> Result<RedditUserData, CoreError> {
        let response = self
            .make_request(Method::GET, "/api/v1/me", access_token, None, None)
            .await?;

        let user_data: RedditUserData = parse_json(response, "user data").await?;
        debug!("Retrieved user info for: {}", user_data.name);
        Ok(user_data)
    }

    /// One page of `/r/{subreddit}/new`, newest first.
    pub async fn get_new_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/new", subreddit);
        let limit_str = limit.to_string();
        let mut params = vec![("limit", limit_str.as_str()), ("raw_json", "1")];
        if let Some(after_val) = after {
            params.push(("after", after_val));
        }

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params), None)
            .await?;

        let listing: RedditListing<RedditPostData> =
            parse_json(response, &format!("posts for r/{}", subreddit)).await?;

        debug!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }

    /// A submission together with its top-level comment tree.
    pub async fn get_comments(
        &self,
        access_token: &str,
        article_id: &str,
    ) -> Result<(RedditPostData, Vec<CommentThing>), CoreError> {
        let endpoint = format!("/comments/{}", article_id);
        let params = [("limit", "500"), ("raw_json", "1")];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params), None)
            .await?;

        let (post, comments): (RedditListing<RedditPostData>, CommentListing) =
            parse_json(response, &format!("comments for {}", article_id)).await?;

        let post = post
            .data
            .children
            .into_iter()
            .next()
            .map(|child| child.data)
            .ok_or_else(|| {
                CoreError::RedditApi(RedditApiError::PostNotFound {
                    post_id: article_id.to_string(),
                })
            })?;
        Ok((post, comments.data.children))
    }

    pub async fn get_more_children(
        &self,
        access_token: &str,
        link_fullname: &str,
        children: Vec<String>,
    ) -> Result<Vec<CommentThing>, CoreError> {
        let ids = children.join(",");
        let params = [
            ("api_type", "json"),
            ("link_id", link_fullname),
            ("children", ids.as_str()),
            ("limit_children", "false"),
            ("raw_json", "1"),
        ];

        let response = self
            .make_request(Method::GET, "/api/morechildren", access_token, Some(&params), None)
            .await?;

        let envelope: JsonEnvelope<MoreChildrenData> =
            parse_json(response, "morechildren response").await?;
        if !envelope.json.errors.is_empty() {
            return Err(CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: describe_api_errors(&envelope.json.errors),
            }));
        }

        let things = envelope.json.data.map(|data| data.things).unwrap_or_default();
        debug!("Expanded {} ids into {} things", children.len(), things.len());
        Ok(things)
    }

    pub async fn get_by_id(
        &self,
        access_token: &str,
        fullname: &str,
    ) -> Result<Option<RedditPostData>, CoreError> {
        let endpoint = format!("/by_id/{}", fullname);
        let params = [("raw_json", "1")];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params), None)
            .await?;

        let listing: RedditListing<RedditPostData> =
            parse_json(response, &format!("submission {}", fullname)).await?;
        Ok(listing.data.children.into_iter().next().map(|child| child.data))
    }

    pub async fn submit_self_post(
        &self,
        access_token: &str,
        subreddit: &str,
        title: &str,
        text: &str,
    ) -> Result<SubmitData, CoreError> {
        let form = [
            ("api_type", "json"),
            ("kind", "self"),
            ("sr", subreddit),
            ("title", title),
            ("text", text),
        ];

        let response = self
            .make_request(Method::POST, "/api/submit", access_token, None, Some(&form))
            .await?;

        let envelope: JsonEnvelope<SubmitData> = parse_json(response, "submit response").await?;
        if !envelope.json.errors.is_empty() {
            let reason = describe_api_errors(&envelope.json.errors);
            warn!("Submission to r/{} rejected: {}", subreddit, reason);
            return Err(CoreError::RedditApi(RedditApiError::SubmitRejected { reason }));
        }

        let data = envelope.json.data.unwrap_or_default();
        info!(
            "Submitted to r/{}: {}",
            subreddit,
            data.url.as_deref().unwrap_or("(no url returned)")
        );
        Ok(data)
    }

    pub async fn log_metrics(&self) {
        self.metrics.log_summary().await;

        let status = self.rate_limiter.get_rate_limit_status().await;
        debug!(
            "Rate limiter: {}/{} tokens left at {}/min ({:.0}% used)",
            status.available_tokens,
            status.max_tokens,
            status.requests_per_minute,
            status.utilization_percentage()
        );
    }
}

fn check_status(response: Response, endpoint: &str) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        debug!("Request successful: {} {}", status, endpoint);
        return Ok(response);
    }

    error!("Request failed with status: {} for {}", status, endpoint);
    let error = match status.as_u16() {
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(60);
            warn!("Rate limited, retry after {} seconds", retry_after);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        401 => RedditApiError::InvalidToken,
        403 => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        404 => RedditApiError::InvalidResponse {
            details: format!("Resource not found: {}", endpoint),
        },
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        code => RedditApiError::InvalidResponse {
            details: format!("Unexpected status {} for {}", code, endpoint),
        },
    };
    Err(CoreError::RedditApi(error))
}

async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, CoreError> {
    response.json().await.map_err(|e| {
        error!("Failed to parse {}: {}", what, e);
        CoreError::RedditApi(RedditApiError::InvalidResponse {
            details: format!("Failed to parse {}", what),
        })
    })
}

impl From<RedditPostData> for Item {
    fn from(post_data: RedditPostData) -> Self {
        let permalink = absolute_permalink(&post_data.permalink);
        // Self posts link to themselves.
        let url = if post_data.is_self {
            permalink.clone()
        } else {
            post_data.url
        };
        Self {
            id: post_data.id,
            author: AuthorIdentity::from_name(post_data.author.as_deref()),
            created: post_data.created_utc,
            title: post_data.title,
            url,
            permalink,
            score: post_data.score,
            ups: post_data.ups,
            downs: post_data.downs,
            num_comments: post_data.num_comments,
            selftext: if post_data.is_self {
                Some(post_data.selftext)
            } else {
                None
            },
            subreddit: post_data.subreddit,
        }
    }
}

impl RedditCommentData {
    pub fn into_reply(self, parent_title: &str) -> Reply {
        Reply {
            id: self.id,
            author: AuthorIdentity::from_name(self.author.as_deref()),
            permalink: absolute_permalink(&self.permalink),
            score: self.score,
            ups: self.ups,
            downs: self.downs,
            parent_id: self.link_id,
            parent_title: parent_title.to_string(),
        }
    }
}
