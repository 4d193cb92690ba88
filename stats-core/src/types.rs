use serde::{Deserialize, Serialize};
use std::fmt;

pub const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;

/// Who wrote an item or reply.
///
/// Reddit reports removed accounts as `[deleted]` (or omits the author
/// entirely). All of those collapse into the single `Anonymous` identity, so
/// deleted users are grouped and ranked together as one author.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorIdentity {
    Known(String),
    Anonymous,
}

impl AuthorIdentity {
    pub const DELETED: &'static str = "[deleted]";

    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(name) if !name.is_empty() && name != Self::DELETED => {
                AuthorIdentity::Known(name.to_string())
            }
            _ => AuthorIdentity::Anonymous,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            AuthorIdentity::Known(name) => Some(name),
            AuthorIdentity::Anonymous => None,
        }
    }

    /// Reddit usernames are case-insensitive.
    pub fn is(&self, username: &str) -> bool {
        match self {
            AuthorIdentity::Known(name) => name.eq_ignore_ascii_case(username),
            AuthorIdentity::Anonymous => false,
        }
    }
}

impl fmt::Display for AuthorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorIdentity::Known(name) => f.write_str(name),
            AuthorIdentity::Anonymous => f.write_str(Self::DELETED),
        }
    }
}

/// A submission to a subreddit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub author: AuthorIdentity,
    /// Creation time in UTC epoch seconds.
    pub created: f64,
    pub title: String,
    pub url: String,
    /// Absolute URL of the discussion page.
    pub permalink: String,
    pub score: i64,
    pub ups: i64,
    pub downs: i64,
    pub num_comments: u32,
    pub selftext: Option<String>,
    pub subreddit: String,
}

impl Item {
    /// Self posts link to their own discussion page.
    pub fn is_link_post(&self) -> bool {
        self.url != self.permalink
    }
}

/// A comment, flattened out of its reply tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    pub author: AuthorIdentity,
    pub permalink: String,
    pub score: i64,
    pub ups: i64,
    pub downs: i64,
    pub parent_id: String,
    pub parent_title: String,
}

/// Net score of a reply, computed from the vote counts rather than the
/// stored score.
pub fn net_score(reply: &Reply) -> i64 {
    reply.ups - reply.downs
}

/// Reporting window in epoch seconds: items with `min_date < created <= max_date`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub min_date: f64,
    pub max_date: f64,
}

impl Window {
    pub fn new(min_date: f64, max_date: f64) -> Self {
        Self { min_date, max_date }
    }

    pub fn contains(&self, created: f64) -> bool {
        self.min_date < created && created <= self.max_date
    }
}

/// One page of a reverse-chronological listing.
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Cursor for the next page, `None` when the listing is exhausted.
    pub after: Option<String>,
}

/// Why a reply fetch returned less than the whole thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialReason {
    /// Expanding the remaining "load more" stubs would take more requests
    /// than allowed.
    TooManyMoreStubs { remaining: usize },
}

impl fmt::Display for PartialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialReason::TooManyMoreStubs { remaining } => {
                write!(f, "too many more-comments objects ({remaining} unexpanded)")
            }
        }
    }
}

/// Outcome of fetching the replies of one item.
#[derive(Debug, Clone)]
pub enum ReplyFetch {
    Complete(Vec<Reply>),
    Partial {
        replies: Vec<Reply>,
        reason: PartialReason,
    },
}

impl ReplyFetch {
    pub fn replies(&self) -> &[Reply] {
        match self {
            ReplyFetch::Complete(replies) | ReplyFetch::Partial { replies, .. } => replies,
        }
    }

    pub fn into_replies(self) -> Vec<Reply> {
        match self {
            ReplyFetch::Complete(replies) | ReplyFetch::Partial { replies, .. } => replies,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, ReplyFetch::Partial { .. })
    }
}
