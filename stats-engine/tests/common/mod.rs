#![allow(dead_code)]

use async_trait::async_trait;
use stats_core::{
    AuthorIdentity, CoreError, Item, ItemPage, ItemSource, PartialReason, RedditApiError, Reply,
    ReplyFetch, ReportSink,
};
use stats_engine::Confirm;
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

pub const DAY: f64 = 86_400.0;
pub const NOW: f64 = 1_700_000_000.0;
pub const BOT: &str = "stats_bot";

pub fn item(id: &str, author: &str, created: f64, score: i64, num_comments: u32) -> Item {
    let permalink = format!("https://www.reddit.com/r/test/comments/{}/", id);
    Item {
        id: id.to_string(),
        author: AuthorIdentity::from_name(Some(author)),
        created,
        title: format!("Post {}", id),
        url: permalink.clone(),
        permalink,
        score,
        ups: score,
        downs: 0,
        num_comments,
        selftext: Some(String::new()),
        subreddit: "test".to_string(),
    }
}

pub fn self_report(id: &str, created: f64, marker: Option<f64>) -> Item {
    let mut report = item(id, BOT, created, 1, 0);
    report.title = format!("Subreddit Stats: test submissions {}", id);
    report.selftext = Some(match marker {
        Some(value) => format!("| |Submissions|Comments|\n\nSRS Marker: {}", value),
        None => "a report without its footer".to_string(),
    });
    report
}

pub fn reply(id: &str, author: &str, ups: i64, downs: i64, parent: &Item) -> Reply {
    Reply {
        id: id.to_string(),
        author: AuthorIdentity::from_name(Some(author)),
        permalink: format!("{}_/{}/", parent.permalink, id),
        score: ups - downs,
        ups,
        downs,
        parent_id: parent.id.clone(),
        parent_title: parent.title.clone(),
    }
}

/// In-memory forum. Listing order is newest first, like the real one.
pub struct FakeForum {
    pub username: String,
    pub listing: Vec<Item>,
    pub threads: HashMap<String, ReplyFetch>,
    pub extra: HashMap<String, Item>,
    pub submit_failures: Mutex<u32>,
    pub submitted: Mutex<Vec<(String, String, String)>>,
    pub reply_fetches: Mutex<Vec<String>>,
    pub pages_served: Mutex<u32>,
}

impl FakeForum {
    pub fn new(mut listing: Vec<Item>) -> Self {
        listing.sort_by(|a, b| b.created.total_cmp(&a.created));
        Self {
            username: BOT.to_string(),
            listing,
            threads: HashMap::new(),
            extra: HashMap::new(),
            submit_failures: Mutex::new(0),
            submitted: Mutex::new(Vec::new()),
            reply_fetches: Mutex::new(Vec::new()),
            pages_served: Mutex::new(0),
        }
    }

    pub fn with_thread(mut self, item_id: &str, fetch: ReplyFetch) -> Self {
        self.threads.insert(item_id.to_string(), fetch);
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.extra.insert(item.id.clone(), item);
        self
    }

    pub fn failing_submits(self, count: u32) -> Self {
        *self.submit_failures.lock().unwrap() = count;
        self
    }

    pub fn submissions(&self) -> Vec<(String, String, String)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ItemSource for FakeForum {
    fn username(&self) -> &str {
        &self.username
    }

    async fn new_items_page(
        &self,
        _section: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<ItemPage, CoreError> {
        *self.pages_served.lock().unwrap() += 1;
        let start = match after {
            Some(cursor) => match self.listing.iter().position(|item| item.id == cursor) {
                Some(index) => index + 1,
                None => return Ok(ItemPage::default()),
            },
            None => 0,
        };
        let end = (start + limit as usize).min(self.listing.len());
        let items = self.listing[start..end].to_vec();
        let after = if end < self.listing.len() {
            items.last().map(|item| item.id.clone())
        } else {
            None
        };
        Ok(ItemPage { items, after })
    }

    async fn fetch_replies(&self, item: &Item) -> Result<ReplyFetch, CoreError> {
        self.reply_fetches.lock().unwrap().push(item.id.clone());
        Ok(self
            .threads
            .get(&item.id)
            .cloned()
            .unwrap_or_else(|| ReplyFetch::Complete(Vec::new())))
    }

    async fn get_item(&self, reference: &str) -> Result<Item, CoreError> {
        self.extra
            .get(reference)
            .or_else(|| self.listing.iter().find(|item| item.id == reference))
            .cloned()
            .ok_or_else(|| {
                RedditApiError::PostNotFound {
                    post_id: reference.to_string(),
                }
                .into()
            })
    }
}

#[async_trait]
impl ReportSink for FakeForum {
    fn username(&self) -> &str {
        &self.username
    }

    async fn submit(&self, destination: &str, title: &str, body: &str) -> Result<(), CoreError> {
        {
            let mut failures = self.submit_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(RedditApiError::ServerError { status_code: 503 }.into());
            }
        }
        self.submitted.lock().unwrap().push((
            destination.to_string(),
            title.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

pub fn partial(replies: Vec<Reply>, remaining: usize) -> ReplyFetch {
    ReplyFetch::Partial {
        replies,
        reason: PartialReason::TooManyMoreStubs { remaining },
    }
}

/// Answers every prompt the same way and records what was asked.
pub struct ScriptedConfirm {
    pub answer: bool,
    pub prompts: Vec<String>,
}

impl ScriptedConfirm {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: Vec::new(),
        }
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        self.prompts.push(prompt.to_string());
        Ok(self.answer)
    }
}
