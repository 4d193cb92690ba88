//! Seams between the stats engine and the forum it reads from and posts to.

use crate::{CoreError, Item, ItemPage, ReplyFetch};
use async_trait::async_trait;

/// Read side of the forum.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Account the run is logged in as.
    fn username(&self) -> &str;

    /// One page of the section's newest items, newest first.
    async fn new_items_page(
        &self,
        section: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<ItemPage, CoreError>;

    /// Every reply under `item`, flattened.
    ///
    /// Threads too large to expand come back as `ReplyFetch::Partial` with
    /// whatever was already loaded.
    async fn fetch_replies(&self, item: &Item) -> Result<ReplyFetch, CoreError>;

    /// Look up a single item by URL, fullname or id.
    async fn get_item(&self, reference: &str) -> Result<Item, CoreError>;
}

/// Write side of the forum.
#[async_trait]
pub trait ReportSink: Send + Sync {
    fn username(&self) -> &str;

    async fn submit(&self, destination: &str, title: &str, body: &str) -> Result<(), CoreError>;
}
