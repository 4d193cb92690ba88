//! Turning a comment tree into a flat list of replies.

use crate::api::{CommentThing, MORE_CHILDREN_BATCH};
use stats_core::{CoreError, PartialReason, Reply};
use std::collections::VecDeque;
use std::future::Future;
use tracing::{debug, trace};

/// Replies collected so far plus the ids still hidden behind "load more" stubs.
#[derive(Debug, Default)]
pub struct CommentTree {
    pub replies: Vec<Reply>,
    pub pending: VecDeque<String>,
}

impl CommentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth-first, so replies appear in thread order.
    pub fn absorb(&mut self, things: Vec<CommentThing>, parent_title: &str) {
        for thing in things {
            match thing {
                CommentThing::Comment(mut comment) => {
                    let nested = std::mem::take(&mut comment.replies);
                    self.replies.push(comment.into_reply(parent_title));
                    self.absorb(nested, parent_title);
                }
                CommentThing::More(more) if more.is_continue_thread() => {
                    trace!("Skipping continue-thread link under {}", more.parent_id);
                }
                CommentThing::More(more) => self.pending.extend(more.children),
            }
        }
    }

    /// Resolve pending stubs with `fetch`, at most `max_requests` calls.
    ///
    /// Returns the reason when stubs remain unexpanded.
    pub async fn expand<F, Fut>(
        &mut self,
        parent_title: &str,
        max_requests: usize,
        mut fetch: F,
    ) -> Result<Option<PartialReason>, CoreError>
    where
        F: FnMut(Vec<String>) -> Fut,
        Fut: Future<Output = Result<Vec<CommentThing>, CoreError>>,
    {
        let mut requests = 0;
        while !self.pending.is_empty() {
            if requests == max_requests {
                return Ok(Some(PartialReason::TooManyMoreStubs {
                    remaining: self.pending.len(),
                }));
            }

            let take = self.pending.len().min(MORE_CHILDREN_BATCH);
            let batch: Vec<String> = self.pending.drain(..take).collect();
            debug!("Expanding {} hidden comments", batch.len());
            let things = fetch(batch).await?;
            self.absorb(things, parent_title);
            requests += 1;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{RedditCommentData, RedditMoreData};
    use std::cell::RefCell;

    fn comment(id: &str, replies: Vec<CommentThing>) -> CommentThing {
        CommentThing::Comment(RedditCommentData {
            id: id.to_string(),
            author: Some(format!("user_{}", id)),
            permalink: format!("/r/test/comments/abc/_/{}/", id),
            score: 1,
            ups: 1,
            downs: 0,
            link_id: "t3_abc".to_string(),
            parent_id: "t3_abc".to_string(),
            replies,
        })
    }

    fn more(ids: &[&str]) -> CommentThing {
        CommentThing::More(RedditMoreData {
            id: ids.first().copied().unwrap_or("_").to_string(),
            count: ids.len() as u32,
            children: ids.iter().map(|id| id.to_string()).collect(),
            parent_id: "t3_abc".to_string(),
        })
    }

    fn ids(tree: &CommentTree) -> Vec<&str> {
        tree.replies.iter().map(|reply| reply.id.as_str()).collect()
    }

    #[test]
    fn test_absorb_flattens_depth_first() {
        let mut tree = CommentTree::new();
        tree.absorb(
            vec![
                comment("a", vec![comment("a1", vec![comment("a1x", vec![])]), more(&[])]),
                comment("b", vec![]),
                more(&["c", "d"]),
            ],
            "Parent",
        );

        assert_eq!(ids(&tree), vec!["a", "a1", "a1x", "b"]);
        assert_eq!(tree.pending, VecDeque::from(vec!["c".to_string(), "d".to_string()]));
        assert!(tree.replies.iter().all(|reply| reply.parent_title == "Parent"));
    }

    #[tokio::test]
    async fn test_expand_resolves_pending_stubs() {
        let mut tree = CommentTree::new();
        tree.absorb(vec![comment("a", vec![]), more(&["b", "c"])], "Parent");

        let reason = tree
            .expand("Parent", 4, |batch| async move {
                Ok(batch.iter().map(|id| comment(id, vec![])).collect())
            })
            .await
            .unwrap();

        assert_eq!(reason, None);
        assert_eq!(ids(&tree), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_expand_stops_at_request_budget() {
        let mut tree = CommentTree::new();
        let hidden: Vec<String> = (0..250).map(|n| format!("h{}", n)).collect();
        let hidden_refs: Vec<&str> = hidden.iter().map(String::as_str).collect();
        tree.absorb(vec![more(&hidden_refs)], "Parent");

        let calls = RefCell::new(Vec::new());
        let reason = tree
            .expand("Parent", 2, |batch| {
                calls.borrow_mut().push(batch.len());
                async move { Ok(batch.iter().map(|id| comment(id, vec![])).collect()) }
            })
            .await
            .unwrap();

        assert_eq!(*calls.borrow(), vec![100, 100]);
        assert_eq!(reason, Some(PartialReason::TooManyMoreStubs { remaining: 50 }));
        assert_eq!(tree.replies.len(), 200);
    }

    #[tokio::test]
    async fn test_expand_propagates_errors() {
        let mut tree = CommentTree::new();
        tree.absorb(vec![more(&["x"])], "Parent");

        let result = tree
            .expand("Parent", 4, |_| async {
                Err(CoreError::RedditApi(stats_core::RedditApiError::RequestTimeout))
            })
            .await;
        assert!(result.is_err());
    }
}
