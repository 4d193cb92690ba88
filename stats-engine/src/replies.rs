use stats_core::{CoreError, Item, ItemSource, Reply, ReplyFetch};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Fetch the replies of every item, in item order.
///
/// Threads that are too large to expand contribute the replies that were
/// already loaded. Each reply id is kept once, so overlapping expansions
/// cannot count a comment twice.
pub async fn collect_replies<S>(source: &S, items: &[Item]) -> Result<Vec<Reply>, CoreError>
where
    S: ItemSource + ?Sized,
{
    debug!("Processing Commenters");
    let mut seen: HashSet<String> = HashSet::new();
    let mut replies = Vec::new();

    for (index, item) in items.iter().enumerate() {
        if item.num_comments == 0 {
            continue;
        }

        let fetched = match source.fetch_replies(item).await? {
            ReplyFetch::Complete(fetched) => fetched,
            ReplyFetch::Partial { replies: fetched, reason } => {
                warn!(
                    "Incomplete comments on {} ({}): keeping {} loaded comments",
                    item.permalink,
                    reason,
                    fetched.len()
                );
                fetched
            }
        };

        replies.extend(fetched.into_iter().filter(|reply| seen.insert(reply.id.clone())));
        debug!("{}/{} submissions", index + 1, items.len());
    }

    info!("Collected {} comments", replies.len());
    Ok(replies)
}
