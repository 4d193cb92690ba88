//! Chooses which submissions belong to this run.
//!
//! The scan walks the subreddit's newest listing from the top and stops at
//! the first submission at or below the window's lower bound. Earlier reports
//! posted by the stats account are not counted; instead their marker pulls
//! the lower bound forward so consecutive reports never overlap.

use crate::marker::MarkerFormat;
use stats_core::{CoreError, Item, ItemSource, Window, SECONDS_PER_DAY};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub section: String,
    /// Current time in epoch seconds.
    pub now: f64,
    pub recency_guard_days: u32,
    /// `0` means no duration limit.
    pub max_duration_days: u32,
    /// Marker of an explicitly supplied previous report.
    pub prior_marker: Option<f64>,
    /// Link to that report, if any.
    pub previous_report: Option<String>,
    /// Listing cursor to start from.
    pub after: Option<String>,
    pub page_limit: u32,
    /// Detect earlier reports in the listing and resume after them.
    pub since_last: bool,
}

#[derive(Debug, Clone)]
pub struct Batch {
    /// Oldest first.
    pub items: Vec<Item>,
    /// Bounds of `items` themselves, not of the configured scan.
    pub window: Window,
    pub previous_report: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Selection {
    Empty,
    Batch(Batch),
}

/// Scan bounds before any item has been seen.
///
/// Scores of the newest `recency_guard_days` are still moving, so the upper
/// bound sits that far in the past. The lower bound is the larger of the
/// duration limit and the previous report's marker.
pub fn initial_window(
    now: f64,
    recency_guard_days: u32,
    max_duration_days: u32,
    prior_marker: Option<f64>,
) -> Window {
    let max_date = now - SECONDS_PER_DAY * recency_guard_days as f64;
    let mut min_date = if max_duration_days > 0 {
        max_date - SECONDS_PER_DAY * max_duration_days as f64
    } else {
        0.0
    };
    if let Some(marker) = prior_marker {
        min_date = min_date.max(marker);
    }
    Window::new(min_date, max_date)
}

/// Keep the first previous-report link. Returns `false` when `permalink` is a
/// different report than the one already kept.
fn note_previous_report(previous: &mut Option<String>, permalink: &str) -> bool {
    match previous {
        Some(existing) if existing == permalink => true,
        Some(existing) => {
            warn!(
                "Ignoring additional previous report {} (already using {})",
                permalink, existing
            );
            false
        }
        None => {
            *previous = Some(permalink.to_string());
            true
        }
    }
}

#[derive(Debug, Clone)]
pub struct WindowSelector {
    title_prefix: String,
    marker: MarkerFormat,
}

impl WindowSelector {
    pub fn new(title_prefix: impl Into<String>, marker: MarkerFormat) -> Self {
        Self {
            title_prefix: title_prefix.into(),
            marker,
        }
    }

    pub fn is_own_report(&self, item: &Item, username: &str) -> bool {
        item.author.is(username) && item.title.starts_with(&self.title_prefix)
    }

    pub async fn select<S>(&self, source: &S, request: &SelectionRequest) -> Result<Selection, CoreError>
    where
        S: ItemSource + ?Sized,
    {
        let mut window = initial_window(
            request.now,
            request.recency_guard_days,
            request.max_duration_days,
            request.prior_marker,
        );
        let mut previous_report = request.previous_report.clone();
        let mut items: Vec<Item> = Vec::new();
        let mut cursor = request.after.clone();

        debug!(
            "Fetching submissions from r/{} between {} and {}",
            request.section, window.min_date, window.max_date
        );

        'pages: loop {
            let page = source
                .new_items_page(&request.section, cursor.as_deref(), request.page_limit)
                .await?;
            if page.items.is_empty() {
                break;
            }

            for item in page.items {
                if item.created > window.max_date {
                    continue;
                }
                if item.created <= window.min_date {
                    break 'pages;
                }
                if request.since_last && self.is_own_report(&item, source.username()) {
                    debug!("Found previous: {}", item.title);
                    let marker = self.marker.recover(&item)?;
                    window.min_date = window.min_date.max(marker);
                    note_previous_report(&mut previous_report, &item.permalink);
                    continue;
                }
                items.push(item);
            }

            match page.after {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        // A marker found mid-scan can raise the bound past items kept earlier.
        items.retain(|item| item.created > window.min_date);

        info!("Found {} submissions", items.len());
        if items.is_empty() {
            return Ok(Selection::Empty);
        }

        items.sort_by(|a, b| a.created.total_cmp(&b.created));
        let window = Window::new(items[0].created, items[items.len() - 1].created);

        Ok(Selection::Batch(Batch {
            items,
            window,
            previous_report,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    #[test]
    fn test_initial_window_unlimited() {
        let window = initial_window(NOW, 3, 0, None);
        assert_eq!(window.max_date, NOW - 3.0 * SECONDS_PER_DAY);
        assert_eq!(window.min_date, 0.0);
    }

    #[test]
    fn test_initial_window_with_duration() {
        let window = initial_window(NOW, 3, 7, None);
        assert_eq!(window.min_date, NOW - 10.0 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_prior_marker_raises_lower_bound() {
        let marker = NOW - 5.0 * SECONDS_PER_DAY;
        let window = initial_window(NOW, 3, 7, Some(marker));
        assert_eq!(window.min_date, marker);
    }

    #[test]
    fn test_first_previous_report_is_kept() {
        let mut previous = None;
        assert!(note_previous_report(&mut previous, "/r/test/comments/new1/"));
        assert!(!note_previous_report(&mut previous, "/r/test/comments/old1/"));
        assert_eq!(previous.as_deref(), Some("/r/test/comments/new1/"));
    }

    #[test]
    fn test_explicit_report_seen_again_is_not_another_report() {
        let mut previous = Some("/r/test/comments/new1/".to_string());
        assert!(note_previous_report(&mut previous, "/r/test/comments/new1/"));
        assert_eq!(previous.as_deref(), Some("/r/test/comments/new1/"));
    }

    #[test]
    fn test_duration_wins_over_older_marker() {
        let window = initial_window(NOW, 3, 7, Some(1000.0));
        assert_eq!(window.min_date, NOW - 10.0 * SECONDS_PER_DAY);
    }
}
