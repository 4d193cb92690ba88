//! Leaderboards and the markdown report built from them.
//!
//! Every section renders to an empty string when asked for zero entries or
//! when there is nothing to rank, so callers can switch sections off by count.
//! Rendering only reads its inputs: the same batch always produces the same
//! bytes.

use crate::aggregate::{Aggregates, AuthorGroups};
use crate::marker::MarkerFormat;
use crate::window::Batch;
use chrono::{DateTime, Utc};
use stats_core::{net_score, AuthorIdentity, Item, Reply};
use std::fmt::Write;

/// Submissions listed under each top submitter.
pub const SUBMISSIONS_PER_SUBMITTER: usize = 10;

const FOOTER_CREDIT: &str =
    ">Generated with [Subreddit Stats](https://github.com/bboe/subreddit_stats)  \n";

pub fn item_score(item: &Item) -> i64 {
    item.score
}

/// One ranked author.
#[derive(Debug)]
pub struct AuthorRank<'g, T> {
    pub author: &'g AuthorIdentity,
    pub entries: &'g [&'g T],
    pub points: i64,
}

impl<T> AuthorRank<'_, T> {
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

/// Rank authors by `(total points, number of entries)`, highest first.
///
/// The entry count is the deliberate tie-breaker; authors equal on both keep
/// their first-encounter order.
pub fn rank_authors<'g, T>(groups: &'g AuthorGroups<'g, T>, score: fn(&T) -> i64) -> Vec<AuthorRank<'g, T>> {
    let mut ranked: Vec<AuthorRank<'g, T>> = groups
        .iter()
        .map(|(author, entries)| AuthorRank {
            author,
            entries,
            points: entries.iter().map(|entry| score(entry)).sum(),
        })
        .collect();
    ranked.sort_by(|a, b| (b.points, b.count()).cmp(&(a.points, a.count())));
    ranked
}

/// Highest `score` first; equal scores keep their input order.
pub fn rank_by<'e, T>(entries: impl IntoIterator<Item = &'e T>, score: fn(&T) -> i64) -> Vec<&'e T>
where
    T: 'e,
{
    let mut ranked: Vec<&T> = entries.into_iter().collect();
    ranked.sort_by_key(|entry| std::cmp::Reverse(score(entry)));
    ranked
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionCounts {
    pub submitters: usize,
    pub commenters: usize,
    pub submissions: usize,
    pub comments: usize,
}

/// Fixed parts of every report.
#[derive(Debug, Clone)]
pub struct ReportTemplate {
    pub title_prefix: String,
    pub marker: MarkerFormat,
    pub max_body_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub body: String,
    /// Body is over the size cap and must only be printed.
    pub oversized: bool,
}

pub struct Reporter<'a> {
    template: &'a ReportTemplate,
    subreddit: &'a str,
    batch: &'a Batch,
    replies: &'a [Reply],
    aggregates: &'a Aggregates<'a>,
}

impl<'a> Reporter<'a> {
    pub fn new(
        template: &'a ReportTemplate,
        subreddit: &'a str,
        batch: &'a Batch,
        replies: &'a [Reply],
        aggregates: &'a Aggregates<'a>,
    ) -> Self {
        Self {
            template,
            subreddit,
            batch,
            replies,
            aggregates,
        }
    }

    pub fn title(&self) -> String {
        format!(
            "{} {} submissions from {} to {}",
            self.template.title_prefix,
            self.subreddit,
            format_timestamp(self.batch.window.min_date),
            format_timestamp(self.batch.window.max_date)
        )
    }

    pub fn basic_stats(&self) -> String {
        let items = &self.batch.items;
        let rows = [
            ("Total", items.len() as i64, self.replies.len() as i64),
            (
                "Unique Redditors",
                self.aggregates.submitters.len() as i64,
                self.aggregates.commenters.len() as i64,
            ),
            (
                "Upvotes",
                items.iter().map(|item| item.ups).sum(),
                self.replies.iter().map(|reply| reply.ups).sum(),
            ),
            (
                "Downvotes",
                items.iter().map(|item| item.downs).sum(),
                self.replies.iter().map(|reply| reply.downs).sum(),
            ),
        ];

        let mut out = String::from("| |Submissions|Comments|\n|:-:|--:|--:|\n");
        for (label, submissions, comments) in rows {
            let _ = writeln!(out, "|__{}__|{}|{}|", label, submissions, comments);
        }
        out.push('\n');
        out
    }

    pub fn top_submitters(&self, num: usize) -> String {
        let ranked = rank_authors(&self.aggregates.submitters, item_score);
        if num == 0 || ranked.is_empty() {
            return String::new();
        }

        let mut out = section_header("Top Submitters' Top Submissions");
        for rank in ranked.into_iter().take(num) {
            let _ = writeln!(
                out,
                "0. {} pts, {} submissions: {}",
                rank.points,
                rank.count(),
                author_link(rank.author)
            );
            let submissions = rank_by(rank.entries.iter().copied(), item_score);
            for item in submissions.into_iter().take(SUBMISSIONS_PER_SUBMITTER) {
                let _ = writeln!(
                    out,
                    "  0. {} ({} pts, [{} comments]({}))",
                    item_link(item),
                    item.score,
                    item.num_comments,
                    item.permalink
                );
            }
            out.push('\n');
        }
        out
    }

    pub fn top_commenters(&self, num: usize) -> String {
        let ranked = rank_authors(&self.aggregates.commenters, net_score);
        if num == 0 || ranked.is_empty() {
            return String::new();
        }

        let mut out = section_header("Top Commenters");
        for rank in ranked.into_iter().take(num) {
            let _ = writeln!(
                out,
                "0. {} ({} pts, {} comments)",
                author_link(rank.author),
                rank.points,
                rank.count()
            );
        }
        out.push('\n');
        out
    }

    pub fn top_submissions(&self, num: usize) -> String {
        if num == 0 || self.batch.items.is_empty() {
            return String::new();
        }

        let mut out = section_header("Top Submissions");
        for item in rank_by(&self.batch.items, item_score).into_iter().take(num) {
            let _ = writeln!(
                out,
                "0. {} by {} ({} pts, [{} comments]({}))",
                item_link(item),
                author_link(&item.author),
                item.score,
                item.num_comments,
                item.permalink
            );
        }
        out.push('\n');
        out
    }

    pub fn top_comments(&self, num: usize) -> String {
        if num == 0 || self.replies.is_empty() {
            return String::new();
        }

        let mut out = section_header("Top Comments");
        for reply in rank_by(self.replies, net_score).into_iter().take(num) {
            let _ = writeln!(
                out,
                "0. {} pts: {}'s [comment]({}) in {}",
                net_score(reply),
                author_link(&reply.author),
                reply.permalink,
                reply.parent_title
            );
        }
        out.push('\n');
        out
    }

    pub fn footer(&self) -> String {
        let previous = match &self.batch.previous_report {
            Some(link) => format!("[Previous Stat]({})  \n", link),
            None => String::new(),
        };
        format!(
            "{}{}{}",
            FOOTER_CREDIT,
            previous,
            self.template.marker.render(self.batch.window.max_date)
        )
    }

    pub fn build(&self, counts: &SectionCounts) -> Report {
        let mut body = self.basic_stats();
        body.push_str(&self.top_submitters(counts.submitters));
        body.push_str(&self.top_commenters(counts.commenters));
        body.push_str(&self.top_submissions(counts.submissions));
        body.push_str(&self.top_comments(counts.comments));
        body.push_str(&self.footer());

        let oversized = body.chars().count() > self.template.max_body_size;
        Report {
            title: self.title(),
            body,
            oversized,
        }
    }
}

fn section_header(title: &str) -> String {
    format!("---\n### {}\n", title)
}

fn author_link(author: &AuthorIdentity) -> String {
    match author {
        AuthorIdentity::Known(name) => format!("[{}](/user/{})", name, name),
        AuthorIdentity::Anonymous => AuthorIdentity::DELETED.to_string(),
    }
}

fn item_link(item: &Item) -> String {
    if item.is_link_post() {
        format!("[{}]({})", item.title, item.url)
    } else {
        item.title.clone()
    }
}

fn format_timestamp(timestamp: f64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp as i64, 0)
        .map(|time| time.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
