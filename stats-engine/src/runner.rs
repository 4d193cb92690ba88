//! One complete stats run, from listing scan to publication.

use crate::aggregate::aggregate;
use crate::marker::MarkerFormat;
use crate::publish::{Confirm, PublishOutcome, Publisher};
use crate::replies::collect_replies;
use crate::report::{ReportTemplate, Reporter, SectionCounts};
use crate::window::{Selection, SelectionRequest, WindowSelector};
use stats_core::{CoreError, ItemSource, ReportSettings, ReportSink, RetryConfig};
use std::io::Write;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub subreddit: String,
    /// Where the report is posted; the scanned subreddit when unset.
    pub destination: Option<String>,
    pub submitters: usize,
    pub commenters: usize,
    /// `0` means no limit.
    pub days: u32,
    pub after: Option<String>,
    pub debug: bool,
    /// URL or id of the last published report.
    pub previous_report: Option<String>,
    /// Current time in epoch seconds.
    pub now: f64,
}

impl RunOptions {
    pub fn destination(&self) -> &str {
        self.destination.as_deref().unwrap_or(&self.subreddit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was posted in the window.
    NoItems,
    Completed(PublishOutcome),
}

pub struct StatsRun<'a, S: ItemSource + ?Sized, K: ReportSink + ?Sized> {
    source: &'a S,
    sink: &'a K,
    settings: &'a ReportSettings,
    publish_retry: RetryConfig,
}

impl<'a, S, K> StatsRun<'a, S, K>
where
    S: ItemSource + ?Sized,
    K: ReportSink + ?Sized,
{
    pub fn new(source: &'a S, sink: &'a K, settings: &'a ReportSettings) -> Self {
        Self {
            source,
            sink,
            settings,
            publish_retry: RetryConfig::publish(),
        }
    }

    pub fn with_publish_retry(mut self, config: RetryConfig) -> Self {
        self.publish_retry = config;
        self
    }

    pub async fn run<C, W>(&self, options: &RunOptions, confirm: &mut C, out: &mut W) -> Result<RunOutcome, CoreError>
    where
        C: Confirm + ?Sized,
        W: Write + ?Sized,
    {
        let marker = MarkerFormat::new(&self.settings.marker_label)?;

        let (prior_marker, previous_report) = match &options.previous_report {
            Some(reference) => {
                let report = self.source.get_item(reference).await?;
                let value = marker.recover(&report)?;
                debug!("Previous report {} ends at {}", report.permalink, value);
                (Some(value), Some(report.permalink))
            }
            None => (None, None),
        };

        let request = SelectionRequest {
            section: options.subreddit.clone(),
            now: options.now,
            recency_guard_days: self.settings.recency_guard_days,
            max_duration_days: options.days,
            prior_marker,
            previous_report,
            after: options.after.clone(),
            page_limit: self.settings.page_limit,
            since_last: true,
        };
        let selector = WindowSelector::new(self.settings.title_prefix.clone(), marker.clone());
        let batch = match selector.select(self.source, &request).await? {
            Selection::Empty => return Ok(RunOutcome::NoItems),
            Selection::Batch(batch) => batch,
        };

        let replies = if options.commenters > 0 {
            collect_replies(self.source, &batch.items).await?
        } else {
            Vec::new()
        };

        let aggregates = aggregate(&batch.items, &replies);
        info!(
            "{} submitters, {} commenters",
            aggregates.submitters.len(),
            aggregates.commenters.len()
        );

        let template = ReportTemplate {
            title_prefix: self.settings.title_prefix.clone(),
            marker,
            max_body_size: self.settings.max_body_size,
        };
        let counts = SectionCounts {
            submitters: options.submitters,
            commenters: options.commenters,
            submissions: self.settings.top_submissions,
            comments: self.settings.top_comments,
        };
        let report = Reporter::new(&template, &options.subreddit, &batch, &replies, &aggregates).build(&counts);

        let publisher = Publisher::with_retry(self.sink, self.publish_retry.clone());
        let outcome = publisher
            .publish(options.destination(), &report, options.debug, confirm, out)
            .await?;
        info!("Run finished: {}", outcome);
        Ok(RunOutcome::Completed(outcome))
    }
}
