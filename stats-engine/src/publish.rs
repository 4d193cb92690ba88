use crate::report::Report;
use stats_core::{CoreError, ErrorExt, ReportSink, RetryConfig, RetryExecutor};
use std::fmt;
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

/// Asks the operator before anything is posted.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// `y` or `yes` in any case; everything else, including an empty line, is no.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Prompt on stdout, answer from stdin.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_affirmative(&answer))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintReason {
    DebugRequested,
    Oversized,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    DebugPrinted(PrintReason),
    /// Submission gave up; carries the final error message.
    Failed(String),
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::Published => f.write_str("published"),
            PublishOutcome::DebugPrinted(PrintReason::DebugRequested) => f.write_str("printed (debug)"),
            PublishOutcome::DebugPrinted(PrintReason::Oversized) => f.write_str("printed (oversized)"),
            PublishOutcome::DebugPrinted(PrintReason::Declined) => f.write_str("printed (declined)"),
            PublishOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

pub struct Publisher<'a, K: ReportSink + ?Sized> {
    sink: &'a K,
    retry: RetryExecutor,
}

impl<'a, K: ReportSink + ?Sized> Publisher<'a, K> {
    pub fn new(sink: &'a K) -> Self {
        Self::with_retry(sink, RetryConfig::publish())
    }

    pub fn with_retry(sink: &'a K, config: RetryConfig) -> Self {
        Self {
            sink,
            retry: RetryExecutor::new(config),
        }
    }

    /// Post `report` to `destination`, or print it.
    ///
    /// Every path other than a successful post writes the title and body to
    /// `out`, so a run never loses its report.
    pub async fn publish<C, W>(
        &self,
        destination: &str,
        report: &Report,
        debug: bool,
        confirm: &mut C,
        out: &mut W,
    ) -> Result<PublishOutcome, CoreError>
    where
        C: Confirm + ?Sized,
        W: Write + ?Sized,
    {
        if debug || report.oversized {
            let reason = if debug {
                PrintReason::DebugRequested
            } else {
                info!(
                    "Report body is {} characters, printing instead of submitting",
                    report.body.chars().count()
                );
                PrintReason::Oversized
            };
            print_report(out, report)?;
            return Ok(PublishOutcome::DebugPrinted(reason));
        }

        let prompt = format!(
            "You are about to submit to subreddit {} as {}.\nAre you sure? yes/[no]: ",
            destination,
            self.sink.username()
        );
        let confirmed = confirm.confirm(&prompt).unwrap_or_else(|e| {
            warn!("Could not read confirmation, treating it as no: {}", e);
            false
        });
        if !confirmed {
            writeln!(out, "Submission aborted")?;
            print_report(out, report)?;
            return Ok(PublishOutcome::DebugPrinted(PrintReason::Declined));
        }

        let result = self
            .retry
            .execute("submit_report", || self.sink.submit(destination, &report.title, &report.body))
            .await;
        debug!("Publish retries: {:?}", self.retry.get_metrics());

        match result {
            Ok(()) => {
                info!("Submitted report to r/{}", destination);
                Ok(PublishOutcome::Published)
            }
            Err(e) => {
                e.log_warn();
                let message = e.user_friendly_message();
                writeln!(out, "The submission failed: {}", message)?;
                print_report(out, report)?;
                Ok(PublishOutcome::Failed(message))
            }
        }
    }
}

fn print_report<W: Write + ?Sized>(out: &mut W, report: &Report) -> io::Result<()> {
    writeln!(out, "{}", report.title)?;
    writeln!(out)?;
    writeln!(out, "{}", report.body)?;
    out.flush()
}
