use chrono::Utc;
use clap::{ArgAction, Parser};
use reddit_client::RedditClient;
use stats_core::{AppConfig, CoreError, ErrorExt, ErrorReporter, DEFAULT_CONFIG_FILE, DEFAULT_SITE};
use stats_engine::{RunOptions, RunOutcome, StatsRun, StdinConfirm};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USER_AGENT: &str = concat!("subreddit-stats/", env!("CARGO_PKG_VERSION"));

/// Gather statistics from a subreddit's recent submissions and post them.
#[derive(Parser, Debug)]
#[command(name = "subreddit-stats", version)]
struct Cli {
    /// Subreddit to analyze
    subreddit: String,

    /// Number of top submitters to display
    #[arg(short, long, default_value_t = 3)]
    submitters: usize,

    /// Number of top commenters to display
    #[arg(short, long, default_value_t = 3)]
    commenters: usize,

    /// Number of previous days to include submissions from; 0 for no limit
    #[arg(short, long, default_value_t = 7)]
    days: u32,

    /// Submission id to start the scan after
    #[arg(short, long)]
    after: Option<String>,

    /// Increase logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print the report instead of submitting it
    #[arg(short = 'D', long)]
    debug: bool,

    /// Subreddit to post the report to (defaults to the analyzed one)
    #[arg(short = 'R', long)]
    submission_reddit: Option<String>,

    /// URL of the previous report
    #[arg(long)]
    prev: Option<String>,

    /// Site section of the config file to log in with
    #[arg(short = 'S', long, default_value = DEFAULT_SITE)]
    site: String,

    /// Reddit username
    #[arg(short, long)]
    user: Option<String>,

    /// Reddit password, only together with --user
    #[arg(short, long)]
    pswd: Option<String>,

    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "subreddit_stats={level},stats_engine={level},stats_core={level},reddit_client={level}"
        ))
    });

    // stdout carries the report and prompts.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<RunOutcome, CoreError> {
    let config = AppConfig::load(&cli.config)?;
    let credentials = config.credentials(
        &cli.site,
        cli.user.as_deref(),
        cli.pswd.as_deref(),
        USER_AGENT,
    )?;

    let mut client = RedditClient::new(&credentials, config.report.max_more_requests)?;
    client.login().await?;

    info!("Analyzing r/{}", cli.subreddit);
    let options = RunOptions {
        subreddit: cli.subreddit,
        destination: cli.submission_reddit,
        submitters: cli.submitters,
        commenters: cli.commenters,
        days: cli.days,
        after: cli.after,
        debug: cli.debug,
        previous_report: cli.prev,
        now: Utc::now().timestamp() as f64,
    };

    let mut stdout = std::io::stdout();
    let outcome = StatsRun::new(&client, &client, &config.report)
        .run(&options, &mut StdinConfirm, &mut stdout)
        .await;
    client.log_metrics().await;
    outcome
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(RunOutcome::NoItems) => {
            println!("No submissions were found.");
            ExitCode::from(1)
        }
        Ok(RunOutcome::Completed(_)) => ExitCode::SUCCESS,
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            eprintln!("{}", e.user_friendly_message());
            ExitCode::from(1)
        }
    }
}
