use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use jobtrack::app::{self, Job};
use jobtrack::config::NotifyConfig;
use jobtrack::error::Error;
use jobtrack::notify::{NtfyNotifier, send_best_effort};

#[derive(Parser)]
#[command(name = "jobtrack", version, about = "Keep a Trello job board in sync with Gmail replies")]
struct Cli {
    /// Classify and log, but do not move cards, mark mail read or notify.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match unread replies to cards and move them by intent.
    Replies,
    /// Re-check job postings and move deleted ones.
    Jobs,
    /// One-time Gmail consent; writes the token file.
    Authorize,
}

/// Logs go to stderr; also to a daily file under `JOBTRACK_LOG_DIR` when set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match std::env::var("JOBTRACK_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "jobtrack.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(file)
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .init();
            None
        }
    }
}

async fn run(job: Job, dry_run: bool) -> Result<(), Error> {
    match job {
        Job::Replies => app::run_replies(dry_run).await.map(|_| ()),
        Job::Jobs => app::run_jobs(dry_run).await.map(|_| ()),
        Job::Authorize => app::authorize().await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let _log_guard = init_tracing();

    let cli = Cli::parse();
    let job = match cli.command {
        Command::Replies => Job::Replies,
        Command::Jobs => Job::Jobs,
        Command::Authorize => Job::Authorize,
    };
    if cli.dry_run {
        tracing::info!("Dry run: no cards will move and no mail will be marked read");
    }

    // Spawned so a panic surfaces as a JoinError instead of unwinding past us.
    let outcome = tokio::spawn(run(job, cli.dry_run)).await;

    let (message, is_config) = match outcome {
        Ok(Ok(())) => return ExitCode::SUCCESS,
        Ok(Err(e)) => {
            let is_config = e.is_config();
            let err = anyhow::Error::new(e).context(format!("{} failed", job.name()));
            tracing::error!("{err:?}");
            (format!("{err:#}"), is_config)
        }
        Err(join_err) => {
            tracing::error!(error = %join_err, "{} panicked", job.name());
            (join_err.to_string(), false)
        }
    };

    if job != Job::Authorize && !cli.dry_run {
        let notifier = match app::http_client() {
            Ok(http) => Some(NtfyNotifier::new(http, &NotifyConfig::from_env())),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot build HTTP client for crash notification");
                None
            }
        };
        if let Some(notifier) = notifier {
            let notification = app::failure_notification(job, &message, is_config);
            send_best_effort(&notifier, &notification).await;
        }
    }

    ExitCode::FAILURE
}
