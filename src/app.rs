//! Wiring: build the collaborators for one run from validated configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{GoogleAuthConfig, ReplyJobConfig, StatusJobConfig};
use crate::error::Error;
use crate::gmail::{GmailClient, TokenManager, auth};
use crate::llm::create_provider;
use crate::notify::{Notification, NtfyNotifier, Priority};
use crate::pipeline::{
    ListRouter, ReplyClassifier, ReplyDeps, ReplyPipeline, ReplyRunReport, ReplySettings,
    StatusChecker, StatusDeps, StatusPipeline, StatusRunReport, StatusSettings,
};
use crate::trello::TrelloClient;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Which batch job is running, for logs and crash reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Replies,
    Jobs,
    Authorize,
}

impl Job {
    pub fn name(self) -> &'static str {
        match self {
            Self::Replies => "reply classifier",
            Self::Jobs => "job status checker",
            Self::Authorize => "gmail authorization",
        }
    }
}

/// Shared HTTP client for every collaborator in a run.
pub fn http_client() -> Result<reqwest::Client, Error> {
    Ok(reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("jobtrack/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Push sent when a run aborts.
pub fn failure_notification(job: Job, error: &str, is_config: bool) -> Notification {
    let title = if is_config {
        format!("jobtrack {}: configuration error", job.name())
    } else {
        format!("jobtrack {} crashed", job.name())
    };
    Notification::new(title, error.to_string())
        .with_priority(Priority::High)
        .with_tag("rotating_light")
}

/// `jobtrack replies`
pub async fn run_replies(dry_run: bool) -> Result<ReplyRunReport, Error> {
    let config = ReplyJobConfig::from_env()?;
    let http = http_client()?;
    let tokens = TokenManager::load(http.clone(), &config.google)?;

    let deps = ReplyDeps {
        mailbox: Arc::new(GmailClient::new(http.clone(), tokens)),
        board: Arc::new(TrelloClient::new(http.clone(), &config.trello)),
        classifier: ReplyClassifier::new(
            config
                .llm
                .as_ref()
                .map(|llm| create_provider(llm, http.clone())),
        ),
        router: ListRouter::new(config.routes.clone()),
        notifier: Arc::new(NtfyNotifier::new(http, &config.notify)),
    };
    let settings = ReplySettings {
        watch_list_ids: config.watch_list_ids,
        recipient_email: config.recipient_email,
        max_results: config.gmail_max_results,
        dry_run,
    };

    ReplyPipeline::new(deps, settings).run().await
}

/// `jobtrack jobs`
pub async fn run_jobs(dry_run: bool) -> Result<StatusRunReport, Error> {
    let config = StatusJobConfig::from_env()?;
    let http = http_client()?;

    let deps = StatusDeps {
        board: Arc::new(TrelloClient::new(http.clone(), &config.trello)),
        checker: StatusChecker::new(create_provider(&config.llm, http.clone())),
        notifier: Arc::new(NtfyNotifier::new(http, &config.notify)),
    };
    let settings = StatusSettings {
        dry_run,
        ..StatusSettings::new(config.jobs_list_id, config.deleted_list)
    };

    StatusPipeline::new(deps, settings).run().await
}

/// `jobtrack authorize`
pub async fn authorize() -> Result<(), Error> {
    let config = GoogleAuthConfig::from_env()?;
    let http = http_client()?;
    auth::authorize_interactive(&http, &config).await?;
    Ok(())
}
