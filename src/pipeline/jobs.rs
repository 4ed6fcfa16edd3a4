//! Job status pipeline: re-check every posting in one list and move the
//! dead ones to the deleted-jobs list.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::Error;
use crate::notify::{Notifier, send_best_effort};
use crate::pipeline::resolver::resolve_job_url;
use crate::pipeline::status::{JobStatus, StatusChecker};
use crate::pipeline::types::{MovedCard, StatusRunReport};
use crate::trello::{Board, ListTarget};

/// Pause between consecutive status checks, for the AI provider's rate limits.
pub const STATUS_CHECK_DELAY: Duration = Duration::from_secs(5);

/// Per-run options for the status pipeline.
#[derive(Debug, Clone)]
pub struct StatusSettings {
    pub jobs_list_id: String,
    pub deleted_list: ListTarget,
    pub dry_run: bool,
    pub check_delay: Duration,
}

impl StatusSettings {
    pub fn new(jobs_list_id: impl Into<String>, deleted_list: ListTarget) -> Self {
        Self {
            jobs_list_id: jobs_list_id.into(),
            deleted_list,
            dry_run: false,
            check_delay: STATUS_CHECK_DELAY,
        }
    }
}

/// Collaborators for one run.
pub struct StatusDeps {
    pub board: Arc<dyn Board>,
    pub checker: StatusChecker,
    pub notifier: Arc<dyn Notifier>,
}

/// Checks postings and archives the deleted ones.
pub struct StatusPipeline {
    deps: StatusDeps,
    settings: StatusSettings,
}

impl StatusPipeline {
    pub fn new(deps: StatusDeps, settings: StatusSettings) -> Self {
        Self { deps, settings }
    }

    /// Run once. Errors only when the card listing fails.
    pub async fn run(&self) -> Result<StatusRunReport, Error> {
        let mut report = StatusRunReport {
            dry_run: self.settings.dry_run,
            ..Default::default()
        };

        let cards = self
            .deps
            .board
            .list_cards(&self.settings.jobs_list_id)
            .await?;
        info!(cards = cards.len(), "Checking job postings");

        for card in &cards {
            let url = match resolve_job_url(self.deps.board.as_ref(), card).await {
                Ok(Some(url)) => url,
                Ok(None) => {
                    debug!(card = %card.name, "No posting URL, skipping");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(card = %card.name, error = %e, "Failed to read attachments");
                    report.failures += 1;
                    continue;
                }
            };

            if report.checked > 0 && !self.settings.check_delay.is_zero() {
                tokio::time::sleep(self.settings.check_delay).await;
            }
            report.checked += 1;

            let status = self.deps.checker.check(&url).await;
            info!(card = %card.name, url = %url, status = %status, "Checked posting");

            match status {
                JobStatus::Active => report.active += 1,
                JobStatus::Deleted => {
                    let target = &self.settings.deleted_list;
                    let moved = MovedCard {
                        card_name: card.name.clone(),
                        list_name: target.name.clone(),
                        source: url.clone(),
                    };
                    if self.settings.dry_run {
                        info!(card = %card.name, "Dry run: would move to deleted list");
                        report.moved.push(moved);
                        continue;
                    }
                    match self.deps.board.move_card(&card.id, &target.id).await {
                        Ok(()) => {
                            info!(card = %card.name, list = %target.name, "Moved deleted posting");
                            report.moved.push(moved);
                        }
                        Err(e) => {
                            error!(card = %card.name, error = %e, "Failed to move card");
                            report.failures += 1;
                        }
                    }
                }
            }
        }

        info!(
            checked = report.checked,
            active = report.active,
            deleted = report.moved.len(),
            skipped = report.skipped,
            failures = report.failures,
            "Status run complete"
        );

        if !self.settings.dry_run
            && let Some(notification) = report.notification()
        {
            send_best_effort(self.deps.notifier.as_ref(), &notification).await;
        }

        Ok(report)
    }
}
