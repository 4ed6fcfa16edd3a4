//! Reply pipeline: unread Gmail replies → matched Trello card → new list.
//!
//! Flow per run:
//! 1. Fetch candidate cards from every watched list (once)
//! 2. List unread inbox messages
//! 3. Per message: fetch headers → match card → classify → route → move
//! 4. Send a summary if anything moved or failed
//!
//! Messages are handled one at a time in listing order. A matched card is
//! dropped from the candidates at once, so it is matched at most once per run
//! whether or not it moves.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::gmail::{EmailMessage, Mailbox};
use crate::notify::{Notifier, send_best_effort};
use crate::pipeline::classifier::ReplyClassifier;
use crate::pipeline::matcher::find_card;
use crate::pipeline::router::ListRouter;
use crate::pipeline::types::{MovedCard, ReplyRunReport};
use crate::trello::{Board, TrelloCard};

/// Per-run options for the reply pipeline.
#[derive(Debug, Clone)]
pub struct ReplySettings {
    pub watch_list_ids: Vec<String>,
    pub recipient_email: Option<String>,
    pub max_results: u32,
    pub dry_run: bool,
}

/// Collaborators for one run.
pub struct ReplyDeps {
    pub mailbox: Arc<dyn Mailbox>,
    pub board: Arc<dyn Board>,
    pub classifier: ReplyClassifier,
    pub router: ListRouter,
    pub notifier: Arc<dyn Notifier>,
}

/// Matches unread replies to cards and moves them.
pub struct ReplyPipeline {
    deps: ReplyDeps,
    settings: ReplySettings,
}

impl ReplyPipeline {
    pub fn new(deps: ReplyDeps, settings: ReplySettings) -> Self {
        Self { deps, settings }
    }

    /// Run once. Errors only when the initial card or message listing fails.
    pub async fn run(&self) -> Result<ReplyRunReport, Error> {
        let mut report = ReplyRunReport {
            dry_run: self.settings.dry_run,
            ..Default::default()
        };

        let mut candidates = self.fetch_candidates().await?;
        let refs = self
            .deps
            .mailbox
            .list_unread(self.settings.max_results)
            .await?;

        if refs.is_empty() {
            info!("No unread messages");
            return Ok(report);
        }
        info!(
            messages = refs.len(),
            cards = candidates.len(),
            "Processing unread messages"
        );

        for message_ref in refs {
            let message = match self.deps.mailbox.get_message(&message_ref.id).await {
                Ok(m) => m,
                Err(e) => {
                    error!(id = %message_ref.id, error = %e, "Failed to fetch message");
                    report.failures += 1;
                    continue;
                }
            };
            report.processed += 1;
            self.handle_message(&message, &mut candidates, &mut report)
                .await;
        }

        info!(
            processed = report.processed,
            matched = report.matched,
            moved = report.moved.len(),
            unmatched = report.unmatched,
            failures = report.failures,
            "Reply run complete"
        );

        if !self.settings.dry_run
            && let Some(notification) = report.notification()
        {
            send_best_effort(self.deps.notifier.as_ref(), &notification).await;
        }

        Ok(report)
    }

    async fn fetch_candidates(&self) -> Result<Vec<TrelloCard>, Error> {
        let mut cards = Vec::new();
        for list_id in &self.settings.watch_list_ids {
            cards.extend(self.deps.board.list_cards(list_id).await?);
        }
        Ok(cards)
    }

    async fn handle_message(
        &self,
        message: &EmailMessage,
        candidates: &mut Vec<TrelloCard>,
        report: &mut ReplyRunReport,
    ) {
        if let Some(recipient) = self.settings.recipient_email.as_deref()
            && !message.is_addressed_to(recipient)
        {
            debug!(id = %message.id, to = %message.to, "Not addressed to recipient, skipping");
            report.skipped += 1;
            return;
        }

        let domain = message.sender_domain();
        let Some(found) = find_card(candidates, &message.thread_id, domain.as_deref()) else {
            debug!(
                id = %message.id,
                from = %message.from,
                "No matching card, leaving unread"
            );
            report.unmatched += 1;
            return;
        };
        report.matched += 1;
        let (index, reason) = (found.index, found.reason);
        // Claimed by this message whatever happens next.
        let card = candidates.remove(index);
        info!(
            id = %message.id,
            card = %card.name,
            by = reason.label(),
            "Matched email to card"
        );

        let label = self
            .deps
            .classifier
            .classify(&message.subject, &message.snippet)
            .await;

        let Some(target) = self.deps.router.destination(label) else {
            info!(card = %card.name, label = %label, "No destination for label, leaving card");
            report.no_action += 1;
            return;
        };

        let needs_move = card.id_list != target.id;
        let moved = MovedCard {
            card_name: card.name.clone(),
            list_name: target.name.clone(),
            source: message.subject.clone(),
        };

        if self.settings.dry_run {
            if needs_move {
                info!(card = %card.name, label = %label, list = %target.name, "Dry run: would move card");
                report.moved.push(moved);
            } else {
                debug!(card = %card.name, list = %target.name, "Dry run: card already in destination list");
            }
            return;
        }

        if needs_move {
            if let Err(e) = self.deps.board.move_card(&card.id, &target.id).await {
                error!(card = %card.name, error = %e, "Failed to move card");
                report.failures += 1;
                return;
            }
            info!(card = %card.name, label = %label, list = %target.name, "Moved card");
        } else {
            debug!(card = %card.name, list = %target.name, "Card already in destination list");
        }

        if let Err(e) = self.deps.mailbox.mark_read(&message.id).await {
            warn!(id = %message.id, error = %e, "Failed to mark message read");
            report.failures += 1;
        }

        if needs_move {
            report.moved.push(moved);
        }
    }
}
