//! Run reports shared by both pipelines.

use crate::notify::{Notification, bullet_list};

/// A card moved (or, in a dry run, that would have moved) during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedCard {
    pub card_name: String,
    pub list_name: String,
    /// Email subject or job name that triggered the move.
    pub source: String,
}

impl MovedCard {
    pub fn line(&self) -> String {
        format!("{} → {} ({})", self.card_name, self.list_name, self.source)
    }
}

/// Outcome of one `replies` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyRunReport {
    /// Unread messages whose metadata was fetched.
    pub processed: usize,
    /// Messages not addressed to the configured recipient.
    pub skipped: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Matched, but the label has no destination.
    pub no_action: usize,
    pub failures: usize,
    pub dry_run: bool,
    pub moved: Vec<MovedCard>,
}

impl ReplyRunReport {
    /// Summary push, or `None` when nothing worth reporting happened.
    pub fn notification(&self) -> Option<Notification> {
        if self.moved.is_empty() && self.failures == 0 {
            return None;
        }
        let mut body = format!(
            "Processed {} email(s): {} matched, {} moved, {} unmatched, {} failure(s)",
            self.processed,
            self.matched,
            self.moved.len(),
            self.unmatched,
            self.failures
        );
        if !self.moved.is_empty() {
            body.push_str("\n\n");
            body.push_str(&bullet_list(self.moved.iter().map(MovedCard::line)));
        }
        let title = if self.moved.len() == 1 {
            "Job replies: 1 card moved".to_string()
        } else {
            format!("Job replies: {} cards moved", self.moved.len())
        };
        Some(Notification::new(title, body).with_tag("email"))
    }
}

/// Outcome of one `jobs` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRunReport {
    pub checked: usize,
    pub active: usize,
    /// Cards without a usable URL.
    pub skipped: usize,
    pub failures: usize,
    pub dry_run: bool,
    pub moved: Vec<MovedCard>,
}

impl StatusRunReport {
    /// Summary push, or `None` when nothing worth reporting happened.
    pub fn notification(&self) -> Option<Notification> {
        if self.moved.is_empty() && self.failures == 0 {
            return None;
        }
        let mut body = format!(
            "Checked {} posting(s): {} active, {} deleted, {} skipped, {} failure(s)",
            self.checked,
            self.active,
            self.moved.len(),
            self.skipped,
            self.failures
        );
        if !self.moved.is_empty() {
            body.push_str("\n\n");
            body.push_str(&bullet_list(self.moved.iter().map(MovedCard::line)));
        }
        let title = format!("Job postings: {} removed", self.moved.len());
        Some(Notification::new(title, body).with_tag("wastebasket"))
    }
}
