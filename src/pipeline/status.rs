//! Job posting liveness checker.
//!
//! Asks a web-browsing model whether a posting is still open. Any doubt
//! resolves to `JobStatus::Active` so a live lead is never archived by
//! mistake.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Whether a posting is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Active,
    Deleted,
}

impl JobStatus {
    pub const SAFE_DEFAULT: JobStatus = Self::Active;

    pub fn token(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

const STATUS_SYSTEM_PROMPT: &str = "You check whether job postings are still open. \
Open the URL you are given and inspect the page.\n\
Answer DELETED if any of these hold:\n\
- the page returns 404 or says the page was not found\n\
- it says the position has been filled or closed\n\
- it says applications are no longer accepted\n\
- it redirects to a generic careers, search or home page instead of the posting\n\
Otherwise answer ACTIVE.\n\
Respond with exactly one word: ACTIVE or DELETED.";

/// Map raw model output to a status. Ambiguous or empty answers are `Active`.
pub fn parse_status_response(raw: &str) -> JobStatus {
    let words: Vec<String> = raw
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_uppercase())
        .collect();
    let says_deleted = words.iter().any(|w| w == "DELETED");
    let says_active = words.iter().any(|w| w == "ACTIVE");

    match (says_active, says_deleted) {
        (false, true) => JobStatus::Deleted,
        (true, false) => JobStatus::Active,
        _ => {
            warn!(raw_response = %raw, "Ambiguous status answer, assuming active");
            JobStatus::SAFE_DEFAULT
        }
    }
}

/// Checks one URL per call, no retries.
pub struct StatusChecker {
    llm: Arc<dyn LlmProvider>,
}

impl StatusChecker {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub async fn check(&self, url: &str) -> JobStatus {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(STATUS_SYSTEM_PROMPT),
            ChatMessage::user(format!("Job posting URL: {url}")),
        ])
        .with_temperature(0.0)
        .with_web_search();

        match self.llm.complete(request).await {
            Ok(response) => {
                let status = parse_status_response(&response.content);
                debug!(url = %url, status = %status, "Status check answered");
                status
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Status check failed, assuming active");
                JobStatus::SAFE_DEFAULT
            }
        }
    }
}
