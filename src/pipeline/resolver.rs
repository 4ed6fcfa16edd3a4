//! Attachment resolver: find the posting URL for a job card.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::TrelloError;
use crate::trello::{Attachment, Board, TrelloCard};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>()\[\]"']+"#).expect("valid URL regex"));

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// First linked (not uploaded) http(s) attachment.
pub fn pick_link(attachments: &[Attachment]) -> Option<&str> {
    attachments
        .iter()
        .find(|a| !a.is_upload && is_http(&a.url))
        .map(|a| a.url.as_str())
}

/// First http(s) URL in free text.
pub fn first_url(text: &str) -> Option<&str> {
    URL_RE
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']))
}

/// Posting URL for `card`: a link attachment, else a URL in the description.
pub async fn resolve_job_url(
    board: &dyn Board,
    card: &TrelloCard,
) -> Result<Option<String>, TrelloError> {
    let attachments = board.list_attachments(&card.id).await?;
    Ok(pick_link(&attachments)
        .or_else(|| first_url(&card.desc))
        .map(str::to_string))
}
