//! Gmail collaborator: list unread inbox messages, fetch their headers,
//! and clear the UNREAD label.

pub mod auth;
pub mod types;

pub use auth::TokenManager;
pub use types::{EmailMessage, MessageRef};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::GmailError;

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const UNREAD_QUERY: &str = "is:unread in:inbox";

/// The mailbox operations the reply pipeline depends on.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Unread inbox messages, newest first, at most `max_results`.
    async fn list_unread(&self, max_results: u32) -> Result<Vec<MessageRef>, GmailError>;

    /// Headers and snippet of one message.
    async fn get_message(&self, id: &str) -> Result<EmailMessage, GmailError>;

    /// Remove the UNREAD label.
    async fn mark_read(&self, id: &str) -> Result<(), GmailError>;
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataResponse {
    id: String,
    thread_id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    internal_date: Option<String>,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

impl MetadataResponse {
    fn header(&self, name: &str) -> String {
        self.payload
            .as_ref()
            .and_then(|p| p.headers.iter().find(|h| h.name.eq_ignore_ascii_case(name)))
            .map(|h| h.value.clone())
            .unwrap_or_default()
    }

    fn into_message(self) -> EmailMessage {
        let received_at = self
            .internal_date
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now);
        EmailMessage {
            from: self.header("From"),
            to: self.header("To"),
            subject: self.header("Subject"),
            snippet: types::unescape_snippet(&self.snippet),
            received_at,
            id: self.id,
            thread_id: self.thread_id,
        }
    }
}

// ── HTTP client ─────────────────────────────────────────────────────

/// Gmail REST client authorized through a `TokenManager`.
pub struct GmailClient {
    http: reqwest::Client,
    tokens: TokenManager,
}

impl GmailClient {
    pub fn new(http: reqwest::Client, tokens: TokenManager) -> Self {
        Self { http, tokens }
    }

    async fn send(
        &self,
        endpoint: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GmailError> {
        let access_token = self.tokens.access_token().await?;
        let resp = builder
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| GmailError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(GmailError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: body.chars().take(300).collect(),
        })
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn list_unread(&self, max_results: u32) -> Result<Vec<MessageRef>, GmailError> {
        let endpoint = "/messages";
        let max_results = max_results.to_string();
        let builder = self
            .http
            .get(format!("{API_BASE}{endpoint}"))
            .query(&[("q", UNREAD_QUERY), ("maxResults", max_results.as_str())]);
        let listing: ListResponse = self
            .send(endpoint, builder)
            .await?
            .json()
            .await
            .map_err(|e| GmailError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        Ok(listing.messages)
    }

    async fn get_message(&self, id: &str) -> Result<EmailMessage, GmailError> {
        let endpoint = format!("/messages/{id}");
        let builder = self.http.get(format!("{API_BASE}{endpoint}")).query(&[
            ("format", "metadata"),
            ("metadataHeaders", "From"),
            ("metadataHeaders", "To"),
            ("metadataHeaders", "Subject"),
        ]);
        let metadata: MetadataResponse = self
            .send(&endpoint, builder)
            .await?
            .json()
            .await
            .map_err(|e| GmailError::InvalidResponse {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        Ok(metadata.into_message())
    }

    async fn mark_read(&self, id: &str) -> Result<(), GmailError> {
        let endpoint = format!("/messages/{id}/modify");
        let builder = self
            .http
            .post(format!("{API_BASE}{endpoint}"))
            .json(&serde_json::json!({ "removeLabelIds": ["UNREAD"] }));
        self.send(&endpoint, builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_listing_has_no_messages_field() {
        let listing: ListResponse = serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(listing.messages.is_empty());
    }

    #[test]
    fn metadata_converts_to_message() {
        let raw = r#"{
            "id": "18c1",
            "threadId": "18c0",
            "snippet": "We&#39;re sorry to inform you",
            "internalDate": "1700000000000",
            "payload": {"headers": [
                {"name": "From", "value": "\"HR\" <hr@acme.com>"},
                {"name": "to", "value": "me@x.com"},
                {"name": "Subject", "value": "Your application"}
            ]}
        }"#;
        let metadata: MetadataResponse = serde_json::from_str(raw).unwrap();
        let message = metadata.into_message();
        assert_eq!(message.id, "18c1");
        assert_eq!(message.thread_id, "18c0");
        assert_eq!(message.from, "\"HR\" <hr@acme.com>");
        assert_eq!(message.to, "me@x.com");
        assert_eq!(message.subject, "Your application");
        assert_eq!(message.snippet, "We're sorry to inform you");
        assert_eq!(message.received_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn missing_headers_become_empty() {
        let raw = r#"{"id": "1", "threadId": "1"}"#;
        let message = serde_json::from_str::<MetadataResponse>(raw)
            .unwrap()
            .into_message();
        assert!(message.from.is_empty());
        assert!(message.subject.is_empty());
    }
}
