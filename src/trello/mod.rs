//! Trello REST wrapper.
//!
//! Only three endpoints are used: cards of a list, attachments of a card,
//! and list reassignment of a card. Authentication is a static key/token
//! pair passed as query parameters.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::TrelloConfig;
use crate::error::TrelloError;

const API_BASE: &str = "https://api.trello.com/1";

// ── Types ───────────────────────────────────────────────────────────

/// A Trello card. Only `id_list` is ever changed by jobtrack.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrelloCard {
    pub id: String,
    pub name: String,
    /// Free-text description carrying `threadId:` and `domain:` tags.
    #[serde(default)]
    pub desc: String,
    #[serde(rename = "idList")]
    pub id_list: String,
}

/// A card attachment (uploaded file or linked URL).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "isUpload", default)]
    pub is_upload: bool,
}

/// A destination list: id for the API call, name for the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTarget {
    pub id: String,
    pub name: String,
}

// ── Board trait ─────────────────────────────────────────────────────

/// The board operations the pipelines depend on.
#[async_trait]
pub trait Board: Send + Sync {
    /// Cards currently in `list_id`, in board order.
    async fn list_cards(&self, list_id: &str) -> Result<Vec<TrelloCard>, TrelloError>;

    /// Attachments of a card.
    async fn list_attachments(&self, card_id: &str) -> Result<Vec<Attachment>, TrelloError>;

    /// Reassign a card to another list.
    async fn move_card(&self, card_id: &str, list_id: &str) -> Result<(), TrelloError>;
}

// ── HTTP client ─────────────────────────────────────────────────────

/// Trello client over `reqwest`.
pub struct TrelloClient {
    http: reqwest::Client,
    api_key: SecretString,
    token: SecretString,
}

impl TrelloClient {
    pub fn new(http: reqwest::Client, config: &TrelloConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            token: config.token.clone(),
        }
    }

    fn auth(&self) -> [(&'static str, &str); 2] {
        [
            ("key", self.api_key.expose_secret()),
            ("token", self.token.expose_secret()),
        ]
    }

    async fn check(endpoint: &str, resp: reqwest::Response) -> Result<reqwest::Response, TrelloError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TrelloError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: body.chars().take(300).collect(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TrelloError> {
        let resp = self
            .http
            .get(format!("{API_BASE}{endpoint}"))
            .query(&self.auth())
            .query(query)
            .send()
            .await
            .map_err(|e| TrelloError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        Self::check(endpoint, resp)
            .await?
            .json::<T>()
            .await
            .map_err(|e| TrelloError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Board for TrelloClient {
    async fn list_cards(&self, list_id: &str) -> Result<Vec<TrelloCard>, TrelloError> {
        let endpoint = format!("/lists/{list_id}/cards");
        let cards: Vec<TrelloCard> = self
            .get_json(&endpoint, &[("fields", "id,name,desc,idList")])
            .await?;
        tracing::debug!(list = %list_id, count = cards.len(), "Fetched Trello cards");
        Ok(cards)
    }

    async fn list_attachments(&self, card_id: &str) -> Result<Vec<Attachment>, TrelloError> {
        let endpoint = format!("/cards/{card_id}/attachments");
        self.get_json(&endpoint, &[("fields", "id,name,url,isUpload")])
            .await
    }

    async fn move_card(&self, card_id: &str, list_id: &str) -> Result<(), TrelloError> {
        let endpoint = format!("/cards/{card_id}");
        let resp = self
            .http
            .put(format!("{API_BASE}{endpoint}"))
            .query(&self.auth())
            .query(&[("idList", list_id)])
            .send()
            .await
            .map_err(|e| TrelloError::RequestFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        Self::check(&endpoint, resp).await?;
        Ok(())
    }
}
