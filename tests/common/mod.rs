//! In-memory collaborators for pipeline integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use jobtrack::error::{GmailError, LlmError, NotifyError, TrelloError};
use jobtrack::gmail::{EmailMessage, Mailbox, MessageRef};
use jobtrack::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use jobtrack::notify::{Notification, Notifier};
use jobtrack::trello::{Attachment, Board, TrelloCard};

// ── Board ───────────────────────────────────────────────────────────

/// Board backed by a card list; `move_card` rewrites `id_list` in place.
#[derive(Default)]
pub struct MockBoard {
    pub cards: Mutex<Vec<TrelloCard>>,
    pub attachments: Mutex<HashMap<String, Vec<Attachment>>>,
    pub failing_moves: Mutex<HashSet<String>>,
    pub failing_attachments: Mutex<HashSet<String>>,
    pub fail_listing: bool,
    pub list_calls: Mutex<Vec<String>>,
    pub move_calls: Mutex<Vec<(String, String)>>,
}

impl MockBoard {
    pub fn with_cards(cards: Vec<TrelloCard>) -> Self {
        Self {
            cards: Mutex::new(cards),
            ..Default::default()
        }
    }

    pub fn attach(&self, card_id: &str, url: &str, is_upload: bool) {
        self.attachments
            .lock()
            .unwrap()
            .entry(card_id.to_string())
            .or_default()
            .push(Attachment {
                id: format!("att-{card_id}"),
                name: "posting".into(),
                url: url.into(),
                is_upload,
            });
    }

    pub fn list_of(&self, card_id: &str) -> String {
        self.cards
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == card_id)
            .map(|c| c.id_list.clone())
            .unwrap_or_default()
    }

    pub fn moves(&self) -> Vec<(String, String)> {
        self.move_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Board for MockBoard {
    async fn list_cards(&self, list_id: &str) -> Result<Vec<TrelloCard>, TrelloError> {
        self.list_calls.lock().unwrap().push(list_id.to_string());
        if self.fail_listing {
            return Err(TrelloError::Status {
                endpoint: format!("/lists/{list_id}/cards"),
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(self
            .cards
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.id_list == list_id)
            .cloned()
            .collect())
    }

    async fn list_attachments(&self, card_id: &str) -> Result<Vec<Attachment>, TrelloError> {
        if self.failing_attachments.lock().unwrap().contains(card_id) {
            return Err(TrelloError::RequestFailed {
                endpoint: format!("/cards/{card_id}/attachments"),
                reason: "timeout".into(),
            });
        }
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .get(card_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn move_card(&self, card_id: &str, list_id: &str) -> Result<(), TrelloError> {
        self.move_calls
            .lock()
            .unwrap()
            .push((card_id.to_string(), list_id.to_string()));
        if self.failing_moves.lock().unwrap().contains(card_id) {
            return Err(TrelloError::Status {
                endpoint: format!("/cards/{card_id}"),
                status: 429,
                body: "rate limited".into(),
            });
        }
        let mut cards = self.cards.lock().unwrap();
        if let Some(card) = cards.iter_mut().find(|c| c.id == card_id) {
            card.id_list = list_id.to_string();
        }
        Ok(())
    }
}

pub fn card(id: &str, list: &str, desc: &str) -> TrelloCard {
    TrelloCard {
        id: id.into(),
        name: format!("{id} card"),
        desc: desc.into(),
        id_list: list.into(),
    }
}

// ── Mailbox ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockMailbox {
    pub messages: Vec<EmailMessage>,
    pub unread: Mutex<HashSet<String>>,
    pub failing_gets: HashSet<String>,
    pub failing_mark_reads: HashSet<String>,
    pub get_calls: Mutex<Vec<String>>,
}

impl MockMailbox {
    pub fn with_messages(messages: Vec<EmailMessage>) -> Self {
        let unread = messages.iter().map(|m| m.id.clone()).collect();
        Self {
            messages,
            unread: Mutex::new(unread),
            ..Default::default()
        }
    }

    pub fn is_unread(&self, id: &str) -> bool {
        self.unread.lock().unwrap().contains(id)
    }
}

#[async_trait]
impl Mailbox for MockMailbox {
    async fn list_unread(&self, max_results: u32) -> Result<Vec<MessageRef>, GmailError> {
        let unread = self.unread.lock().unwrap();
        Ok(self
            .messages
            .iter()
            .filter(|m| unread.contains(&m.id))
            .take(max_results as usize)
            .map(|m| MessageRef {
                id: m.id.clone(),
                thread_id: m.thread_id.clone(),
            })
            .collect())
    }

    async fn get_message(&self, id: &str) -> Result<EmailMessage, GmailError> {
        self.get_calls.lock().unwrap().push(id.to_string());
        if self.failing_gets.contains(id) {
            return Err(GmailError::Status {
                endpoint: format!("/messages/{id}"),
                status: 404,
                body: "not found".into(),
            });
        }
        self.messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| GmailError::InvalidResponse {
                endpoint: format!("/messages/{id}"),
                reason: "unknown id".into(),
            })
    }

    async fn mark_read(&self, id: &str) -> Result<(), GmailError> {
        if self.failing_mark_reads.contains(id) {
            return Err(GmailError::Status {
                endpoint: format!("/messages/{id}/modify"),
                status: 500,
                body: "backend error".into(),
            });
        }
        self.unread.lock().unwrap().remove(id);
        Ok(())
    }
}

pub fn email(id: &str, thread_id: &str, from: &str, subject: &str) -> EmailMessage {
    EmailMessage {
        id: id.into(),
        thread_id: thread_id.into(),
        from: from.into(),
        to: "me@x.com".into(),
        subject: subject.into(),
        snippet: format!("{subject} snippet"),
        received_at: Utc::now(),
    }
}

// ── LLM ─────────────────────────────────────────────────────────────

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync>;

/// LLM whose answer is computed from the request.
pub struct MockLlm {
    responder: Responder,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlm {
    pub fn new(
        responder: impl Fn(&CompletionRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(answer: &'static str) -> Self {
        Self::new(move |_| Ok(answer.to_string()))
    }

    pub fn failing() -> Self {
        Self::new(|_| {
            Err(LlmError::RequestFailed {
                provider: "mock".into(),
                reason: "unavailable".into(),
            })
        })
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let answer = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        answer.map(|content| CompletionResponse {
            content,
            input_tokens: 0,
            output_tokens: 0,
            response_id: None,
        })
    }
}

// ── Notifier ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            return Err(NotifyError::SendFailed {
                topic: "mock".into(),
                reason: "offline".into(),
            });
        }
        Ok(())
    }
}
