//! Reply intent classifier.
//!
//! One zero-temperature LLM call per matched email. The answer must be a
//! single category token; anything else, and any failure, resolves to
//! `ReplyLabel::OtherReply`.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Max tokens for the label answer.
const CLASSIFY_MAX_TOKENS: u32 = 16;

/// Snippet characters sent to the model.
const SNIPPET_PREVIEW_CHARS: usize = 1000;

/// Intent of a reply to a job application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyLabel {
    InitialInterview,
    CodingChallenge,
    TechnicalInterview,
    HrInterview,
    Rejection,
    Offer,
    OtherReply,
}

impl ReplyLabel {
    pub const ALL: [ReplyLabel; 7] = [
        Self::InitialInterview,
        Self::CodingChallenge,
        Self::TechnicalInterview,
        Self::HrInterview,
        Self::Rejection,
        Self::Offer,
        Self::OtherReply,
    ];

    /// Least disruptive label, used whenever classification is uncertain.
    pub const SAFE_DEFAULT: ReplyLabel = Self::OtherReply;

    /// Token the model is asked to answer with.
    pub fn token(self) -> &'static str {
        match self {
            Self::InitialInterview => "INITIAL_INTERVIEW",
            Self::CodingChallenge => "CODING_CHALLENGE",
            Self::TechnicalInterview => "TECHNICAL_INTERVIEW",
            Self::HrInterview => "HR_INTERVIEW",
            Self::Rejection => "REJECTION",
            Self::Offer => "OFFER",
            Self::OtherReply => "OTHER_REPLY",
        }
    }

    /// Human-readable name, used for list names in summaries.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::InitialInterview => "Initial Interview",
            Self::CodingChallenge => "Coding Challenge",
            Self::TechnicalInterview => "Technical Interview",
            Self::HrInterview => "HR Interview",
            Self::Rejection => "Rejected",
            Self::Offer => "Offer",
            Self::OtherReply => "Other Reply",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::InitialInterview => "invitation to a first call or screening interview",
            Self::CodingChallenge => "take-home task, online assessment or coding test",
            Self::TechnicalInterview => "invitation to a technical or engineering interview",
            Self::HrInterview => "HR, culture-fit or final-round conversation",
            Self::Rejection => "the application will not move forward",
            Self::Offer => "a job offer",
            Self::OtherReply => "anything else, including acknowledgements",
        }
    }

    /// Parse a single token; `None` for anything not in the label set.
    pub fn from_token(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .to_ascii_uppercase()
            .replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|l| l.token() == normalized)
    }
}

impl fmt::Display for ReplyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Map raw model output to a label, falling back to the safe default.
pub fn parse_label_response(raw: &str) -> ReplyLabel {
    let first_line = raw.trim().lines().next().unwrap_or_default();
    match ReplyLabel::from_token(first_line) {
        Some(label) => label,
        None => {
            warn!(raw_response = %raw, "Unrecognized classification, using safe default");
            ReplyLabel::SAFE_DEFAULT
        }
    }
}

fn build_system_prompt() -> String {
    let mut prompt = String::from(
        "You classify replies to job applications. \
         Answer with exactly one of the following tokens and nothing else:\n",
    );
    for label in ReplyLabel::ALL {
        prompt.push_str(&format!("- {}: {}\n", label.token(), label.description()));
    }
    prompt.push_str("If unsure, answer OTHER_REPLY.");
    prompt
}

fn build_user_prompt(subject: &str, snippet: &str) -> String {
    let preview: String = snippet.chars().take(SNIPPET_PREVIEW_CHARS).collect();
    format!("Subject: {subject}\n\nSnippet:\n{preview}")
}

/// Classifies reply emails. Without a provider every reply is `OtherReply`.
pub struct ReplyClassifier {
    llm: Option<Arc<dyn LlmProvider>>,
}

impl ReplyClassifier {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { llm }
    }

    pub async fn classify(&self, subject: &str, snippet: &str) -> ReplyLabel {
        let Some(llm) = self.llm.as_ref() else {
            debug!("No classifier configured, using safe default");
            return ReplyLabel::SAFE_DEFAULT;
        };

        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_system_prompt()),
            ChatMessage::user(build_user_prompt(subject, snippet)),
        ])
        .with_temperature(0.0)
        .with_max_tokens(CLASSIFY_MAX_TOKENS);

        match llm.complete(request).await {
            Ok(response) => parse_label_response(&response.content),
            Err(e) => {
                warn!(error = %e, "Classifier call failed, using safe default");
                ReplyLabel::SAFE_DEFAULT
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::CompletionResponse;

    struct FixedLlm(Result<String, ()>);

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            assert_eq!(request.temperature, Some(0.0));
            assert!(!request.web_search);
            match &self.0 {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    input_tokens: 10,
                    output_tokens: 1,
                    response_id: None,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "fixed".into(),
                    reason: "down".into(),
                }),
            }
        }
    }

    fn classifier(answer: Result<&str, ()>) -> ReplyClassifier {
        ReplyClassifier::new(Some(Arc::new(FixedLlm(answer.map(str::to_string)))))
    }

    #[test]
    fn every_token_parses_back() {
        for label in ReplyLabel::ALL {
            assert_eq!(ReplyLabel::from_token(label.token()), Some(label));
        }
    }

    #[test]
    fn parse_tolerates_formatting_noise() {
        assert_eq!(parse_label_response(" rejection \n"), ReplyLabel::Rejection);
        assert_eq!(parse_label_response("`OFFER`."), ReplyLabel::Offer);
        assert_eq!(
            parse_label_response("\"technical interview\""),
            ReplyLabel::TechnicalInterview
        );
        assert_eq!(parse_label_response("hr-interview"), ReplyLabel::HrInterview);
    }

    #[test]
    fn parse_unknown_falls_back_to_other_reply() {
        assert_eq!(parse_label_response("MAYBE"), ReplyLabel::OtherReply);
        assert_eq!(parse_label_response(""), ReplyLabel::OtherReply);
        assert_eq!(
            parse_label_response("I think this is a rejection"),
            ReplyLabel::OtherReply
        );
    }

    #[test]
    fn system_prompt_lists_every_token() {
        let prompt = build_system_prompt();
        for label in ReplyLabel::ALL {
            assert!(prompt.contains(label.token()));
        }
    }

    #[test]
    fn user_prompt_truncates_snippet() {
        let prompt = build_user_prompt("Hi", &"x".repeat(5000));
        assert!(prompt.len() < SNIPPET_PREVIEW_CHARS + 50);
        assert!(prompt.starts_with("Subject: Hi"));
    }

    #[tokio::test]
    async fn classify_uses_model_answer() {
        let label = classifier(Ok("REJECTION"))
            .classify("Your application", "Unfortunately")
            .await;
        assert_eq!(label, ReplyLabel::Rejection);
    }

    #[tokio::test]
    async fn classify_service_error_is_safe_default() {
        let label = classifier(Err(())).classify("s", "b").await;
        assert_eq!(label, ReplyLabel::OtherReply);
    }

    #[tokio::test]
    async fn classify_without_provider_is_safe_default() {
        let label = ReplyClassifier::new(None).classify("Offer letter", "Congrats").await;
        assert_eq!(label, ReplyLabel::OtherReply);
    }
}
