//! Error types for jobtrack.

use std::time::Duration;

/// Top-level error type for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Trello error: {0}")]
    Trello(#[from] TrelloError),

    #[error("Gmail error: {0}")]
    Gmail(#[from] GmailError),

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the run failed on setup the user must fix: missing settings or
    /// an unusable Gmail token, including one that failed to refresh mid-run.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Auth(_) | Self::Gmail(GmailError::Auth(_))
        )
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Trello REST errors.
#[derive(Debug, thiserror::Error)]
pub enum TrelloError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Trello returned {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

/// Gmail REST errors.
#[derive(Debug, thiserror::Error)]
pub enum GmailError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Gmail returned {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),
}

/// OAuth token errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No token at {path}; run `jobtrack authorize` first")]
    TokenMissing { path: String },

    #[error("Token at {path} lacks scopes {missing:?}; run `jobtrack authorize` again")]
    InsufficientScopes { path: String, missing: Vec<String> },

    #[error("Token has no refresh token; run `jobtrack authorize` again")]
    NoRefreshToken,

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Invalid authorization input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Push notification errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to send notification to {topic}: {reason}")]
    SendFailed { topic: String, reason: String },
}

/// Result type alias for pipeline runs.
pub type Result<T> = std::result::Result<T, Error>;
