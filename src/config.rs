//! Configuration types.
//!
//! Every recognized environment variable is read here, once, before any
//! pipeline runs. Each subcommand gets a single validated struct.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::LlmConfig;
use crate::trello::ListTarget;

/// Default OpenAI model for both classifiers.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default ntfy server.
pub const DEFAULT_NTFY_SERVER: &str = "https://ntfy.sh";

const DEFAULT_TOKEN_PATH: &str = "token.json";
const DEFAULT_GMAIL_MAX_RESULTS: u32 = 50;
const GMAIL_MAX_RESULTS_LIMIT: u32 = 500;
const DEFAULT_DELETED_LIST_NAME: &str = "Deleted";

// ── Lookup helpers ──────────────────────────────────────────────────

/// Source of configuration values. `std::env::var` in production, a map in tests.
pub trait Lookup {
    fn get(&self, key: &str) -> Option<String>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key).filter(|v| !v.trim().is_empty())
    }
}

/// Lookup backed by the process environment.
pub fn env_lookup() -> impl Lookup {
    |key: &str| std::env::var(key).ok()
}

fn required(lookup: &impl Lookup, key: &str) -> Result<String, ConfigError> {
    lookup
        .get(key)
        .map(|v| v.trim().to_string())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn optional(lookup: &impl Lookup, key: &str) -> Option<String> {
    lookup.get(key).map(|v| v.trim().to_string())
}

fn required_secret(lookup: &impl Lookup, key: &str) -> Result<SecretString, ConfigError> {
    required(lookup, key).map(SecretString::from)
}

// ── Shared sections ─────────────────────────────────────────────────

/// Trello API credentials.
#[derive(Debug, Clone)]
pub struct TrelloConfig {
    pub api_key: SecretString,
    pub token: SecretString,
}

impl TrelloConfig {
    pub fn load(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: required_secret(lookup, "TRELLO_API_KEY")?,
            token: required_secret(lookup, "TRELLO_TOKEN")?,
        })
    }
}

/// Push notification target. A missing topic disables sending.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub server: String,
    pub topic: Option<String>,
}

impl NotifyConfig {
    pub fn load(lookup: &impl Lookup) -> Self {
        let server = optional(lookup, "NTFY_SERVER")
            .unwrap_or_else(|| DEFAULT_NTFY_SERVER.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            server,
            topic: optional(lookup, "NTFY_TOPIC"),
        }
    }

    pub fn from_env() -> Self {
        Self::load(&env_lookup())
    }
}

/// Google OAuth client credentials and token storage.
#[derive(Debug, Clone)]
pub struct GoogleAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub token_path: PathBuf,
}

impl GoogleAuthConfig {
    pub fn load(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: required(lookup, "GOOGLE_CLIENT_ID")?,
            client_secret: required_secret(lookup, "GOOGLE_CLIENT_SECRET")?,
            token_path: optional(lookup, "GMAIL_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH)),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&env_lookup())
    }
}

fn llm_config(lookup: &impl Lookup) -> Option<LlmConfig> {
    let api_key = optional(lookup, "OPENAI_API_KEY")?;
    Some(LlmConfig {
        api_key: SecretString::from(api_key),
        model: optional(lookup, "OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
    })
}

// ── Reply classifier ────────────────────────────────────────────────

/// Destination list ids for each reply label. Unset entries mean "no action".
#[derive(Debug, Clone, Default)]
pub struct ReplyRoutes {
    pub initial_interview: Option<String>,
    pub coding_challenge: Option<String>,
    pub technical_interview: Option<String>,
    pub hr_interview: Option<String>,
    pub rejected: Option<String>,
    pub other_reply: Option<String>,
}

impl ReplyRoutes {
    pub fn load(lookup: &impl Lookup) -> Self {
        Self {
            initial_interview: optional(lookup, "LIST_ID_INITIAL_INTERVIEW"),
            coding_challenge: optional(lookup, "LIST_ID_CODING_CHALLENGE"),
            technical_interview: optional(lookup, "LIST_ID_TECHNICAL_INTERVIEW"),
            hr_interview: optional(lookup, "LIST_ID_HR_INTERVIEW"),
            rejected: optional(lookup, "LIST_ID_REJECTED"),
            other_reply: optional(lookup, "LIST_ID_OTHER_REPLY"),
        }
    }
}

/// Everything `jobtrack replies` needs.
#[derive(Debug, Clone)]
pub struct ReplyJobConfig {
    pub trello: TrelloConfig,
    pub google: GoogleAuthConfig,
    /// `None` when `OPENAI_API_KEY` is unset; every reply then classifies as other-reply.
    pub llm: Option<LlmConfig>,
    /// Lists whose cards are candidates for matching, in fetch order.
    pub watch_list_ids: Vec<String>,
    pub routes: ReplyRoutes,
    /// Only messages addressed to this recipient are considered.
    pub recipient_email: Option<String>,
    pub gmail_max_results: u32,
    pub notify: NotifyConfig,
}

impl ReplyJobConfig {
    pub fn load(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let watch_list_ids: Vec<String> = required(lookup, "TRELLO_WATCH_LIST_IDS")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if watch_list_ids.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "TRELLO_WATCH_LIST_IDS".into(),
                message: "must name at least one list id".into(),
            });
        }

        let gmail_max_results = match optional(lookup, "GMAIL_MAX_RESULTS") {
            Some(raw) => {
                let n: u32 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "GMAIL_MAX_RESULTS".into(),
                    message: format!("'{raw}' is not a positive integer"),
                })?;
                if n == 0 || n > GMAIL_MAX_RESULTS_LIMIT {
                    return Err(ConfigError::InvalidValue {
                        key: "GMAIL_MAX_RESULTS".into(),
                        message: format!("must be between 1 and {GMAIL_MAX_RESULTS_LIMIT}"),
                    });
                }
                n
            }
            None => DEFAULT_GMAIL_MAX_RESULTS,
        };

        Ok(Self {
            trello: TrelloConfig::load(lookup)?,
            google: GoogleAuthConfig::load(lookup)?,
            llm: llm_config(lookup),
            watch_list_ids,
            routes: ReplyRoutes::load(lookup),
            recipient_email: optional(lookup, "RECIPIENT_EMAIL").map(|s| s.to_lowercase()),
            gmail_max_results,
            notify: NotifyConfig::load(lookup),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&env_lookup())
    }
}

// ── Job status checker ──────────────────────────────────────────────

/// Everything `jobtrack jobs` needs.
#[derive(Debug, Clone)]
pub struct StatusJobConfig {
    pub trello: TrelloConfig,
    pub llm: LlmConfig,
    pub jobs_list_id: String,
    pub deleted_list: ListTarget,
    pub notify: NotifyConfig,
}

impl StatusJobConfig {
    pub fn load(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let llm = llm_config(lookup)
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".into()))?;
        Ok(Self {
            trello: TrelloConfig::load(lookup)?,
            llm,
            jobs_list_id: required(lookup, "TRELLO_JOBS_LIST_ID")?,
            deleted_list: ListTarget {
                id: required(lookup, "TRELLO_DELETED_LIST_ID")?,
                name: optional(lookup, "TRELLO_DELETED_LIST_NAME")
                    .unwrap_or_else(|| DEFAULT_DELETED_LIST_NAME.to_string()),
            },
            notify: NotifyConfig::load(lookup),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&env_lookup())
    }
}
