//! Gmail OAuth token handling.
//!
//! The token file is written once by `jobtrack authorize` and reused by every
//! run afterwards. Access tokens are refreshed in place when close to expiry.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::GoogleAuthConfig;
use crate::error::AuthError;

/// Read and modify (label changes) access to the mailbox.
pub const GMAIL_MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Scopes every run needs.
pub const REQUIRED_SCOPES: &[&str] = &[GMAIL_MODIFY_SCOPE];

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const REDIRECT_URI: &str = "http://localhost";

/// Refresh when the access token expires within this margin.
const REFRESH_MARGIN_SECS: i64 = 60;

// ── Stored token ────────────────────────────────────────────────────

/// Contents of the token file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    /// Required scopes this token was not granted.
    pub fn missing_scopes(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|scope| !self.scopes.iter().any(|s| s == *scope))
            .map(|scope| scope.to_string())
            .collect()
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Load the token file and check it covers `REQUIRED_SCOPES`.
pub fn load_token(path: &Path) -> Result<StoredToken, AuthError> {
    if !path.exists() {
        return Err(AuthError::TokenMissing {
            path: path.display().to_string(),
        });
    }
    let raw = std::fs::read_to_string(path)?;
    let token: StoredToken = serde_json::from_str(&raw)?;

    let missing = token.missing_scopes(REQUIRED_SCOPES);
    if !missing.is_empty() {
        return Err(AuthError::InsufficientScopes {
            path: path.display().to_string(),
            missing,
        });
    }
    Ok(token)
}

/// Write the token file, owner-readable only on unix.
pub fn save_token(path: &Path, token: &StoredToken) -> Result<(), AuthError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(token)?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

// ── Token endpoint ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    /// Merge into a stored token. Google omits the refresh token and scopes
    /// on refresh, so previous values are kept.
    fn into_stored(self, previous: Option<&StoredToken>, now: DateTime<Utc>) -> StoredToken {
        let scopes = match self.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => previous.map(|p| p.scopes.clone()).unwrap_or_default(),
        };
        StoredToken {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
            expires_at: now + Duration::seconds(self.expires_in),
            scopes,
        }
    }
}

async fn post_token_form(
    http: &reqwest::Client,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let resp = http
        .post(TOKEN_URL)
        .form(form)
        .send()
        .await
        .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;
    if !status.is_success() {
        return Err(AuthError::ExchangeFailed(format!("HTTP {status}: {body}")));
    }
    Ok(serde_json::from_str(&body)?)
}

// ── Token manager ───────────────────────────────────────────────────

/// Hands out a valid access token, refreshing and persisting as needed.
pub struct TokenManager {
    http: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    path: PathBuf,
    token: Mutex<StoredToken>,
}

impl TokenManager {
    pub fn load(http: reqwest::Client, config: &GoogleAuthConfig) -> Result<Self, AuthError> {
        let token = load_token(&config.token_path)?;
        debug!(path = %config.token_path.display(), "Loaded Gmail token");
        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            path: config.token_path.clone(),
            token: Mutex::new(token),
        })
    }

    /// A currently valid access token.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut token = self.token.lock().await;
        if token.needs_refresh(Utc::now()) {
            let refreshed = self.refresh(&token).await?;
            save_token(&self.path, &refreshed)?;
            info!("Refreshed Gmail access token");
            *token = refreshed;
        }
        Ok(token.access_token.clone())
    }

    async fn refresh(&self, current: &StoredToken) -> Result<StoredToken, AuthError> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NoRefreshToken)?;
        let response = post_token_form(
            &self.http,
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
        )
        .await?;
        Ok(response.into_stored(Some(current), Utc::now()))
    }
}

// ── Interactive authorization ───────────────────────────────────────

/// Consent URL for the installed-app flow.
pub fn consent_url(client_id: &str) -> String {
    let scope = REQUIRED_SCOPES.join(" ");
    url::Url::parse_with_params(
        AUTH_URL,
        &[
            ("client_id", client_id),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map(String::from)
    .unwrap_or_else(|_| AUTH_URL.to_string())
}

/// Accept either a bare authorization code or the full redirected URL.
pub fn extract_code(input: &str) -> Result<String, AuthError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AuthError::InvalidInput("empty input".into()));
    }
    if let Ok(parsed) = url::Url::parse(input) {
        if let Some((_, error)) = parsed.query_pairs().find(|(k, _)| k == "error") {
            return Err(AuthError::InvalidInput(format!("consent denied: {error}")));
        }
        return parsed
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned())
            .ok_or_else(|| AuthError::InvalidInput("URL has no code parameter".into()));
    }
    Ok(input.to_string())
}

/// Exchange an authorization code for a token.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &GoogleAuthConfig,
    code: &str,
) -> Result<StoredToken, AuthError> {
    let response = post_token_form(
        http,
        &[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", REDIRECT_URI),
            ("grant_type", "authorization_code"),
        ],
    )
    .await?;
    Ok(response.into_stored(None, Utc::now()))
}

/// Run the one-time consent flow on the terminal and persist the token.
pub async fn authorize_interactive(
    http: &reqwest::Client,
    config: &GoogleAuthConfig,
) -> Result<StoredToken, AuthError> {
    eprintln!("Open this URL in a browser and grant access:\n");
    eprintln!("  {}\n", consent_url(&config.client_id));
    eprintln!("Then paste the code (or the whole localhost URL you were redirected to):");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    let code = extract_code(&line)?;

    let token = exchange_code(http, config, &code).await?;
    let missing = token.missing_scopes(REQUIRED_SCOPES);
    if !missing.is_empty() {
        return Err(AuthError::InsufficientScopes {
            path: config.token_path.display().to_string(),
            missing,
        });
    }
    save_token(&config.token_path, &token)?;
    info!(path = %config.token_path.display(), "Saved Gmail token");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(scopes: &[&str], expires_in_secs: i64) -> StoredToken {
        StoredToken {
            access_token: "ya29.token".into(),
            refresh_token: Some("1//refresh".into()),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn superset_of_scopes_is_accepted() {
        let t = token(
            &[GMAIL_MODIFY_SCOPE, "https://www.googleapis.com/auth/gmail.send"],
            3600,
        );
        assert!(t.missing_scopes(REQUIRED_SCOPES).is_empty());
    }

    #[test]
    fn subset_of_scopes_is_rejected() {
        let t = token(&["https://www.googleapis.com/auth/gmail.readonly"], 3600);
        assert_eq!(t.missing_scopes(REQUIRED_SCOPES), vec![GMAIL_MODIFY_SCOPE]);
    }

    #[test]
    fn refresh_needed_near_expiry() {
        assert!(token(&[], 30).needs_refresh(Utc::now()));
        assert!(token(&[], -10).needs_refresh(Utc::now()));
        assert!(!token(&[], 3600).needs_refresh(Utc::now()));
    }

    #[test]
    fn load_missing_file_asks_for_authorize() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_token(&dir.path().join("token.json")).unwrap_err();
        assert!(matches!(err, AuthError::TokenMissing { .. }));
        assert!(err.to_string().contains("jobtrack authorize"));
    }

    #[test]
    fn save_then_load_round_trips_and_checks_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");

        let good = token(&[GMAIL_MODIFY_SCOPE], 3600);
        save_token(&path, &good).unwrap();
        assert_eq!(load_token(&path).unwrap(), good);

        let narrow = token(&["https://www.googleapis.com/auth/gmail.readonly"], 3600);
        save_token(&path, &narrow).unwrap();
        assert!(matches!(
            load_token(&path),
            Err(AuthError::InsufficientScopes { .. })
        ));
    }

    #[test]
    fn refresh_response_keeps_previous_refresh_token_and_scopes() {
        let previous = token(&[GMAIL_MODIFY_SCOPE], -5);
        let response = TokenResponse {
            access_token: "ya29.new".into(),
            expires_in: 3599,
            refresh_token: None,
            scope: None,
        };
        let now = Utc::now();
        let merged = response.into_stored(Some(&previous), now);
        assert_eq!(merged.access_token, "ya29.new");
        assert_eq!(merged.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(merged.scopes, vec![GMAIL_MODIFY_SCOPE]);
        assert_eq!(merged.expires_at, now + Duration::seconds(3599));
    }

    #[test]
    fn exchange_response_splits_scopes() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token": "a", "expires_in": 10, "refresh_token": "r",
                "scope": "https://www.googleapis.com/auth/gmail.modify openid", "token_type": "Bearer"}"#,
        )
        .unwrap();
        let stored = response.into_stored(None, Utc::now());
        assert_eq!(stored.scopes.len(), 2);
        assert!(stored.missing_scopes(REQUIRED_SCOPES).is_empty());
    }

    #[test]
    fn consent_url_requests_offline_modify_scope() {
        let url = consent_url("client-123");
        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("gmail.modify"));
    }

    #[test]
    fn extract_code_from_bare_code_or_redirect_url() {
        assert_eq!(extract_code("  4/0Abc-def \n").unwrap(), "4/0Abc-def");
        assert_eq!(
            extract_code("http://localhost/?code=4/0XYZ&scope=gmail.modify").unwrap(),
            "4/0XYZ"
        );
        assert!(extract_code("http://localhost/?error=access_denied").is_err());
        assert!(extract_code("http://localhost/?state=1").is_err());
        assert!(extract_code("   ").is_err());
    }
}
