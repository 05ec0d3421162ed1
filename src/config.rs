//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://the-plant-parenthood-planner.onrender.com";
pub const DEFAULT_CREDENTIAL_PATH: &str = ".plantcare/credential.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL: {0} (expected http:// or https://)")]
    InvalidBaseUrl(String),
    #[error("invalid fallback account entry `{0}` (expected user:password)")]
    InvalidFallbackAccount(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Login pair tried by `SessionController::login_with_fallback`.
#[derive(Clone, PartialEq, Eq)]
pub struct FallbackAccount {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for FallbackAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackAccount")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub credential_path: PathBuf,
    pub timeouts: Timeouts,
    pub fallback_accounts: Vec<FallbackAccount>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            credential_path: PathBuf::from(DEFAULT_CREDENTIAL_PATH),
            timeouts: Timeouts::default(),
            fallback_accounts: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `PLANTCARE_BASE_URL`: API origin, trailing `/` trimmed
    /// - `PLANTCARE_CREDENTIAL_PATH`: where the bearer token is persisted
    /// - `PLANTCARE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PLANTCARE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PLANTCARE_FALLBACK_ACCOUNTS`: comma-separated `user:password` pairs
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s) or a fallback entry is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(
            &std::env::var("PLANTCARE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned()),
        )?;
        let credential_path = std::env::var("PLANTCARE_CREDENTIAL_PATH")
            .map_or_else(|_| PathBuf::from(DEFAULT_CREDENTIAL_PATH), PathBuf::from);
        let timeouts = Timeouts {
            request_secs: env_parse_u64("PLANTCARE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("PLANTCARE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let fallback_accounts = match std::env::var("PLANTCARE_FALLBACK_ACCOUNTS") {
            Ok(raw) => parse_fallback_accounts(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self { base_url, credential_path, timeouts, fallback_accounts })
    }
}

/// Validate the scheme and strip trailing slashes so paths can be appended as-is.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBaseUrl`] for anything other than http(s).
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

/// Parse `user:password[,user:password...]`. Empty entries are skipped.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidFallbackAccount`] when an entry has no `:` or an empty username.
pub fn parse_fallback_accounts(raw: &str) -> Result<Vec<FallbackAccount>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((username, password)) if !username.is_empty() => {
                Ok(FallbackAccount { username: username.to_owned(), password: password.to_owned() })
            }
            _ => Err(ConfigError::InvalidFallbackAccount(entry.to_owned())),
        })
        .collect()
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
