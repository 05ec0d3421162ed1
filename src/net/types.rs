//! Wire types for the plant-care API and the request error taxonomy.
//!
//! Each endpoint has exactly one response shape. A body that does not match it
//! is a `Decode` error rather than something to be sniffed into shape.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by an authorized API call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the credential (HTTP 401).
    #[error("authentication expired")]
    AuthenticationExpired { message: Option<String> },

    /// A 4xx response other than 401, usually carrying a `message`.
    #[error("request rejected ({status}): {message}")]
    ValidationFailed { status: u16, message: String },

    /// A 5xx response.
    #[error("server error: status {status}")]
    ServerError { status: u16, body: String },

    /// Any other non-2xx status.
    #[error("unexpected response: status {status}")]
    UnexpectedStatus { status: u16, body: String },

    /// No response was received.
    #[error("transport failed: {0}")]
    Transport(String),

    /// A 2xx body did not match the endpoint's response type.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The request body could not be serialized.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthenticationExpired { .. } => "E_AUTH_EXPIRED",
            Self::ValidationFailed { .. } => "E_VALIDATION",
            Self::ServerError { .. } => "E_SERVER",
            Self::UnexpectedStatus { .. } => "E_UNEXPECTED_STATUS",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Decode(_) => "E_DECODE",
            Self::InvalidRequest(_) => "E_INVALID_REQUEST",
        }
    }

    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ServerError { .. })
    }

    /// Server-provided message, when the response carried one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::AuthenticationExpired { message } => message.as_deref(),
            Self::ValidationFailed { message, .. } => Some(message),
            _ => None,
        }
    }
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// `GET /check-auth` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResult {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /login` and `POST /register` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Canonical error body: `{ "message": "..." }`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

// =============================================================================
// PLANTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub id: i64,
    pub common_name: String,
    pub scientific_name: String,
    pub watering_frequency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareEvent {
    pub id: i64,
    pub event_type: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// ISO date, `YYYY-MM-DD`.
    pub event_date: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub plant_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub id: i64,
    pub nickname: String,
    #[serde(default)]
    pub species_id: Option<i64>,
    #[serde(default)]
    pub species: Option<Species>,
    #[serde(default)]
    pub care_events: Vec<CareEvent>,
}

/// `GET /dashboard` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub user: User,
    #[serde(default)]
    pub plants: Vec<Plant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPlant {
    pub nickname: String,
    pub species_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSpecies {
    pub common_name: String,
    pub scientific_name: String,
    pub watering_frequency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCareEvent {
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub event_date: String,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
