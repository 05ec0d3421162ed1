//! Request authorizer: attaches the bearer credential and classifies responses.
//!
//! DESIGN
//! ======
//! The credential is read from the store on every call, never cached, so a
//! login that happens after construction is picked up by the next request.
//! A `401` becomes `ApiError::AuthenticationExpired` and nothing else happens
//! here; reacting to it (clearing the store, changing session state) belongs
//! to the session controller alone.
//!
//! `authorize` and `dispatch` are exposed separately so a caller can capture
//! the credential, change local state, and only then put the request on the
//! wire. Logout relies on this.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::transport::{ApiRequest, HttpRequest, HttpResponse, HttpTransport};
use super::types::{ApiError, ErrorBody};
use crate::credential::{CredentialSource, SessionCredential};

pub struct RequestAuthorizer {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialSource>,
}

impl RequestAuthorizer {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self { transport, credentials }
    }

    /// Credential the next request would carry.
    #[must_use]
    pub fn credential(&self) -> Option<SessionCredential> {
        self.credentials.get()
    }

    /// Materialize `request` with the credential currently in the store.
    #[must_use]
    pub fn authorize(&self, request: ApiRequest) -> HttpRequest {
        self.authorize_with(request, self.credentials.get().as_ref())
    }

    /// Materialize `request` with a credential the caller already read.
    #[must_use]
    pub fn authorize_with(&self, request: ApiRequest, credential: Option<&SessionCredential>) -> HttpRequest {
        HttpRequest {
            method: request.method,
            path: request.path,
            authorization: credential.map(SessionCredential::bearer),
            body: request.body,
        }
    }

    /// Send an already materialized request and classify the response.
    ///
    /// # Errors
    ///
    /// See [`classify`].
    pub async fn dispatch(&self, request: HttpRequest) -> Result<serde_json::Value, ApiError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        let result = classify(response);
        if let Err(e) = &result {
            tracing::debug!(%method, %path, code = e.error_code(), "request failed");
        }
        result
    }

    /// Authorize, send, and decode into `T`.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`], or [`ApiError::Decode`] if a
    /// successful body does not match `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send_prepared(self.authorize(request)).await
    }

    /// Send an already materialized request and decode into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`RequestAuthorizer::send`].
    pub async fn send_prepared<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        let value = self.dispatch(request).await?;
        decode(value)
    }
}

/// Map a raw response onto the error taxonomy.
///
/// - `2xx` → parsed JSON (an empty body is `null`)
/// - `401` → [`ApiError::AuthenticationExpired`]
/// - other `4xx` → [`ApiError::ValidationFailed`]
/// - `5xx` → [`ApiError::ServerError`]
/// - anything else → [`ApiError::UnexpectedStatus`]
///
/// # Errors
///
/// Every non-2xx status, and a 2xx body that is not JSON.
pub fn classify(response: HttpResponse) -> Result<serde_json::Value, ApiError> {
    let HttpResponse { status, body } = response;
    match status {
        200..=299 => {
            if body.trim().is_empty() {
                return Ok(serde_json::Value::Null);
            }
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
        }
        401 => Err(ApiError::AuthenticationExpired { message: error_message(&body) }),
        400..=499 => {
            let message = error_message(&body).unwrap_or_else(|| body.trim().to_owned());
            Err(ApiError::ValidationFailed { status, message })
        }
        500..=599 => Err(ApiError::ServerError { status, body }),
        _ => Err(ApiError::UnexpectedStatus { status, body }),
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.message)
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "authorizer_test.rs"]
mod tests;
