//! Session controller: the authoritative client-side login state.
//!
//! DESIGN
//! ======
//! State lives in a `tokio::sync::watch` channel so views can either take a
//! snapshot (`state()`) or follow changes (`subscribe()`). Every transition,
//! together with the credential write that goes with it, runs inside the
//! channel's modify closure. Subscribers therefore never see `Authenticated`
//! without a stored token, or `Unauthenticated` with one still present.
//!
//! ```text
//! Unknown ──initialize──▶ Checking ──ok──▶ Authenticated
//!    │                       │                 │  ▲
//!    └──no credential──┐     └──fail──┐  expire/logout  login/register
//!                      ▼              ▼        ▼  │
//!                      Unauthenticated ◀────────┘
//! ```
//!
//! Startup verification is single-flight: `initialize()` goes through a
//! `OnceCell`, so repeated or concurrent calls share one `/check-auth`. If the
//! caller driving it is dropped mid-flight the state is left at `Checking`,
//! and the next `initialize()` picks the check up again.
//!
//! An authorized fetch remembers the credential it sent. A `401` ends the
//! session only while the store still holds that same credential. Several
//! requests failing together produce one transition, and a late `401` for a
//! token that has since been replaced cannot log out the new session.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{OnceCell, watch};

use crate::config::{ClientConfig, FallbackAccount};
use crate::credential::{CredentialStore, FileCredentialStore, SessionCredential, StoreError};
use crate::net::authorizer::RequestAuthorizer;
use crate::net::transport::{ApiRequest, HttpTransport, ReqwestTransport, TransportError};
use crate::net::types::{ApiError, AuthResponse, AuthResult, LoginRequest, RegisterRequest, User};

const CHECK_AUTH_PATH: &str = "/check-auth";
const LOGIN_PATH: &str = "/login";
const LOGOUT_PATH: &str = "/logout";
const REGISTER_PATH: &str = "/register";

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Startup; nothing has been checked yet.
    #[default]
    Unknown,
    /// Stored credential is being verified.
    Checking,
    Authenticated {
        user: User,
    },
    Unauthenticated,
}

impl SessionState {
    /// `true` once the state is `Authenticated` or `Unauthenticated`.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Authenticated { .. } | Self::Unauthenticated)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated { user } => Some(user),
            _ => None,
        }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Login was rejected; `message` is the server's text, unmodified.
    #[error("{message}")]
    LoginFailed { message: String },
    /// Registration was rejected; `message` is the server's text, unmodified.
    #[error("{message}")]
    RegistrationFailed { message: String },
    #[error("no fallback accounts configured")]
    NoFallbackAccounts,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

const DEFAULT_LOGIN_FAILURE: &str = "Login failed";
const DEFAULT_REGISTRATION_FAILURE: &str = "Registration failed";

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct SessionController {
    authorizer: RequestAuthorizer,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
    init: OnceCell<SessionState>,
}

impl SessionController {
    /// Build a controller over `transport`, taking sole write access to `store`.
    pub fn new<S>(transport: Arc<dyn HttpTransport>, store: Arc<S>) -> Self
    where
        S: CredentialStore + 'static,
    {
        let authorizer = RequestAuthorizer::new(transport, store.clone());
        Self {
            authorizer,
            store,
            state: watch::Sender::new(SessionState::Unknown),
            init: OnceCell::new(),
        }
    }

    /// Build the production stack: reqwest transport plus file-backed credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential file is unreadable or the HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, SessionError> {
        let transport = ReqwestTransport::new(config.base_url.clone(), config.timeouts)?;
        let store = FileCredentialStore::open(config.credential_path.clone())?;
        Ok(Self::new(Arc::new(transport), Arc::new(store)))
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolve the startup state. Runs at most once; later and concurrent
    /// callers get the first call's outcome without another network request.
    pub async fn initialize(&self) -> SessionState {
        self.init.get_or_init(|| self.verify_stored_session()).await.clone()
    }

    async fn verify_stored_session(&self) -> SessionState {
        if self.state.borrow().is_resolved() {
            // A login or logout already settled things.
            return self.state();
        }

        if self.store.get().is_none() {
            tracing::debug!("no stored credential, skipping verification");
            self.state.send_if_modified(|state| {
                if state.is_resolved() {
                    return false;
                }
                *state = SessionState::Unauthenticated;
                true
            });
            return self.state();
        }

        // `Checking` here means an earlier attempt was dropped before it settled.
        self.state.send_if_modified(|state| {
            if *state != SessionState::Unknown {
                return false;
            }
            *state = SessionState::Checking;
            true
        });

        let outcome = self.authorizer.send::<AuthResult>(ApiRequest::get(CHECK_AUTH_PATH)).await;
        let user = match outcome {
            Ok(AuthResult { authenticated: true, user: Some(user) }) => Some(user),
            Ok(_) => {
                tracing::info!("stored credential no longer valid");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "session verification failed");
                None
            }
        };

        self.state.send_if_modified(|state| {
            // Only settle a check that nothing else has overtaken.
            if *state != SessionState::Checking {
                return false;
            }
            match user {
                Some(user) => {
                    tracing::info!(user = %user.username, "session restored");
                    *state = SessionState::Authenticated { user };
                }
                None => {
                    self.clear_store();
                    *state = SessionState::Unauthenticated;
                }
            }
            true
        });
        self.state()
    }

    /// Log in with a username and password.
    ///
    /// # Errors
    ///
    /// [`SessionError::LoginFailed`] with the server's message when the
    /// credentials are rejected; other variants for transport or storage
    /// failures. The session is `Unauthenticated` after any error.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, SessionError> {
        let request = ApiRequest::post(LOGIN_PATH).with_json(&LoginRequest { username, password })?;
        let outcome = self.authorizer.send::<AuthResponse>(request).await;

        let rejection = match outcome {
            Ok(AuthResponse { user: Some(user), token: Some(token), .. }) => {
                self.enter_authenticated(&user, SessionCredential::new(token))?;
                tracing::info!(user = %user.username, "logged in");
                return Ok(user);
            }
            Ok(AuthResponse { message, .. }) => message,
            Err(e @ (ApiError::AuthenticationExpired { .. } | ApiError::ValidationFailed { .. })) => {
                e.server_message().map(str::to_owned)
            }
            Err(e) => {
                self.end_session("login error");
                return Err(e.into());
            }
        };

        self.end_session("login rejected");
        let message = rejection.unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_owned());
        tracing::info!(%username, %message, "login rejected");
        Err(SessionError::LoginFailed { message })
    }

    /// Try each account in order and stop at the first that logs in.
    ///
    /// # Errors
    ///
    /// The last rejection if every account is refused, or the first
    /// non-rejection error, which aborts the sequence.
    pub async fn login_with_fallback(&self, accounts: &[FallbackAccount]) -> Result<User, SessionError> {
        let mut last = SessionError::NoFallbackAccounts;
        for account in accounts {
            match self.login(&account.username, &account.password).await {
                Ok(user) => return Ok(user),
                Err(e @ SessionError::LoginFailed { .. }) => {
                    tracing::warn!(username = %account.username, error = %e, "fallback account rejected");
                    last = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last)
    }

    /// Create an account. When the server returns a token the new user is
    /// logged in immediately; otherwise the session is left as it was.
    ///
    /// # Errors
    ///
    /// [`SessionError::RegistrationFailed`] with the server's message on rejection.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User, SessionError> {
        let request = ApiRequest::post(REGISTER_PATH).with_json(&RegisterRequest { username, email, password })?;
        match self.authorizer.send::<AuthResponse>(request).await {
            Ok(AuthResponse { user: Some(user), token: Some(token), .. }) => {
                self.enter_authenticated(&user, SessionCredential::new(token))?;
                tracing::info!(user = %user.username, "registered and logged in");
                Ok(user)
            }
            Ok(AuthResponse { user: Some(user), token: None, .. }) => {
                tracing::info!(user = %user.username, "registered; login required");
                Ok(user)
            }
            Ok(AuthResponse { message, .. }) => Err(SessionError::RegistrationFailed {
                message: message.unwrap_or_else(|| DEFAULT_REGISTRATION_FAILURE.to_owned()),
            }),
            Err(e @ (ApiError::AuthenticationExpired { .. } | ApiError::ValidationFailed { .. })) => {
                Err(SessionError::RegistrationFailed {
                    message: e.server_message().unwrap_or(DEFAULT_REGISTRATION_FAILURE).to_owned(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// End the session. Local state is cleared before the server is contacted,
    /// and a failed server call is only logged.
    pub async fn logout(&self) {
        let request = self.authorizer.authorize(ApiRequest::post(LOGOUT_PATH));
        self.end_session("logout");

        if request.authorization.is_none() {
            return;
        }
        if let Err(e) = self.authorizer.dispatch(request).await {
            tracing::warn!(error = %e, "server logout failed; local session already cleared");
        }
    }

    /// Authorized fetch for protected views. A `401` ends the session (once)
    /// and is still returned to the caller.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the request.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let credential = self.authorizer.credential();
        let request = self.authorizer.authorize_with(request, credential.as_ref());
        let result = self.authorizer.send_prepared(request).await;
        if let (Err(ApiError::AuthenticationExpired { .. }), Some(rejected)) = (&result, &credential) {
            self.expire(rejected);
        }
        result
    }

    /// Handle a `401` for a request that carried `rejected`. The session ends
    /// only if the store still holds that credential. Returns `true` if this
    /// call performed the transition.
    pub fn expire(&self, rejected: &SessionCredential) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Unauthenticated || self.store.get().as_ref() != Some(rejected) {
                return false;
            }
            tracing::info!(from = ?state, "session expired");
            self.clear_store();
            *state = SessionState::Unauthenticated;
            true
        })
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    fn enter_authenticated(&self, user: &User, credential: SessionCredential) -> Result<(), StoreError> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            if let Err(e) = self.store.set(credential) {
                tracing::error!(error = %e, "failed to store credential");
                self.clear_store();
                result = Err(e);
                let changed = *state != SessionState::Unauthenticated;
                *state = SessionState::Unauthenticated;
                return changed;
            }
            *state = SessionState::Authenticated { user: user.clone() };
            true
        });
        result
    }

    fn end_session(&self, reason: &'static str) {
        self.state.send_if_modified(|state| {
            self.clear_store();
            if *state == SessionState::Unauthenticated {
                return false;
            }
            tracing::debug!(reason, "session ended");
            *state = SessionState::Unauthenticated;
            true
        });
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to clear stored credential");
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
