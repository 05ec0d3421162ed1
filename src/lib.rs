//! # plantcare
//!
//! Client library for the plant-care tracking service.
//!
//! DESIGN
//! ======
//! The crate is built around the client-side session lifecycle:
//!
//! - `credential` holds the bearer token and persists it between runs.
//! - `net` attaches that token to outgoing requests and classifies responses.
//! - `session` owns the `Unknown → Checking → Authenticated/Unauthenticated`
//!   state machine and is the only writer of the credential store.
//! - `routes` maps session state and a requested path onto a view.
//!
//! The plant, species, and care-event endpoints in `net::api` go through the
//! session controller so that any `401` ends the local session in one place.

pub mod config;
pub mod credential;
pub mod net;
pub mod routes;
pub mod session;
pub mod view;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::ClientConfig;
pub use credential::{CredentialSource, CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionCredential};
pub use net::api::PlantApi;
pub use net::authorizer::RequestAuthorizer;
pub use net::transport::{HttpTransport, ReqwestTransport};
pub use net::types::{ApiError, User};
pub use routes::{RouteDecision, ViewId};
pub use session::{SessionController, SessionError, SessionState};
pub use view::ViewScope;
