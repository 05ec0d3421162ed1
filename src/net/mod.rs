//! Networking: transport seam, request authorizer, and typed endpoints.
//!
//! DESIGN
//! ======
//! `transport` moves bytes, `authorizer` attaches the bearer token and maps
//! statuses onto `ApiError`, and `api` gives each plant-care endpoint a typed
//! method. Nothing in here mutates session state.

pub mod api;
pub mod authorizer;
pub mod transport;
pub mod types;
