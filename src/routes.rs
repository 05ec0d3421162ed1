//! Route guard: which view a path resolves to under the current session.
//!
//! Pure and synchronous. While the session is `Unknown` or `Checking` every
//! path renders `Loading` and nothing redirects, so a page reload never bounces
//! through `/login` before the stored credential has been verified.

use crate::session::SessionState;

pub const LOGIN_PATH: &str = "/login";
pub const SIGNUP_PATH: &str = "/signup";
pub const LANDING_PATH: &str = "/dashboard";
pub const ADD_PLANT_PATH: &str = "/add-plant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewId {
    Loading,
    Login,
    Signup,
    Dashboard,
    AddPlant,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub render: ViewId,
    pub redirect_to: Option<&'static str>,
}

impl RouteDecision {
    fn render(view: ViewId) -> Self {
        Self { render: view, redirect_to: None }
    }

    fn redirect(view: ViewId, to: &'static str) -> Self {
        Self { render: view, redirect_to: Some(to) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    /// Only reachable while logged out.
    GuestOnly,
    /// Only reachable while logged in.
    Protected,
    Public,
}

fn resolve(path: &str) -> (ViewId, Access) {
    match normalize(path) {
        LOGIN_PATH => (ViewId::Login, Access::GuestOnly),
        SIGNUP_PATH => (ViewId::Signup, Access::GuestOnly),
        "/" | LANDING_PATH => (ViewId::Dashboard, Access::Protected),
        ADD_PLANT_PATH => (ViewId::AddPlant, Access::Protected),
        _ => (ViewId::NotFound, Access::Public),
    }
}

/// Strip query, fragment, and trailing slashes (`/dashboard/?tab=1` → `/dashboard`).
fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Decide what to render for `path` under `state`.
///
/// When a redirect is returned, `render` is the view at the redirect target.
#[must_use]
pub fn guard(state: &SessionState, path: &str) -> RouteDecision {
    if !state.is_resolved() {
        return RouteDecision::render(ViewId::Loading);
    }

    let (view, access) = resolve(path);
    match (access, state.is_authenticated()) {
        (Access::GuestOnly, true) => RouteDecision::redirect(ViewId::Dashboard, LANDING_PATH),
        (Access::Protected, false) => RouteDecision::redirect(ViewId::Login, LOGIN_PATH),
        _ => RouteDecision::render(view),
    }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
