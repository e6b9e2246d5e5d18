//! Route guards
//!
//! Guards never fail; every outcome is a render, redirect or forbidden
//! decision for the caller to act on.

use super::paths;
use super::policies::AccessPolicy;
use crate::types::{Role, Session};
use serde::{Deserialize, Serialize};

/// A requested location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
    #[serde(default)]
    pub search: String,
}

impl Location {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            search: String::new(),
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Path plus query string
    pub fn href(&self) -> String {
        if self.search.is_empty() {
            self.pathname.clone()
        } else if self.search.starts_with('?') {
            format!("{}{}", self.pathname, self.search)
        } else {
            format!("{}?{}", self.pathname, self.search)
        }
    }
}

/// State carried along with a redirect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    /// Location the user originally asked for
    pub from: Option<Location>,
}

impl NavigationState {
    pub const fn from_location(location: Location) -> Self {
        Self {
            from: Some(location),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub to: String,
    pub state: Option<NavigationState>,
    /// Replace the current history entry instead of pushing
    pub replace: bool,
}

impl Redirect {
    pub fn replace(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            state: None,
            replace: true,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: NavigationState) -> Self {
        self.state = Some(state);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardDecision {
    Render,
    Redirect(Redirect),
    Forbidden,
}

/// Guard for signed-in routes: guests go to the login page and the requested
/// location is remembered for after login.
pub fn require_authenticated(session: &Session, location: &Location) -> GuardDecision {
    if session.is_authenticated() {
        GuardDecision::Render
    } else {
        GuardDecision::Redirect(
            Redirect::replace(paths::LOGIN)
                .with_state(NavigationState::from_location(location.clone())),
        )
    }
}

/// Guard for guest-only routes such as the login page.
///
/// A signed-in user goes back to the location they originally asked for when
/// their role can reach it, otherwise to the role's landing path.
pub fn require_guest(
    session: &Session,
    policy: &AccessPolicy,
    state: Option<&NavigationState>,
) -> GuardDecision {
    if !session.is_authenticated() {
        return GuardDecision::Render;
    }

    let target = state
        .and_then(|state| state.from.as_ref())
        .filter(|from| policy.can_access_path(session.role, &from.pathname))
        .map_or_else(
            || policy.root_path(session.role).to_string(),
            Location::href,
        );

    GuardDecision::Redirect(Redirect::replace(target))
}

/// Role gate for a subtree
pub fn require_role(session: &Session, allowed: &[Role]) -> GuardDecision {
    match session.role {
        Some(role) if allowed.contains(&role) => GuardDecision::Render,
        _ => GuardDecision::Forbidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_session() -> Session {
        Session::authenticated("token", Role::User, None)
    }

    #[test]
    fn guest_is_sent_to_login_with_origin() {
        let location = Location::new("/post/submit").with_search("ref=nav");
        let decision = require_authenticated(&Session::default(), &location);

        assert_eq!(
            decision,
            GuardDecision::Redirect(Redirect {
                to: paths::LOGIN.to_string(),
                state: Some(NavigationState {
                    from: Some(location),
                }),
                replace: true,
            })
        );
    }

    #[test]
    fn authenticated_renders() {
        let decision = require_authenticated(&user_session(), &Location::new("/post"));
        assert_eq!(decision, GuardDecision::Render);
    }

    #[test]
    fn guest_route_renders_for_guest() {
        let decision = require_guest(&Session::default(), AccessPolicy::global(), None);
        assert_eq!(decision, GuardDecision::Render);
    }

    #[test]
    fn signed_in_user_leaves_login_for_landing_path() {
        let decision = require_guest(&user_session(), AccessPolicy::global(), None);
        assert_eq!(
            decision,
            GuardDecision::Redirect(Redirect::replace(paths::POST_ROOT))
        );
    }

    #[test]
    fn signed_in_user_returns_to_accessible_origin() {
        let state = NavigationState::from_location(
            Location::new("/user/settings").with_search("?tab=profile"),
        );
        let decision = require_guest(&user_session(), AccessPolicy::global(), Some(&state));
        assert_eq!(
            decision,
            GuardDecision::Redirect(Redirect::replace("/user/settings?tab=profile"))
        );
    }

    #[test]
    fn inaccessible_origin_is_ignored() {
        let state = NavigationState::from_location(Location::new("/admin"));
        let decision = require_guest(&user_session(), AccessPolicy::global(), Some(&state));
        assert_eq!(
            decision,
            GuardDecision::Redirect(Redirect::replace(paths::POST_ROOT))
        );
    }

    #[test]
    fn role_gate() {
        let admin = Session::authenticated("t", Role::Admin, None);
        let no_role = Session {
            access_token: Some("t".to_string()),
            role: None,
            user: None,
        };

        assert_eq!(require_role(&admin, &[Role::Admin]), GuardDecision::Render);
        assert_eq!(
            require_role(&user_session(), &[Role::Admin]),
            GuardDecision::Forbidden
        );
        assert_eq!(require_role(&no_role, &Role::ALL), GuardDecision::Forbidden);
        assert_eq!(
            require_role(&Session::default(), &[Role::User]),
            GuardDecision::Forbidden
        );
    }
}
