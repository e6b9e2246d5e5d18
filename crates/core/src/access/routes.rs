//! Application route table

use super::guards::{
    GuardDecision, Location, NavigationState, Redirect, require_authenticated, require_guest,
    require_role,
};
use super::paths;
use super::policies::AccessPolicy;
use crate::types::{Role, Session};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Screens the client can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Page {
    Login,
    PostList,
    PostSubmit,
    AdminDashboard,
    UserSettings,
    Forbidden,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutePattern {
    /// Matches the path exactly
    Exact(String),
    /// Matches the path and anything below it
    Subtree(String),
    /// Matches everything
    Fallback,
}

impl RoutePattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(expected) => path == expected,
            Self::Subtree(root) => path
                .strip_prefix(root.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
            Self::Fallback => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteAccess {
    Public,
    GuestOnly,
    Authenticated,
    /// Authenticated and holding one of the listed roles
    Roles(Vec<Role>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteTarget {
    Page(Page),
    RedirectTo(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub pattern: RoutePattern,
    pub access: RouteAccess,
    pub target: RouteTarget,
}

impl Route {
    pub const fn new(pattern: RoutePattern, access: RouteAccess, target: RouteTarget) -> Self {
        Self {
            pattern,
            access,
            target,
        }
    }
}

/// Outcome of a navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Navigation {
    Render(Page),
    Redirect(Redirect),
    Forbidden,
}

/// `None` when the guard lets the route render
fn blocking(decision: GuardDecision) -> Option<Navigation> {
    match decision {
        GuardDecision::Render => None,
        GuardDecision::Redirect(redirect) => Some(Navigation::Redirect(redirect)),
        GuardDecision::Forbidden => Some(Navigation::Forbidden),
    }
}

/// Ordered routes; the first matching route wins
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    policy: AccessPolicy,
}

impl RouteTable {
    pub const fn new(routes: Vec<Route>, policy: AccessPolicy) -> Self {
        Self { routes, policy }
    }

    pub const fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Decide what to show for `location`.
    ///
    /// `state` is the navigation state that came with the request, if any.
    pub fn resolve(
        &self,
        session: &Session,
        location: &Location,
        state: Option<&NavigationState>,
    ) -> Navigation {
        let Some(route) = self
            .routes
            .iter()
            .find(|route| route.pattern.matches(&location.pathname))
        else {
            return Navigation::Render(Page::NotFound);
        };

        let blocked = match &route.access {
            RouteAccess::Public => None,
            RouteAccess::GuestOnly => blocking(require_guest(session, &self.policy, state)),
            // A token without a recognized role is not a usable session
            RouteAccess::Authenticated => blocking(require_authenticated(session, location))
                .or_else(|| blocking(require_role(session, &Role::ALL))),
            RouteAccess::Roles(roles) => blocking(require_authenticated(session, location))
                .or_else(|| blocking(require_role(session, roles))),
        };

        let navigation = blocked.unwrap_or_else(|| match &route.target {
            RouteTarget::Page(page) => Navigation::Render(*page),
            RouteTarget::RedirectTo(to) => Navigation::Redirect(Redirect::replace(to.clone())),
        });

        debug!(path = %location.pathname, ?navigation, "Navigation resolved");
        navigation
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        let exact = |path: &str| RoutePattern::Exact(path.to_string());
        let subtree = |path: &str| RoutePattern::Subtree(path.to_string());

        let routes = vec![
            Route::new(
                exact(paths::HOME),
                RouteAccess::Authenticated,
                RouteTarget::RedirectTo(paths::POST_ROOT.to_string()),
            ),
            Route::new(
                exact(paths::LOGIN),
                RouteAccess::GuestOnly,
                RouteTarget::Page(Page::Login),
            ),
            Route::new(
                exact(paths::POST_ROOT),
                RouteAccess::Authenticated,
                RouteTarget::Page(Page::PostList),
            ),
            Route::new(
                exact(paths::POST_SUBMIT),
                RouteAccess::Authenticated,
                RouteTarget::Page(Page::PostSubmit),
            ),
            Route::new(
                subtree(paths::ADMIN_ROOT),
                RouteAccess::Roles(vec![Role::Admin]),
                RouteTarget::Page(Page::AdminDashboard),
            ),
            Route::new(
                subtree(paths::USER_ROOT),
                RouteAccess::Roles(vec![Role::Admin, Role::User]),
                RouteTarget::Page(Page::UserSettings),
            ),
            Route::new(
                exact(paths::FORBIDDEN),
                RouteAccess::Public,
                RouteTarget::Page(Page::Forbidden),
            ),
            Route::new(
                RoutePattern::Fallback,
                RouteAccess::Public,
                RouteTarget::Page(Page::NotFound),
            ),
        ];

        Self::new(routes, AccessPolicy::default())
    }
}
