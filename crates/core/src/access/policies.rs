//! Role to path-prefix access table

use super::paths;
use crate::types::{Role, Session};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

static DEFAULT_POLICY: Lazy<AccessPolicy> = Lazy::new(AccessPolicy::default);

/// Where a session stands with respect to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessState {
    Unauthenticated,
    Unauthorized,
    Authorized,
}

/// Role to path-prefix table plus each role's landing path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPolicy {
    allowed_prefixes: HashMap<Role, Vec<String>>,
    landing_paths: HashMap<Role, String>,
    fallback_path: String,
}

impl AccessPolicy {
    /// Build a policy from explicit tables.
    ///
    /// Roles without a landing entry resolve to `fallback_path`.
    pub fn new(
        allowed_prefixes: HashMap<Role, Vec<String>>,
        landing_paths: HashMap<Role, String>,
        fallback_path: impl Into<String>,
    ) -> Self {
        Self {
            allowed_prefixes,
            landing_paths,
            fallback_path: fallback_path.into(),
        }
    }

    /// Process-wide default policy
    pub fn global() -> &'static Self {
        &DEFAULT_POLICY
    }

    /// Prefixes reachable by `role`
    pub fn allowed_prefixes(&self, role: Role) -> &[String] {
        self.allowed_prefixes
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// False without a role; otherwise whether `path` starts with one of the
    /// role's prefixes.
    pub fn can_access_path(&self, role: Option<Role>, path: &str) -> bool {
        role.is_some_and(|role| {
            self.allowed_prefixes(role)
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
        })
    }

    /// Default landing path of `role`
    pub fn root_path(&self, role: Option<Role>) -> &str {
        role.and_then(|role| self.landing_paths.get(&role))
            .map_or(self.fallback_path.as_str(), String::as_str)
    }

    /// Per-navigation state of `session` for `path`
    pub fn classify(&self, session: &Session, path: &str) -> AccessState {
        if !session.is_authenticated() {
            AccessState::Unauthenticated
        } else if self.can_access_path(session.role, path) {
            AccessState::Authorized
        } else {
            AccessState::Unauthorized
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        let prefixes = |items: &[&str]| items.iter().map(ToString::to_string).collect::<Vec<_>>();

        let allowed_prefixes = HashMap::from([
            (
                Role::Admin,
                prefixes(&[paths::ADMIN_ROOT, paths::USER_ROOT, paths::POST_ROOT]),
            ),
            (Role::User, prefixes(&[paths::USER_ROOT, paths::POST_ROOT])),
        ]);

        let landing_paths = HashMap::from([
            (Role::Admin, paths::HOME.to_string()),
            (Role::User, paths::POST_ROOT.to_string()),
        ]);

        Self::new(allowed_prefixes, landing_paths, paths::HOME)
    }
}

/// [`AccessPolicy::can_access_path`] on the default policy
pub fn can_access_path(role: Option<Role>, path: &str) -> bool {
    AccessPolicy::global().can_access_path(role, path)
}

/// [`AccessPolicy::root_path`] on the default policy
pub fn root_path(role: Option<Role>) -> &'static str {
    AccessPolicy::global().root_path(role)
}

/// [`AccessPolicy::classify`] on the default policy
pub fn classify(session: &Session, path: &str) -> AccessState {
    AccessPolicy::global().classify(session, path)
}
