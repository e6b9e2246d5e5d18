//! Wire types for the auth backend and the link-post API

use chrono::{DateTime, Utc};
use linksphere_core::format::uniq_by;
use linksphere_core::payload::is_blank;
use linksphere_core::validation::validators;
use linksphere_core::{Role, UserSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::ClientError;

/// Password-grant credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Reject malformed credentials before they reach the network
    pub fn validate(&self) -> Result<(), ClientError> {
        validators::validate_email(self.email.trim(), "email")
            .and_then(|()| validators::validate_not_empty(&self.password, "password"))
            .map_err(|e| ClientError::Validation(e.to_string()))
    }
}

/// Body of a refresh-token grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token grant response of the auth backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Free-form profile data; only the role hint is read
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

impl AuthUser {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            email: self.email.clone().unwrap_or_default(),
        }
    }

    /// Resolve the role hint.
    ///
    /// A missing hint resolves to `default_role`; with no default the login
    /// is refused. Unknown role names are always refused.
    pub fn resolve_role(&self, default_role: Option<Role>) -> Result<Role, ClientError> {
        match self.user_metadata.role.as_deref() {
            Some(raw) => raw.parse::<Role>().map_err(ClientError::from),
            None => default_role.ok_or_else(|| {
                ClientError::Validation(format!("user {} has no role assigned", self.id))
            }),
        }
    }
}

/// Result of a successful login or refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    pub access_token: String,
    pub role: Role,
    pub user: UserSummary,
}

/// New link submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePost {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl CreatePost {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            categories: None,
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    /// Validate the URL and tidy the category list.
    ///
    /// Blank and repeated categories are dropped; an empty list becomes `None`.
    pub fn validate(self) -> Result<Self, ClientError> {
        let url = self.url.trim().to_string();
        validators::validate_http_url(&url, "url")
            .map_err(|e| ClientError::Validation(e.to_string()))?;

        let categories = self.categories.and_then(|categories| {
            let kept = uniq_by(
                categories
                    .iter()
                    .map(|category| category.trim())
                    .filter(|category| !is_blank(category))
                    .map(str::to_string),
                Clone::clone,
            );
            (!kept.is_empty()).then_some(kept)
        });

        Ok(Self { url, categories })
    }
}

/// A submitted link as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub og_image: Option<String>,
    #[serde(default)]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}
