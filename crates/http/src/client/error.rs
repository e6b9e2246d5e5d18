//! Client error types

use linksphere_core::CoreError;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use super::request::CREDENTIAL_EXPIRED_STATUS;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server refused the request for the current role
    #[error("Forbidden")]
    Forbidden,

    /// The refresh endpoint rejected the stored refresh token
    #[error("Refresh token rejected; session must be discarded")]
    RefreshUnauthorized,

    /// Any other non-2xx response
    #[error("HTTP {status} {status_text}")]
    Http {
        status: u16,
        status_text: String,
        /// Parsed error payload, `{}` when absent or not JSON
        body: Value,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// Request payload failed validation before being sent
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No refresh token in durable storage
    #[error("No stored refresh token")]
    MissingRefreshToken,

    /// Response body did not have the requested shape
    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ClientError {
    /// Build the generic HTTP error for `status` with its parsed payload
    pub fn http(status: StatusCode, body: Value) -> Self {
        Self::Http {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        }
    }

    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden)
    }

    /// True when the credential expired or could not be refreshed
    pub const fn is_auth_expired(&self) -> bool {
        match self {
            Self::RefreshUnauthorized => true,
            Self::Http { status, .. } => *status == CREDENTIAL_EXPIRED_STATUS,
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(err) => err.status().map(|s| s.as_u16()),
            Self::Forbidden => Some(403),
            Self::RefreshUnauthorized => Some(401),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
