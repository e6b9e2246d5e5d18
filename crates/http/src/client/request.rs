//! Per-call request options, endpoint classification and decoded bodies

use bytes::Bytes;
use linksphere_core::payload::query_value_to_string;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;

use super::error::ClientError;

/// Status the backend uses for an expired access credential
pub const CREDENTIAL_EXPIRED_STATUS: u16 = 498;

/// How the response body should be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Blob,
}

/// Options accepted by every request helper
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query parameters; `null` values are skipped
    pub search_params: Vec<(String, Value)>,
    pub response_type: ResponseType,
    /// Extra headers, overriding the defaults
    pub headers: HeaderMap,
    /// Per-request timeout overriding the client's
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.search_params.push((key.into(), value.into()));
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Query pairs as sent on the wire
    pub fn query_pairs(&self) -> Vec<(&str, String)> {
        self.search_params
            .iter()
            .filter_map(|(key, value)| query_value_to_string(value).map(|v| (key.as_str(), v)))
            .collect()
    }
}

/// Which auth endpoint, if any, a request path targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Login,
    Refresh,
    Logout,
    Resource,
}

impl EndpointKind {
    pub fn classify(path: &str) -> Self {
        if path.contains("/auth/login") || path.contains("grant_type=password") {
            Self::Login
        } else if path.contains("/auth/refresh-token") || path.contains("grant_type=refresh_token")
        {
            Self::Refresh
        } else if path.contains("/auth/logout") || path.contains("/auth/v1/logout") {
            Self::Logout
        } else {
            Self::Resource
        }
    }

    /// Only resource calls retry on an expired credential
    pub const fn retries_expired(self) -> bool {
        matches!(self, Self::Resource)
    }

    /// Login and refresh calls never carry the bearer token
    pub const fn sends_bearer(self) -> bool {
        !matches!(self, Self::Login | Self::Refresh)
    }
}

/// A decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Blob(Bytes),
}

impl ResponseBody {
    /// Body of a 204 or zero-length response
    pub fn empty() -> Self {
        Self::Json(Value::Object(Map::new()))
    }

    pub fn is_empty_object(&self) -> bool {
        matches!(self, Self::Json(Value::Object(map)) if map.is_empty())
    }

    /// Convert to a JSON value; text becomes a JSON string
    pub fn into_value(self) -> Result<Value, ClientError> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(text) => Ok(Value::String(text)),
            Self::Blob(_) => Err(ClientError::Decode(
                "binary body cannot be read as JSON".to_string(),
            )),
        }
    }

    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        Ok(serde_json::from_value(self.into_value()?)?)
    }

    /// Raw bytes of the body
    pub fn into_bytes(self) -> Result<Bytes, ClientError> {
        match self {
            Self::Blob(bytes) => Ok(bytes),
            Self::Text(text) => Ok(Bytes::from(text)),
            Self::Json(value) => Ok(Bytes::from(serde_json::to_vec(&value)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_auth_endpoints() {
        assert_eq!(EndpointKind::classify("/auth/login"), EndpointKind::Login);
        assert_eq!(
            EndpointKind::classify("https://x.supabase.co/auth/v1/token?grant_type=password"),
            EndpointKind::Login
        );
        assert_eq!(
            EndpointKind::classify("/auth/v1/token?grant_type=refresh_token"),
            EndpointKind::Refresh
        );
        assert_eq!(
            EndpointKind::classify("/auth/refresh-token"),
            EndpointKind::Refresh
        );
        assert_eq!(EndpointKind::classify("/auth/v1/logout"), EndpointKind::Logout);
        assert_eq!(EndpointKind::classify("/post"), EndpointKind::Resource);

        assert!(EndpointKind::Resource.retries_expired());
        assert!(!EndpointKind::Refresh.retries_expired());
        assert!(!EndpointKind::Login.sends_bearer());
        assert!(EndpointKind::Logout.sends_bearer());
    }

    #[test]
    fn query_pairs_skip_nulls() {
        let options = RequestOptions::new()
            .query("page", 2)
            .query("draft", false)
            .query("cursor", Value::Null)
            .query("q", "caf\u{0065}\u{0301}");

        assert_eq!(
            options.query_pairs(),
            vec![
                ("page", "2".to_string()),
                ("draft", "false".to_string()),
                ("q", "caf\u{00e9}".to_string()),
            ]
        );
    }

    #[test]
    fn body_conversions() {
        assert!(ResponseBody::empty().is_empty_object());
        assert_eq!(
            ResponseBody::Text("hi".into()).into_value().unwrap(),
            json!("hi")
        );
        assert!(ResponseBody::Blob(Bytes::from_static(b"\x00")).into_value().is_err());
        assert_eq!(
            ResponseBody::Json(json!({"a": 1})).into_bytes().unwrap(),
            Bytes::from_static(br#"{"a":1}"#)
        );

        let n: u32 = ResponseBody::Json(json!(7)).deserialize().unwrap();
        assert_eq!(n, 7);
    }
}
