//! LinkSphere HTTP client
//!
//! [`ApiClient`] wraps every call to the backend with the same header, query
//! and body handling. A response with [`CREDENTIAL_EXPIRED_STATUS`] on a
//! resource endpoint is retried exactly once; the first caller to see it
//! refreshes the session while overlapping callers wait a short backoff
//! (see [`refresh::RefreshCoordinator`]).

pub mod auth;
pub mod error;
pub mod posts;
pub mod refresh;
pub mod request;

pub use error::ClientError;
pub use refresh::{RefreshCoordinator, RetryTicket};
pub use request::{
    CREDENTIAL_EXPIRED_STATUS, EndpointKind, RequestOptions, ResponseBody, ResponseType,
};

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use linksphere_core::config::AuthConfig;
use linksphere_core::payload::preprocess_body;
use linksphere_core::validation::validators;
use linksphere_core::{KeyValueStore, LinkSphereConfig, SessionContext, SessionStore};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// LinkSphere API client
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    context: SessionContext,
    auth: Option<AuthConfig>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Create a client with an empty in-memory session
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Build a client from loaded configuration
    pub fn from_config(
        config: &LinkSphereConfig,
        context: SessionContext,
    ) -> Result<Self, ClientError> {
        let mut builder = Self::builder()
            .base_url(&config.api.base_url)
            .user_agent(&config.api.user_agent)
            .refresh_backoff(Duration::from_millis(config.api.refresh_backoff_ms))
            .auth(config.auth.clone())
            .context(context);

        if let Some(secs) = config.api.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.context.session
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.context.storage
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn auth_config(&self) -> Option<&AuthConfig> {
        self.auth.as_ref()
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        self.call(Method::GET, path, None, options).await
    }

    pub async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.encode_body(path, body)?;
        self.call(Method::POST, path, Some(body), options).await
    }

    pub async fn put<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.encode_body(path, body)?;
        self.call(Method::PUT, path, Some(body), options).await
    }

    pub async fn patch<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.encode_body(path, body)?;
        self.call(Method::PATCH, path, Some(body), options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        self.call(Method::DELETE, path, None, options).await
    }

    /// GET a binary resource
    pub async fn download(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Bytes, ClientError> {
        let options = options.response_type(ResponseType::Blob);
        self.send(Method::GET, path, None, options)
            .await?
            .into_bytes()
            .inspect_err(|err| error!(path, error = %err, "Failed to read download body"))
    }

    /// Perform a request and return the decoded body.
    ///
    /// `body` is normalized before sending. Errors are logged here and
    /// returned unchanged.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ResponseBody, ClientError> {
        let body = body.map(preprocess_body);
        let result = self.dispatch(&method, path, body.as_ref(), &options).await;

        if let Err(err) = &result {
            error!(%method, path, status = ?err.status(), error = %err, "Request failed");
        }
        result
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        self.send(method, path, body, options)
            .await?
            .deserialize()
            .inspect_err(|err| error!(path, error = %err, "Unexpected response shape"))
    }

    fn encode_body<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ClientError> {
        serde_json::to_value(body)
            .map_err(ClientError::from)
            .inspect_err(|err| error!(path, error = %err, "Failed to encode request body"))
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<ResponseBody, ClientError> {
        let kind = EndpointKind::classify(path);
        let url = self.resolve_url(path, options)?;
        let mut attempt: u32 = 0;

        loop {
            debug!(%method, %url, attempt, "Sending request");
            let response = self
                .build_request(method, url.clone(), kind, body, options)?
                .send()
                .await?;

            if response.status().as_u16() == CREDENTIAL_EXPIRED_STATUS
                && kind.retries_expired()
                && attempt == 0
            {
                warn!(path, "Access credential expired, retrying once");
                attempt += 1;
                self.recover_expired().await?;
                continue;
            }

            return decode(response, kind, options.response_type).await;
        }
    }

    /// Single refresh step before the expired-credential retry
    async fn recover_expired(&self) -> Result<(), ClientError> {
        match self.refresh.begin() {
            RetryTicket::Leader(guard) => {
                if self.auth.is_some() {
                    match self.refresh_for_retry().await {
                        Ok(()) => {}
                        Err(ClientError::RefreshUnauthorized) => {
                            self.discard_session();
                            return Err(ClientError::RefreshUnauthorized);
                        }
                        Err(err) => {
                            warn!(error = %err, "Refresh before retry failed, retrying anyway");
                        }
                    }
                }
                drop(guard);
                Ok(())
            }
            RetryTicket::Follower => {
                self.refresh.wait().await;
                Ok(())
            }
        }
    }

    // Boxed because the refresh call goes back through `send`
    fn refresh_for_retry(&self) -> BoxFuture<'_, Result<(), ClientError>> {
        async move { self.refresh_session().await.map(|_| ()) }.boxed()
    }

    fn resolve_url(&self, path: &str, options: &RequestOptions) -> Result<url::Url, ClientError> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };

        let mut url = url::Url::parse(&raw)
            .map_err(|e| ClientError::Configuration(format!("invalid request URL '{raw}': {e}")))?;

        let pairs = options.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    fn build_request(
        &self,
        method: &Method,
        url: url::Url,
        kind: EndpointKind,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(token) = self.context.session.access_token() {
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))?,
            );
        }
        headers.extend(options.headers.clone());
        if !kind.sends_bearer() {
            headers.remove(header::AUTHORIZATION);
        }

        let mut request = self.client.request(method.clone(), url).headers(headers);

        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        Ok(request)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.context.session)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}

fn content_length_is_zero(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}

/// Turn a final response into a body or one of the error variants
async fn decode(
    response: Response,
    kind: EndpointKind,
    response_type: ResponseType,
) -> Result<ResponseBody, ClientError> {
    let status = response.status();

    if kind == EndpointKind::Refresh && status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::RefreshUnauthorized);
    }
    if status == StatusCode::FORBIDDEN {
        return Err(ClientError::Forbidden);
    }
    if !status.is_success() {
        let bytes = response.bytes().await.unwrap_or_default();
        let body =
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::Object(Map::new()));
        return Err(ClientError::http(status, body));
    }

    if status == StatusCode::NO_CONTENT || content_length_is_zero(response.headers()) {
        return Ok(match response_type {
            ResponseType::Blob => ResponseBody::Blob(Bytes::new()),
            _ => ResponseBody::empty(),
        });
    }

    if response_type == ResponseType::Blob {
        return Ok(ResponseBody::Blob(response.bytes().await?));
    }

    let text = response.text().await?;
    if text.is_empty() {
        return Ok(ResponseBody::empty());
    }

    match response_type {
        ResponseType::Text => Ok(ResponseBody::Text(text)),
        _ => match serde_json::from_str(&text) {
            Ok(value) => Ok(ResponseBody::Json(value)),
            Err(_) => Ok(ResponseBody::Text(text)),
        },
    }
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    refresh_backoff: Option<Duration>,
    auth: Option<AuthConfig>,
    context: Option<SessionContext>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Wait applied by requests that find a refresh already in flight
    pub fn refresh_backoff(mut self, backoff: Duration) -> Self {
        self.refresh_backoff = Some(backoff);
        self
    }

    /// Auth backend used for refreshes and the login flow
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Session and storage shared with the rest of the application
    pub fn context(mut self, context: SessionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        validators::validate_http_url(&base_url, "base_url")
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        if let Some(auth) = &self.auth {
            validators::validate_http_url(&auth.url, "auth.url")
                .map_err(|e| ClientError::Configuration(e.to_string()))?;
        }

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| format!("linksphere/{}", env!("CARGO_PKG_VERSION"))),
        );

        let client = client_builder.build()?;

        Ok(ApiClient {
            client,
            base_url,
            context: self.context.unwrap_or_else(SessionContext::in_memory),
            auth: self.auth,
            refresh: self
                .refresh_backoff
                .map_or_else(RefreshCoordinator::default, RefreshCoordinator::new),
        })
    }
}
