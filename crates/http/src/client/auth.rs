//! Auth backend calls and the session lifecycle built on them

use linksphere_core::config::AuthConfig;
use linksphere_core::{KeyValueStoreExt, REFRESH_TOKEN_KEY};
use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::json;
use tracing::{error, info, warn};

use super::{ApiClient, ClientError, RequestOptions};
use crate::types::{LoginData, LoginRequest, RefreshRequest, TokenResponse};

const PASSWORD_GRANT_PATH: &str = "/auth/v1/token?grant_type=password";
const REFRESH_GRANT_PATH: &str = "/auth/v1/token?grant_type=refresh_token";
const LOGOUT_PATH: &str = "/auth/v1/logout";

fn auth_url(auth: &AuthConfig, path: &str) -> String {
    format!("{}{}", auth.url.trim_end_matches('/'), path)
}

fn auth_options(auth: &AuthConfig) -> Result<RequestOptions, ClientError> {
    let mut options = RequestOptions::new();
    if !auth.anon_key.is_empty() {
        options = options.header(
            HeaderName::from_static("apikey"),
            HeaderValue::from_str(&auth.anon_key)?,
        );
    }
    Ok(options)
}

impl ApiClient {
    fn auth_settings(&self) -> Result<&AuthConfig, ClientError> {
        self.auth
            .as_ref()
            .ok_or_else(|| ClientError::Configuration("auth backend is not configured".into()))
    }

    /// Sign in with email and password.
    ///
    /// On success the refresh token is persisted and the session holds the
    /// new access token and role.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginData, ClientError> {
        request
            .validate()
            .inspect_err(|err| error!(error = %err, "Login rejected before sending"))?;

        let auth = self.auth_settings()?;
        let tokens: TokenResponse = self
            .post(
                &auth_url(auth, PASSWORD_GRANT_PATH),
                request,
                auth_options(auth)?,
            )
            .await?;

        let data = self.apply_tokens(tokens)?;
        info!(user_id = %data.user.id, role = %data.role, "Logged in");
        Ok(data)
    }

    /// Exchange the stored refresh token for a new access token
    pub async fn refresh_session(&self) -> Result<LoginData, ClientError> {
        let auth = self.auth_settings()?;
        let refresh_token: String = self
            .storage()
            .get_item(REFRESH_TOKEN_KEY)
            .ok_or(ClientError::MissingRefreshToken)?;

        let tokens: TokenResponse = self
            .post(
                &auth_url(auth, REFRESH_GRANT_PATH),
                &RefreshRequest { refresh_token },
                auth_options(auth)?,
            )
            .await?;

        let data = self.apply_tokens(tokens)?;
        info!(user_id = %data.user.id, "Session refreshed");
        Ok(data)
    }

    /// Rebuild the session from the stored refresh token.
    ///
    /// Returns true when a session is available afterwards. Failures leave an
    /// empty session; the stored token is only dropped when the backend
    /// rejected it.
    pub async fn restore_session(&self) -> bool {
        if self.session().is_authenticated() {
            return true;
        }

        match self.refresh_session().await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "Could not restore session");
                if matches!(err, ClientError::RefreshUnauthorized) {
                    self.discard_session();
                } else {
                    self.session().clear();
                }
                false
            }
        }
    }

    /// Sign out. The local session is always discarded, even when the
    /// backend call fails.
    pub async fn logout(&self) {
        if let Some(auth) = &self.auth {
            if self.session().is_authenticated() {
                let result = match auth_options(auth) {
                    Ok(options) => self
                        .send(
                            Method::POST,
                            &auth_url(auth, LOGOUT_PATH),
                            Some(json!({})),
                            options,
                        )
                        .await
                        .map(|_| ()),
                    Err(err) => Err(err),
                };
                if let Err(err) = result {
                    warn!(error = %err, "Logout request failed, clearing local session anyway");
                }
            }
        }

        self.discard_session();
        info!("Logged out");
    }

    /// Drop the stored refresh token and reset the session
    pub fn discard_session(&self) {
        if let Err(err) = self.storage().remove_item(REFRESH_TOKEN_KEY) {
            warn!(error = %err, "Failed to remove stored refresh token");
        }
        self.session().clear();
    }

    fn apply_tokens(&self, tokens: TokenResponse) -> Result<LoginData, ClientError> {
        let default_role = self.auth.as_ref().and_then(|auth| auth.default_role);
        let role = tokens
            .user
            .resolve_role(default_role)
            .inspect_err(|err| error!(user_id = %tokens.user.id, error = %err, "Rejected role"))?;

        self.storage()
            .set_item(REFRESH_TOKEN_KEY, &tokens.refresh_token)
            .inspect_err(|err| error!(error = %err, "Failed to persist refresh token"))?;

        let user = tokens.user.summary();
        self.session()
            .set_auth(tokens.access_token.clone(), role, Some(user.clone()));

        Ok(LoginData {
            access_token: tokens.access_token,
            role,
            user,
        })
    }
}
