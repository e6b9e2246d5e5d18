//! Configuration for the LinkSphere client

use crate::error::CoreResult;
use crate::types::Role;
use crate::validation::validators;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment variables that override configuration values
pub const ENV_PREFIX: &str = "LINKSPHERE";

/// Main client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkSphereConfig {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Auth backend configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Durable client storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL prepended to relative request paths
    pub base_url: String,

    /// Request timeout in seconds; transport default when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// User agent sent with every request
    pub user_agent: String,

    /// Wait before retrying when another request is already refreshing
    pub refresh_backoff_ms: u64,
}

/// Auth backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Root URL of the auth backend
    pub url: String,

    /// Public API key sent as the `apikey` header
    pub anon_key: String,

    /// Role assumed when the auth backend sends no role hint.
    /// Without it such logins are rejected.
    #[serde(default)]
    pub default_role: Option<Role>,
}

/// Durable storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding persisted client values
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "linksphere_http=trace")
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: None,
            user_agent: format!("linksphere/{}", env!("CARGO_PKG_VERSION")),
            refresh_backoff_ms: 100,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            default_role: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("linksphere")
                .join("storage.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LinkSphereConfig {
    /// Load configuration from file, with environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read, parsed or validated
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let settings = Self::with_defaults()?
            .add_source(config::File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with defaults and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables cannot be parsed or validated
    pub fn from_env() -> CoreResult<Self> {
        let settings = Self::with_defaults()?
            .add_source(Self::environment())
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the environment alone
    ///
    /// # Errors
    ///
    /// See [`Self::from_file`] and [`Self::from_env`]
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        path.map_or_else(Self::from_env, Self::from_file)
    }

    fn with_defaults() -> CoreResult<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = Self::default();

        Ok(config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.user_agent", defaults.api.user_agent)?
            .set_default("api.refresh_backoff_ms", defaults.api.refresh_backoff_ms)?
            .set_default("auth.url", defaults.auth.url)?
            .set_default("auth.anon_key", defaults.auth.anon_key)?
            .set_default(
                "storage.path",
                defaults.storage.path.to_string_lossy().into_owned(),
            )?
            .set_default("logging.level", defaults.logging.level)?)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX).separator("__")
    }

    /// Check values that deserialize fine but cannot work
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending field
    pub fn validate(&self) -> CoreResult<()> {
        validators::validate_http_url(&self.api.base_url, "api.base_url")?;
        validators::validate_http_url(&self.auth.url, "auth.url")?;
        validators::validate_not_empty(&self.api.user_agent, "api.user_agent")?;
        validators::validate_range(self.api.refresh_backoff_ms, 1, 60_000, "api.refresh_backoff_ms")?;
        if let Some(timeout) = self.api.timeout_secs {
            validators::validate_range(timeout, 1, 3_600, "api.timeout_secs")?;
        }
        validators::validate_not_empty(&self.logging.level, "logging.level")?;
        Ok(())
    }
}
