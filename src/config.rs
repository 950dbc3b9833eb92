//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.
//!
//! The database location is either a complete `DATABASE_URL` or the
//! individual `DB_*` parts, from which a URL is assembled.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::services::RetryPolicy;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (optional): PostgreSQL connection string, wins over the `DB_*` parts
/// - `DB_HOST`, `DB_PORT`, `DB_USERNAME`, `DB_PASSWORD`, `DB_NAME`, `DB_SSL_MODE`
/// - `SERVER_HOST` (optional): bind address, defaults to 0.0.0.0
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DB_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `DB_CONNECT_TIMEOUT_SECS` (optional): pool acquire timeout, defaults to 5
/// - `REQUEST_TIMEOUT_SECS` (optional): per-request timeout, defaults to 10
/// - `SERIALIZATION_RETRY_ATTEMPTS` (optional): extra attempts after a serialization conflict, defaults to 0
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,

    #[serde(default = "default_db_host")]
    pub db_host: String,

    #[serde(default = "default_db_port")]
    pub db_port: u16,

    pub db_username: Option<String>,
    pub db_password: Option<String>,
    pub db_name: Option<String>,

    #[serde(default = "default_ssl_mode")]
    pub db_ssl_mode: String,

    #[serde(default = "default_host")]
    pub server_host: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub serialization_retry_attempts: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid database configuration: {0}")]
    DatabaseUrl(String),
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_ssl_mode() -> String {
    "prefer".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variable values cannot be parsed into
    /// expected types.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Does nothing if there is no .env file
        dotenvy::dotenv().ok();

        Ok(envy::from_env::<Config>()?)
    }

    /// Connection string for the pool.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseUrl` when neither `DATABASE_URL` nor `DB_NAME` is
    /// set, or the parts do not form a valid URL.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }

        let name = self.db_name.as_deref().ok_or_else(|| {
            ConfigError::DatabaseUrl("set DATABASE_URL or DB_NAME".to_string())
        })?;

        let invalid = |err: url::ParseError| ConfigError::DatabaseUrl(err.to_string());
        let mut url = Url::parse(&format!("postgres://{}", self.db_host)).map_err(invalid)?;
        let unusable = || ConfigError::DatabaseUrl(format!("unusable host {:?}", self.db_host));

        url.set_port(Some(self.db_port)).map_err(|()| unusable())?;
        if let Some(username) = &self.db_username {
            url.set_username(username).map_err(|()| unusable())?;
        }
        // set_password percent-encodes reserved characters.
        if let Some(password) = &self.db_password {
            url.set_password(Some(password)).map_err(|()| unusable())?;
        }
        url.set_path(name);
        url.query_pairs_mut().append_pair("sslmode", &self.db_ssl_mode);

        Ok(url.into())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.db_connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_retries(self.serialization_retry_attempts)
    }
}
