//! Gateway configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded once at startup from environment variables with
//! defaults suitable for development. A `.env` file is honoured when present.
//! The resulting [`Config`] is immutable and shared read-only by every request.
//!
//! # Credential
//!
//! - `TMDB_API_KEY`: TMDB v3 API key. Its absence is **not** a startup error;
//!   the metadata endpoint answers 500 until it is configured, while the image
//!   endpoint (which needs no credential) keeps working.
//!
//! # Upstream Tuning
//!
//! - `UPSTREAM_CONNECT_TIMEOUT_SECS`: TCP/TLS connect bound (default: 10)
//! - `UPSTREAM_RESPONSE_TIMEOUT_SECS`: wait for upstream response headers (default: 30)
//! - `STREAM_IDLE_TIMEOUT_SECS`: wait for any single image chunk (default: 30)
//! - `RELAY_BUFFER_CHUNKS`: chunks buffered between upstream and caller (default: 8)

use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::error::{AppError, AppResult};

/// Default TMDB metadata API base.
pub const DEFAULT_TMDB_API_BASE: &str = "https://api.themoviedb.org/3";

/// Default TMDB image host base (sizes and file paths are appended).
pub const DEFAULT_TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

/// Gateway configuration.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Gateway will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 10000)
    pub port: u16,

    // =========================================================================
    // TMDB Configuration
    // =========================================================================
    /// TMDB v3 API key, sent as the `api_key` query parameter.
    pub tmdb_api_key: Option<String>,

    /// Metadata API base URL, without trailing slash.
    pub tmdb_api_base: String,

    /// Image host base URL, without trailing slash.
    pub tmdb_image_base: String,

    /// `language` parameter forwarded on metadata requests (default: "en-US")
    pub tmdb_language: String,

    // =========================================================================
    // Upstream Client Configuration
    // =========================================================================
    /// User-Agent sent upstream. Some edge infrastructure rejects requests without one.
    pub user_agent: String,

    /// TCP/TLS connect timeout for upstream requests.
    pub upstream_connect_timeout: Duration,

    /// Maximum wait for upstream response headers.
    pub upstream_response_timeout: Duration,

    /// Maximum wait for a single body chunk while relaying an image.
    pub stream_idle_timeout: Duration,

    /// Capacity of the relay channel, in chunks.
    pub relay_buffer_chunks: usize,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Allowed CORS origins. `*` allows any origin.
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if a value is malformed (non-numeric
    /// port, unparsable base URL, zero timeout).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 10000)?,

            tmdb_api_key: env::var("TMDB_API_KEY").ok().filter(|k| !k.is_empty()),
            tmdb_api_base: Self::parse_base_url("TMDB_API_BASE", DEFAULT_TMDB_API_BASE),
            tmdb_image_base: Self::parse_base_url("TMDB_IMAGE_BASE", DEFAULT_TMDB_IMAGE_BASE),
            tmdb_language: env::var("TMDB_LANGUAGE").unwrap_or_else(|_| "en-US".to_string()),

            user_agent: env::var("UPSTREAM_USER_AGENT").unwrap_or_else(|_| default_user_agent()),
            upstream_connect_timeout: Duration::from_secs(Self::parse_env(
                "UPSTREAM_CONNECT_TIMEOUT_SECS",
                10,
            )?),
            upstream_response_timeout: Duration::from_secs(Self::parse_env(
                "UPSTREAM_RESPONSE_TIMEOUT_SECS",
                30,
            )?),
            stream_idle_timeout: Duration::from_secs(Self::parse_env(
                "STREAM_IDLE_TIMEOUT_SECS",
                30,
            )?),
            relay_buffer_chunks: Self::parse_env("RELAY_BUFFER_CHUNKS", 8)?,

            cors_allowed_origins: Self::parse_cors_origins(),

            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    fn validate(&self) -> AppResult<()> {
        validate_base_url("TMDB_API_BASE", &self.tmdb_api_base)?;
        validate_base_url("TMDB_IMAGE_BASE", &self.tmdb_image_base)?;

        if self.upstream_connect_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "UPSTREAM_CONNECT_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.upstream_response_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "UPSTREAM_RESPONSE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.stream_idle_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "STREAM_IDLE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.relay_buffer_chunks == 0 {
            return Err(AppError::ConfigError(
                "RELAY_BUFFER_CHUNKS must be greater than 0".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(AppError::ConfigError(
                "UPSTREAM_USER_AGENT must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if the TMDB credential is configured.
    pub fn credential_configured(&self) -> bool {
        self.tmdb_api_key.is_some()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Read a base URL, dropping any trailing slash so paths can be appended verbatim.
    fn parse_base_url(name: &str, default: &str) -> String {
        env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Parse CORS allowed origins from environment variable.
    fn parse_cors_origins() -> Vec<String> {
        env::var("CORS_ALLOW_ORIGIN")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn default_user_agent() -> String {
    format!("MovieHub-Gateway/{}", env!("CARGO_PKG_VERSION"))
}

fn validate_base_url(name: &str, value: &str) -> AppResult<()> {
    let url = Url::parse(value)
        .map_err(|e| AppError::ConfigError(format!("Invalid {name} '{value}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::ConfigError(format!(
            "{name} must use http or https, got '{other}'"
        ))),
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            tmdb_api_key: None,
            tmdb_api_base: DEFAULT_TMDB_API_BASE.to_string(),
            tmdb_image_base: DEFAULT_TMDB_IMAGE_BASE.to_string(),
            tmdb_language: "en-US".to_string(),
            user_agent: default_user_agent(),
            upstream_connect_timeout: Duration::from_secs(10),
            upstream_response_timeout: Duration::from_secs(30),
            stream_idle_timeout: Duration::from_secs(30),
            relay_buffer_chunks: 8,
            cors_allowed_origins: vec!["*".to_string()],
            metrics_port: 9090,
        }
    }
}
