//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub github: GithubConfig,
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub host: String,
    /// Port number (e.g., 3001)
    pub port: u16,
    /// Origin of the dashboard SPA (e.g., "http://localhost:5173")
    pub client_url: String,
}

impl ServerConfig {
    /// The client origin without any trailing slash, for CORS and redirects.
    pub fn client_origin(&self) -> String {
        self.client_url.trim_end_matches('/').to_string()
    }
}

/// GitHub OAuth and API endpoints
///
/// All three URLs default to github.com; tests point them at a mock server.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Where GitHub sends the user back after consent
    pub callback_url: String,
    /// Authorization (consent) endpoint
    pub authorize_url: String,
    /// Code-for-token exchange endpoint
    pub token_url: String,
    /// REST API base (e.g., "https://api.github.com")
    pub api_base: String,
}

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in seconds (default: 86400 = 24 hours, fixed expiry)
    pub max_age_seconds: i64,
}

/// Blanket per-IP rate limit
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window per source address
    pub max_requests: u32,
    /// Window duration in seconds
    pub window_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (HUBDASH_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3001)?
            .set_default("server.client_url", "http://localhost:5173")?
            .set_default(
                "github.callback_url",
                "http://localhost:3001/auth/github/callback",
            )?
            .set_default(
                "github.authorize_url",
                "https://github.com/login/oauth/authorize",
            )?
            .set_default(
                "github.token_url",
                "https://github.com/login/oauth/access_token",
            )?
            .set_default("github.api_base", "https://api.github.com")?
            .set_default("session.max_age_seconds", 86_400)?
            .set_default("rate_limit.max_requests", 100)?
            .set_default("rate_limit.window_seconds", 900)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (HUBDASH_*)
            .add_source(
                Environment::with_prefix("HUBDASH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Whether session and CSRF cookies should carry the Secure attribute.
    ///
    /// True when the OAuth callback is served over https or from a non-local
    /// host; local http development keeps insecure cookies.
    pub fn should_use_secure_cookies(&self) -> bool {
        let callback = &self.github.callback_url;
        callback.starts_with("https://")
            || !is_local_host(&normalized_host(callback))
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.github.client_id.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "github.client_id must be set".to_string(),
            ));
        }

        if self.github.client_secret.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "github.client_secret must be set".to_string(),
            ));
        }

        if self.session.max_age_seconds <= 0 {
            return Err(crate::error::AppError::Config(
                "session.max_age_seconds must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.max_requests == 0 {
            return Err(crate::error::AppError::Config(
                "rate_limit.max_requests must be greater than 0".to_string(),
            ));
        }

        for (key, value) in [
            ("github.callback_url", &self.github.callback_url),
            ("github.authorize_url", &self.github.authorize_url),
            ("github.token_url", &self.github.token_url),
            ("github.api_base", &self.github.api_base),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(crate::error::AppError::Config(format!(
                    "{key} is not a valid URL: {value}"
                )));
            }
        }

        if !self.should_use_secure_cookies() {
            tracing::warn!(
                callback_url = %self.github.callback_url,
                "Using insecure session cookies for local development"
            );
        }

        Ok(())
    }
}

fn normalized_host(url_value: &str) -> String {
    let host = url::Url::parse(url_value)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()))
        .unwrap_or_else(|| url_value.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_host(host: &str) -> bool {
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
