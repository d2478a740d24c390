//! Hubdash - a session-authenticated dashboard proxy for the GitHub REST API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - OAuth login / logout / identity endpoints                │
//! │  - Repository, pull-request, and comment proxy endpoints    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Session Layer                            │
//! │  - Cookie-keyed server-side sessions                        │
//! │  - Authorization gate in front of every proxy route         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Upstream Layer                           │
//! │  - Per-request GitHub client bound to the session token     │
//! │  - Error normalization at the response boundary             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers proxying repository, PR, and comment operations
//! - `auth`: GitHub OAuth flow, sessions, authentication middleware
//! - `github`: narrow authenticated client for the upstream REST API
//! - `rate_limit`: blanket per-source-IP request limiter
//! - `config`: configuration management
//! - `error`: error types

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod rate_limit;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned per request. The session store and rate limiter are the only
/// mutable state; everything else is fetched fresh from upstream.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Server-side session store (in-memory by default, pluggable)
    pub sessions: Arc<dyn auth::SessionStore>,

    /// HTTP client for the OAuth token exchange
    pub http_client: reqwest::Client,

    /// Builds per-request GitHub clients bound to a session token
    pub github: github::GithubClientFactory,

    /// Blanket per-IP rate limiter
    pub rate_limiter: Arc<rate_limit::RateLimiter>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built or the configured
    /// GitHub API base URL does not parse.
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let http_client = reqwest::Client::builder()
            .user_agent("Hubdash/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        let github = github::GithubClientFactory::new(http_client.clone(), &config.github.api_base)?;

        let sessions = Arc::new(auth::MemorySessionStore::new(config.session.max_age_seconds));

        let rate_limiter = Arc::new(rate_limit::RateLimiter::new(
            Some(config.rate_limit.max_requests),
            Some(std::time::Duration::from_secs(
                config.rate_limit.window_seconds,
            )),
        ));

        Ok(Self {
            config: Arc::new(config),
            sessions,
            http_client,
            github,
            rate_limiter,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/auth", auth::auth_router())
        .nest("/api/repos", api::repos_router(state.clone()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    // The SPA runs on its own origin in development; the session cookie must
    // survive cross-origin XHR, so credentials are allowed and the origin is
    // pinned rather than wildcarded.
    match HeaderValue::from_str(server.client_origin().as_str()) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %server.client_url,
                "Failed to parse CORS origin from client URL; denying cross-origin requests"
            );
            CorsLayer::new()
        }
    }
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
