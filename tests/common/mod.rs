//! Common test utilities for E2E tests

use hubdash::auth::UserIdentity;
use hubdash::{AppState, config};
use tokio::net::TcpListener;
use wiremock::MockServer;

/// Test server instance
///
/// Runs the real router on a random port with a wiremock MockServer standing
/// in for the GitHub API and OAuth endpoints.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: MockServer,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // High enough that no test trips the blanket limit by accident.
        Self::with_rate_limit(10_000).await
    }

    /// Create a test server with an explicit blanket rate limit
    pub async fn with_rate_limit(max_requests: u32) -> Self {
        let github = MockServer::start().await;

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                client_url: "http://localhost:5173".to_string(),
            },
            github: config::GithubConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                callback_url: "http://localhost:3001/auth/github/callback".to_string(),
                authorize_url: format!("{}/login/oauth/authorize", github.uri()),
                token_url: format!("{}/login/oauth/access_token", github.uri()),
                api_base: github.uri(),
            },
            session: config::SessionConfig {
                max_age_seconds: 86_400,
            },
            rate_limit: config::RateLimitConfig {
                max_requests,
                window_seconds: 900,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Create HTTP client that keeps redirects observable
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = hubdash::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            github,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Seed an authenticated session directly in the store
    ///
    /// Returns the `Cookie` header value carrying the session id.
    pub async fn login(&self) -> String {
        let user = UserIdentity {
            id: 12345,
            username: "octocat".to_string(),
            display_name: Some("The Octocat".to_string()),
            avatar_url: Some("https://example.com/avatar.png".to_string()),
        };

        let session = self
            .state
            .sessions
            .create(user, "gho_test_token".to_string())
            .await;

        format!("session={}", session.id)
    }
}
