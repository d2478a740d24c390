//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub.
//! A failed exchange is isolated to the requesting browser: it clears the
//! CSRF cookie and lands on the login page, never the dashboard.

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use rand::RngCore;
use reqwest::header;
use serde::Deserialize;

use super::middleware::CurrentUser;
use super::session::{Session, UserIdentity};
use crate::AppState;
use crate::error::AppError;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_SCOPES: &str = "repo read:user";

/// Create authentication router
///
/// Routes (nested under /auth):
/// - GET /github - Redirect to GitHub consent screen
/// - GET /github/callback - OAuth callback
/// - POST /logout - Destroy session
/// - GET /me - Current identity
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/github", get(github_redirect))
        .route("/github/callback", get(github_callback))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

// =============================================================================
// GitHub OAuth
// =============================================================================

/// GET /auth/github
///
/// Generates a CSRF state token, stores it in a cookie, and redirects the
/// browser to the GitHub authorization page.
async fn github_redirect(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let csrf_state = generate_state_token();
    let authorize_url = build_authorize_url(&state.config.github, &csrf_state);

    let cookie = build_state_cookie(&csrf_state, state.config.should_use_secure_cookies());
    (jar.add(cookie), Redirect::to(&authorize_url))
}

/// Query parameters from the GitHub callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GitHub token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// GET /auth/github/callback
///
/// Verifies the CSRF state, exchanges the code for an access token, fetches
/// the profile, creates a session, and redirects to the dashboard. Every
/// failure path redirects to the login page instead.
async fn github_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let client_origin = state.config.server.client_origin();
    let login_url = format!("{client_origin}/");
    let dashboard_url = format!("{client_origin}/dashboard");

    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    let jar = jar.remove(clear_state_cookie());

    let state_matches = matches!(
        (query.state.as_deref(), expected_state.as_deref()),
        (Some(got), Some(want)) if !got.is_empty() && got == want
    );

    if let Some(provider_error) = query.error.as_deref() {
        tracing::warn!(error = %provider_error, "GitHub denied the authorization request");
        return (jar, Redirect::to(&login_url)).into_response();
    }

    if !state_matches {
        tracing::warn!("OAuth callback state mismatch");
        return (jar, Redirect::to(&login_url)).into_response();
    }

    let Some(code) = query.code.as_deref().filter(|code| !code.is_empty()) else {
        tracing::warn!("OAuth callback missing authorization code");
        return (jar, Redirect::to(&login_url)).into_response();
    };

    match complete_auth(&state, code).await {
        Ok(session) => {
            tracing::info!(username = %session.user.username, "User authenticated");
            let cookie =
                build_session_cookie(&session.id, state.config.should_use_secure_cookies());
            (jar.add(cookie), Redirect::to(&dashboard_url)).into_response()
        }
        Err(error) => {
            tracing::warn!(%error, "OAuth code exchange failed");
            (jar, Redirect::to(&login_url)).into_response()
        }
    }
}

/// Exchange the authorization code, fetch the profile, and open a session.
async fn complete_auth(state: &AppState, code: &str) -> Result<Session, AppError> {
    let access_token = exchange_code(state, code).await?;

    let profile = state
        .github
        .for_token(&access_token)
        .get_authenticated_user()
        .await?;

    let user = UserIdentity {
        id: profile.id,
        username: profile.login,
        display_name: profile.name,
        avatar_url: profile.avatar_url,
    };

    Ok(state.sessions.create(user, access_token).await)
}

/// POST the code to the token endpoint and return the access token.
async fn exchange_code(state: &AppState, code: &str) -> Result<String, AppError> {
    const ACTION: &str = "exchange authorization code";

    let github = &state.config.github;
    let response = state
        .http_client
        .post(&github.token_url)
        .header(header::ACCEPT, "application/json")
        .form(&[
            ("client_id", github.client_id.as_str()),
            ("client_secret", github.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", github.callback_url.as_str()),
        ])
        .send()
        .await
        .map_err(|error| AppError::upstream(ACTION, None, error.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::upstream(
            ACTION,
            Some(status.as_u16()),
            "token endpoint rejected the authorization code",
        ));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|error| AppError::upstream(ACTION, None, error.to_string()))?;

    token
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::upstream(ACTION, None, "token response missing access_token"))
}

// =============================================================================
// Logout / identity
// =============================================================================

/// POST /auth/logout
///
/// Destroys the session (when one exists), clears the cookie, and confirms.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await;
    }

    let jar = jar.remove(clear_session_cookie());
    (
        jar,
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    )
}

/// GET /auth/me
///
/// Returns the authenticated identity, or 401 without a valid session.
async fn me(CurrentUser(session): CurrentUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": session.user.id,
        "username": session.user.username,
        "displayName": session.user.display_name,
        "avatar": session.user.avatar_url,
    }))
}

// =============================================================================
// Helpers
// =============================================================================

fn generate_state_token() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn build_authorize_url(github: &crate::config::GithubConfig, csrf_state: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}&state={}",
        github.authorize_url,
        urlencoding::encode(&github.client_id),
        urlencoding::encode(&github.callback_url),
        urlencoding::encode(OAUTH_SCOPES),
        urlencoding::encode(csrf_state),
    )
}

fn build_session_cookie(session_id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_owned()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, String::new()))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}

fn build_state_cookie(csrf_state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, csrf_state.to_owned()))
        .path("/auth")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

fn clear_state_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((OAUTH_STATE_COOKIE, String::new()))
        .path("/auth")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_github_config() -> crate::config::GithubConfig {
        crate::config::GithubConfig {
            client_id: "client id".to_string(),
            client_secret: "secret".to_string(),
            callback_url: "http://localhost:3001/auth/github/callback".to_string(),
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            api_base: "https://api.github.com".to_string(),
        }
    }

    #[test]
    fn authorize_url_encodes_all_parameters() {
        let url = build_authorize_url(&test_github_config(), "st&ate");

        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3001%2Fauth%2Fgithub%2Fcallback"
        ));
        assert!(url.contains("scope=repo%20read%3Auser"));
        assert!(url.contains("state=st%26ate"));
    }

    #[test]
    fn state_tokens_are_unique() {
        assert_ne!(generate_state_token(), generate_state_token());
    }

    #[test]
    fn session_cookie_is_http_only_and_root_scoped() {
        let cookie = build_session_cookie("abc", true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn clear_cookies_are_removals() {
        let session = clear_session_cookie();
        assert_eq!(session.name(), SESSION_COOKIE);
        assert!(session.to_string().contains("Max-Age=0"));

        let state = clear_state_cookie();
        assert_eq!(state.name(), OAUTH_STATE_COOKIE);
        assert!(state.to_string().contains("Max-Age=0"));
    }
}
