//! Authentication middleware
//!
//! Protects the proxy routes. Fails closed: without a valid session the
//! request is rejected before any upstream call is attempted.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::oauth::SESSION_COOKIE;
use super::session::Session;
use crate::AppState;
use crate::error::AppError;

async fn session_from_headers(headers: &HeaderMap, state: &AppState) -> Option<Session> {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(SESSION_COOKIE)?;
    state.sessions.get(cookie.value()).await
}

/// Middleware to require authentication
///
/// Looks up the session cookie in the store and adds the Session to request
/// extensions when valid.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/api/...", ...)
///     .route_layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = session_from_headers(request.headers(), &state)
        .await
        .ok_or(AppError::Unauthorized)?;

    // Add session to request extensions
    request.extensions_mut().insert(session);

    // Continue to next handler
    Ok(next.run(request).await)
}

/// Extractor for the current authenticated session
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(session): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", session.user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    /// Extract the current session from request extensions, falling back to
    /// a store lookup when the route is not behind `require_auth`.
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentUser(session));
        }

        let app_state = AppState::from_ref(state);
        let session = session_from_headers(&parts.headers, &app_state)
            .await
            .ok_or(AppError::Unauthorized)?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}
