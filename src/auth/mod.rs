//! GitHub OAuth authentication
//!
//! Handles:
//! - GitHub OAuth flow
//! - Server-side session management
//! - Authentication middleware

mod middleware;
mod oauth;
pub mod session;

pub use middleware::{CurrentUser, require_auth};
pub use oauth::{SESSION_COOKIE, auth_router};
pub use session::{MemorySessionStore, Session, SessionStore, UserIdentity};
