//! Session management
//!
//! Server-side sessions keyed by a cryptographically random cookie value.
//! The upstream access token lives only here; it is attached to outbound
//! GitHub calls and never serialized into a response body.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tokio::sync::RwLock;

/// Identity derived from the GitHub profile at login
///
/// Immutable for the session's lifetime; re-derived on next login.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    /// GitHub user ID
    pub id: u64,
    /// GitHub login name
    pub username: String,
    /// Display name, when the profile has one
    pub display_name: Option<String>,
    /// Avatar URL from GitHub
    pub avatar_url: Option<String>,
}

/// A server-held session record
#[derive(Debug, Clone)]
pub struct Session {
    /// Random identifier, also the cookie value
    pub id: String,
    /// Authenticated identity
    pub user: UserIdentity,
    /// Upstream access token, attached server-side to outbound calls only
    pub access_token: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session expires (fixed 24h by default)
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Pluggable session store
///
/// The in-memory implementation is the default; an external backing store
/// can be swapped in without touching endpoint logic.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session for an authenticated identity. The caller is
    /// responsible for setting the matching cookie.
    async fn create(&self, user: UserIdentity, access_token: String) -> Session;

    /// Look up a session by id. Expired sessions are treated as absent.
    async fn get(&self, session_id: &str) -> Option<Session>;

    /// Remove a session. The caller is responsible for clearing the cookie.
    async fn destroy(&self, session_id: &str);
}

/// In-memory session store
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    max_age: Duration,
}

impl MemorySessionStore {
    /// Create a store issuing sessions with a fixed `max_age_seconds` expiry.
    pub fn new(max_age_seconds: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_age: Duration::seconds(max_age_seconds),
        }
    }
}

fn generate_session_id() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user: UserIdentity, access_token: String) -> Session {
        let now = Utc::now();
        let session = Session {
            id: generate_session_id(),
            user,
            access_token,
            created_at: now,
            expires_at: now + self.max_age,
        };

        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());

        session
    }

    async fn get(&self, session_id: &str) -> Option<Session> {
        let session = self.sessions.read().await.get(session_id).cloned()?;

        // Expiry is checked lazily on access; there is no background sweep.
        if session.is_expired() {
            self.sessions.write().await.remove(session_id);
            return None;
        }

        Some(session)
    }

    async fn destroy(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}
