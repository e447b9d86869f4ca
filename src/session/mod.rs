//! Session state owned by the gateway process.
//!
//! # Responsibilities
//! - Map opaque session-cookie values to per-browser session state
//! - Explicit lifecycle: create, update, invalidate, lazy idle expiry
//! - Per-session async lock serializing login completion
//!
//! # Design Decisions
//! - Sessions live in a concurrent in-process map, never persisted
//! - Map access is guard-scoped and synchronous; nothing holds a map
//!   reference across an await point
//! - The principal is recomputed from the stored ID-token claims on every
//!   access, so a token refresh is visible without extra bookkeeping

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::oidc::token::IdTokenClaims;

/// Authenticated state established by a completed authorization-code flow.
#[derive(Debug, Clone)]
pub struct Authentication {
    /// Raw ID token, kept for the end-session hint at logout.
    pub id_token: String,
    /// Validated claims of the current ID token.
    pub claims: IdTokenClaims,
}

/// In-flight login bookkeeping between the authorize redirect and the
/// provider callback.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// Random value echoed back by the provider in the callback.
    pub state: String,
    /// Where the browser goes once the exchange completes.
    pub redirect_to: String,
}

/// One browser context's server-side state.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: Instant,
    pub csrf_token: Option<String>,
    pub auth: Option<Authentication>,
    pub login: Option<LoginState>,
}

/// Minimal identity view derived from the ID-token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub preferred_username: String,
    pub given_name: String,
    pub family_name: String,
    pub roles: Vec<String>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Instant::now(),
            csrf_token: None,
            auth: None,
            login: None,
        }
    }

    /// Project the current claims into a [`Principal`].
    ///
    /// This is a view over the session's token, not a cache: it reflects
    /// whatever claims the session holds at call time.
    pub fn principal(&self) -> Option<Principal> {
        let claims = &self.auth.as_ref()?.claims;
        Some(Principal {
            subject: claims.sub.clone(),
            preferred_username: claims.preferred_username.clone().unwrap_or_default(),
            given_name: claims.given_name.clone().unwrap_or_default(),
            family_name: claims.family_name.clone().unwrap_or_default(),
            roles: claims.roles.clone().unwrap_or_default(),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }
}

/// Thread-safe keyed store for all live sessions.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    login_locks: DashMap<String, Arc<Mutex<()>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            login_locks: DashMap::new(),
            ttl,
        }
    }

    /// Create a fresh anonymous session and return a snapshot of it.
    pub fn create(&self) -> Session {
        let session = Session::new();
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Look up a session, expiring it if its lifetime has passed.
    pub fn get(&self, id: &str) -> Option<Session> {
        let expired = match self.sessions.get(id) {
            Some(entry) => entry.created_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            self.invalidate(id);
            return None;
        }
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Apply a mutation to a live session and return the updated snapshot.
    ///
    /// The closure runs under the map entry's write guard, so concurrent
    /// updates to one session are serialized.
    pub fn update<F>(&self, id: &str, f: F) -> Option<Session>
    where
        F: FnOnce(&mut Session),
    {
        let mut entry = self.sessions.get_mut(id)?;
        f(entry.value_mut());
        Some(entry.value().clone())
    }

    /// Destroy a session. Returns the final state it had, if any.
    pub fn invalidate(&self, id: &str) -> Option<Session> {
        self.login_locks.remove(id);
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Lock serializing login completion for one session id.
    ///
    /// Held across the token exchange so concurrent provider callbacks for
    /// the same session run it at most once.
    pub fn login_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.login_locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
