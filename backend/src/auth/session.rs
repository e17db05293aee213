//! Per-browser authentication contexts, keyed by an opaque cookie.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::auth::context::{AuthContext, AuthEvent};
use crate::repository::Repositories;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "md_session";

/// Sessions not seen for this long are dropped.
pub const SESSION_IDLE_LIMIT: Duration = Duration::from_secs(14 * 24 * 60 * 60);

struct Entry {
    context: Arc<AuthContext>,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
    idle_limit: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_limit(SESSION_IDLE_LIMIT)
    }
}

impl SessionStore {
    pub fn with_idle_limit(idle_limit: Duration) -> Self {
        Self { inner: Arc::default(), idle_limit }
    }

    /// Stores a new session and drops the ones that went idle.
    pub async fn insert(&self, context: Arc<AuthContext>) -> Uuid {
        let id = Uuid::new_v4();
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_limit);
        if sessions.len() < before {
            debug!("dropped {} idle sessions", before - sessions.len());
        }
        sessions.insert(id, Entry { context, last_seen: now });
        id
    }

    /// Looks up a session and marks it as seen. An idle one is removed
    /// instead.
    pub async fn get(&self, id: &Uuid) -> Option<Arc<AuthContext>> {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let entry = sessions.get_mut(id)?;
        if now.duration_since(entry.last_seen) >= self.idle_limit {
            sessions.remove(id);
            return None;
        }
        entry.last_seen = now;
        Some(entry.context.clone())
    }

    pub async fn remove(&self, id: &Uuid) -> Option<Arc<AuthContext>> {
        self.inner.write().await.remove(id).map(|entry| entry.context)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

/// Reads the session id from the `Cookie` header, ignoring malformed values.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;
    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=') {
            if name == SESSION_COOKIE {
                return Uuid::parse_str(value).ok();
            }
        }
    }
    None
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn session_cookie(id: Uuid, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// The caller's auth context: the stored one for a known cookie, otherwise a
/// transient context resolved from a bearer token (or anonymous).
pub struct CurrentSession {
    pub id: Option<Uuid>,
    pub context: Arc<AuthContext>,
}

impl CurrentSession {
    pub fn repositories(&self, state: &AppState) -> Repositories {
        state.backend.scoped(self.context.access_token().as_deref())
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(id) = session_id_from_headers(&parts.headers) {
            if let Some(context) = state.sessions.get(&id).await {
                context.ensure_fresh().await;
                if context.snapshot().user.is_some() {
                    return Ok(Self { id: Some(id), context });
                }
                // Signed out, usually after a failed refresh.
                state.sessions.remove(&id).await;
                return Ok(Self { id: None, context });
            }
        }

        let context = Arc::new(AuthContext::mount(state.auth.clone()));
        match bearer_token(&parts.headers) {
            Some(token) => {
                context.restore(token).await;
            }
            None => context.apply(AuthEvent::InitialSession(None)),
        }
        Ok(Self { id: None, context })
    }
}
