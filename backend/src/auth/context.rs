//! Authentication context: the `{ user, loading }` state every page reads.
//!
//! Each browser gets one context. It is created with `loading = true` when
//! the browser mounts (signs in, or presents a bearer token), changes only
//! through [`AuthContext::apply`], and is dropped on sign-out.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

use crate::auth::provider::{AuthProvider, SignUpOutcome};
use crate::error::AppError;
use crate::models::{Session, SessionUser};

/// Refresh the access token when it expires within this many seconds.
const REFRESH_LEEWAY_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    InitialSession(Option<Session>),
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
    PasswordRecovery(Session),
    UserUpdated(SessionUser),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthState {
    pub user: Option<SessionUser>,
    #[serde(skip)]
    pub session: Option<Session>,
    pub loading: bool,
    #[serde(skip)]
    pub recovery: bool,
}

impl AuthState {
    fn pending() -> Self {
        Self { loading: true, ..Self::default() }
    }

    fn reduce(&mut self, event: &AuthEvent) {
        match event {
            AuthEvent::InitialSession(session) => {
                self.user = session.as_ref().map(|s| s.user.clone());
                self.session = session.clone();
                self.recovery = false;
            }
            AuthEvent::SignedIn(session) => {
                self.user = Some(session.user.clone());
                self.session = Some(session.clone());
                self.recovery = false;
            }
            AuthEvent::SignedOut => {
                self.user = None;
                self.session = None;
                self.recovery = false;
            }
            AuthEvent::TokenRefreshed(session) => {
                self.user = Some(session.user.clone());
                self.session = Some(session.clone());
            }
            AuthEvent::PasswordRecovery(session) => {
                self.user = Some(session.user.clone());
                self.session = Some(session.clone());
                self.recovery = true;
            }
            AuthEvent::UserUpdated(user) => {
                self.user = Some(user.clone());
                if let Some(session) = self.session.as_mut() {
                    session.user = user.clone();
                }
            }
        }
        self.loading = false;
    }
}

pub struct AuthContext {
    provider: Arc<dyn AuthProvider>,
    state: watch::Sender<AuthState>,
    events: broadcast::Sender<AuthEvent>,
    refresh: Mutex<()>,
}

impl AuthContext {
    pub fn mount(provider: Arc<dyn AuthProvider>) -> Self {
        let (state, _) = watch::channel(AuthState::pending());
        let (events, _) = broadcast::channel(16);
        Self { provider, state, events, refresh: Mutex::new(()) }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Session-change notifications, including `PasswordRecovery`.
    pub fn events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().session.as_ref().map(|s| s.access_token.clone())
    }

    /// The only mutation path of the context.
    pub fn apply(&self, event: AuthEvent) {
        debug!("auth event: {}", event_name(&event));
        self.state.send_modify(|state| state.reduce(&event));
        let _ = self.events.send(event);
    }

    /// Waits until the context is no longer loading.
    pub async fn loaded(&self) -> AuthState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Resolves a bearer token presented by a client into the initial session.
    pub async fn restore(&self, access_token: &str) -> AuthState {
        let session = match self.provider.get_user(access_token).await {
            Ok(user) => Some(Session {
                access_token: access_token.to_string(),
                refresh_token: None,
                expires_at: None,
                user,
            }),
            Err(e) => {
                debug!("bearer token rejected: {}", e);
                None
            }
        };
        self.apply(AuthEvent::InitialSession(session));
        self.snapshot()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionUser, AppError> {
        let session = self.provider.sign_in(email, password).await?;
        let user = session.user.clone();
        info!("user {} signed in", user.id);
        self.apply(AuthEvent::SignedIn(session));
        Ok(user)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpOutcome, AppError> {
        let outcome = self.provider.sign_up(email, password, display_name).await?;
        match &outcome {
            SignUpOutcome::SignedIn(session) => self.apply(AuthEvent::SignedIn(session.clone())),
            SignUpOutcome::ConfirmationSent(_) => self.apply(AuthEvent::InitialSession(None)),
        }
        Ok(outcome)
    }

    /// Signs out locally even when the provider call fails.
    pub async fn sign_out(&self) {
        if let Some(token) = self.access_token() {
            if let Err(e) = self.provider.sign_out(&token).await {
                warn!("sign-out request failed: {}", e);
            }
        }
        self.apply(AuthEvent::SignedOut);
    }

    pub async fn recover(&self, token_hash: &str) -> Result<(), AppError> {
        let session = self.provider.verify_recovery(token_hash).await?;
        self.apply(AuthEvent::PasswordRecovery(session));
        Ok(())
    }

    pub async fn update_password(&self, password: &str) -> Result<(), AppError> {
        let token = self
            .access_token()
            .ok_or_else(|| AppError::Unauthorized("সেশন পাওয়া যায়নি".to_string()))?;
        let user = self.provider.update_password(&token, password).await?;
        self.apply(AuthEvent::UserUpdated(user));
        Ok(())
    }

    /// Refreshes the access token when it is about to expire. Readers see
    /// `loading = true` while the refresh is in flight.
    pub async fn ensure_fresh(&self) {
        let _guard = self.refresh.lock().await;

        let refresh_token = {
            let state = self.state.borrow();
            match state.session.as_ref() {
                Some(s) if s.expires_within(REFRESH_LEEWAY_SECS) => s.refresh_token.clone(),
                _ => return,
            }
        };

        let Some(refresh_token) = refresh_token else {
            self.apply(AuthEvent::SignedOut);
            return;
        };

        self.state.send_modify(|state| state.loading = true);
        match self.provider.refresh(&refresh_token).await {
            Ok(session) => self.apply(AuthEvent::TokenRefreshed(session)),
            Err(e) => {
                warn!("token refresh failed: {}", e);
                self.apply(AuthEvent::SignedOut);
            }
        }
    }
}

fn event_name(event: &AuthEvent) -> &'static str {
    match event {
        AuthEvent::InitialSession(_) => "INITIAL_SESSION",
        AuthEvent::SignedIn(_) => "SIGNED_IN",
        AuthEvent::SignedOut => "SIGNED_OUT",
        AuthEvent::TokenRefreshed(_) => "TOKEN_REFRESHED",
        AuthEvent::PasswordRecovery(_) => "PASSWORD_RECOVERY",
        AuthEvent::UserUpdated(_) => "USER_UPDATED",
    }
}
