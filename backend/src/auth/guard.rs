//! Admin route guard.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::{debug, warn};

use crate::auth::context::AuthState;
use crate::auth::session::CurrentSession;
use crate::models::SessionUser;
use crate::repository::RoleRepository;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Pending,
    RedirectToLogin,
    RedirectToHome,
    Allow(SessionUser),
}

/// Signed-in administrator, available to handlers behind [`require_admin`].
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

pub async fn check_admin(state: &AuthState, roles: &dyn RoleRepository) -> GuardDecision {
    if state.loading {
        return GuardDecision::Pending;
    }
    let Some(user) = state.user.as_ref() else {
        return GuardDecision::RedirectToLogin;
    };

    match roles.is_admin(&user.id).await {
        Ok(true) => GuardDecision::Allow(user.clone()),
        Ok(false) => GuardDecision::RedirectToHome,
        Err(e) => {
            warn!("role lookup for {} failed: {}", user.id, e);
            GuardDecision::RedirectToHome
        }
    }
}

/// Redirects silently unless the caller is an administrator. While the
/// context is loading the request waits for it to settle.
pub async fn require_admin(
    State(app): State<AppState>,
    session: CurrentSession,
    mut req: Request,
    next: Next,
) -> Response {
    loop {
        let snapshot = session.context.snapshot();
        let repos = session.repositories(&app);
        match check_admin(&snapshot, repos.roles.as_ref()).await {
            GuardDecision::Pending => {
                session.context.loaded().await;
            }
            GuardDecision::RedirectToLogin => {
                debug!("guard: anonymous request to {}", req.uri().path());
                return Redirect::to("/login").into_response();
            }
            GuardDecision::RedirectToHome => {
                debug!("guard: non-admin request to {}", req.uri().path());
                return Redirect::to("/").into_response();
            }
            GuardDecision::Allow(user) => {
                req.extensions_mut().insert(AdminUser(user));
                req.extensions_mut().insert(repos);
                return next.run(req).await;
            }
        }
    }
}
