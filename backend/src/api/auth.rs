//! Sign-in, registration and password recovery screens.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::{Form, Json, Router, routing::{get, post}};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{failure, with_status};
use crate::auth::session::{clear_session_cookie, session_cookie};
use crate::auth::{AuthContext, AuthState, CurrentSession, SignUpOutcome};
use crate::error::AppError;
use crate::models::{ActionResponse, Notice, SessionUser};
use crate::state::AppState;

const MIN_PASSWORD_CHARS: usize = 6;
const ERROR_TITLE: &str = "ত্রুটি";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", get(open_reset).post(reset_password))
        .route("/session", get(current_session))
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RegisterForm {
    full_name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct EmailForm {
    email: String,
}

#[derive(Deserialize)]
struct ResetQuery {
    token_hash: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct ResetForm {
    password: String,
    confirm_password: String,
}

#[derive(Serialize)]
struct RecoveryView {
    recovery: bool,
}

fn required(field: &'static str, value: &str, message: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, message));
    }
    Ok(())
}

fn check_password_length(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::validation("password", "পাসওয়ার্ড কমপক্ষে ৬ অক্ষর হতে হবে।"));
    }
    Ok(())
}

/// Stores `context` as the caller's session, replacing any previous one, and
/// returns the cookie to set.
async fn mount_session(state: &AppState, previous: &CurrentSession, context: Arc<AuthContext>) -> String {
    if let Some(old) = previous.id {
        state.sessions.remove(&old).await;
    }
    let id = state.sessions.insert(context).await;
    session_cookie(id, state.config.secure_cookies())
}

async fn login(
    State(state): State<AppState>,
    session: CurrentSession,
    Form(form): Form<LoginForm>,
) -> Response {
    const TITLE: &str = "লগইন ব্যর্থ";
    if let Err(e) = required("email", &form.email, "ইমেইল আবশ্যক")
        .and_then(|_| required("password", &form.password, "পাসওয়ার্ড আবশ্যক"))
    {
        return failure(TITLE, e);
    }

    let context = Arc::new(AuthContext::mount(state.auth.clone()));
    match context.sign_in(form.email.trim(), &form.password).await {
        Ok(user) => {
            let cookie = mount_session(&state, &session, context).await;
            let body = ActionResponse::with_data(Notice::success("সফলভাবে লগইন হয়েছে!"), user).redirect_to("/");
            (AppendHeaders([(header::SET_COOKIE, cookie)]), Json(body)).into_response()
        }
        Err(AppError::Backend(msg)) => {
            warn!("sign-in rejected: {}", msg);
            with_status(StatusCode::UNAUTHORIZED, ActionResponse::notice(Notice::failure(TITLE, msg)))
        }
        Err(e) => failure(TITLE, e),
    }
}

async fn register(
    State(state): State<AppState>,
    session: CurrentSession,
    Form(form): Form<RegisterForm>,
) -> Response {
    const TITLE: &str = "রেজিস্ট্রেশন ব্যর্থ";
    let checked = required("full_name", &form.full_name, "নাম আবশ্যক")
        .and_then(|_| required("email", &form.email, "ইমেইল আবশ্যক"))
        .and_then(|_| check_password_length(&form.password));
    if let Err(e) = checked {
        return failure(TITLE, e);
    }

    let context = Arc::new(AuthContext::mount(state.auth.clone()));
    match context.sign_up(form.email.trim(), &form.password, form.full_name.trim()).await {
        Ok(SignUpOutcome::SignedIn(s)) => {
            info!("user {} registered", s.user.id);
            let cookie = mount_session(&state, &session, context).await;
            let body = ActionResponse::with_data(Notice::success("রেজিস্ট্রেশন সফল হয়েছে!"), s.user).redirect_to("/");
            (StatusCode::CREATED, AppendHeaders([(header::SET_COOKIE, cookie)]), Json(body)).into_response()
        }
        Ok(SignUpOutcome::ConfirmationSent(user)) => {
            info!("user {} registered, awaiting confirmation", user.id);
            let notice = Notice::success("রেজিস্ট্রেশন সফল হয়েছে!")
                .with_description("অ্যাকাউন্ট সক্রিয় করতে আপনার ইমেইল চেক করুন।");
            with_status(StatusCode::CREATED, ActionResponse::<SessionUser>::with_data(notice, user).redirect_to("/login"))
        }
        Err(e) => failure(TITLE, e),
    }
}

async fn logout(State(state): State<AppState>, session: CurrentSession) -> Response {
    session.context.sign_out().await;
    if let Some(id) = session.id {
        state.sessions.remove(&id).await;
    }
    let body = ActionResponse::notice(Notice::success("সফলভাবে লগআউট হয়েছে")).redirect_to("/");
    (
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie(state.config.secure_cookies()))]),
        Json(body),
    )
        .into_response()
}

async fn forgot_password(State(state): State<AppState>, Form(form): Form<EmailForm>) -> Response {
    if let Err(e) = required("email", &form.email, "ইমেইল আবশ্যক") {
        return failure(ERROR_TITLE, e);
    }
    let redirect_to = state.config.reset_password_redirect();
    match state.auth.request_password_reset(form.email.trim(), &redirect_to).await {
        Ok(()) => {
            info!("password reset requested");
            let notice = Notice::success("ইমেইল পাঠানো হয়েছে!").with_description("আপনার ইমেইল চেক করুন।");
            Json(ActionResponse::notice(notice)).into_response()
        }
        Err(e) => failure(ERROR_TITLE, e),
    }
}

/// Landing page of the recovery email. A valid token mounts a recovery
/// session; without one the current session's recovery flag is reported.
async fn open_reset(
    State(state): State<AppState>,
    session: CurrentSession,
    Query(query): Query<ResetQuery>,
) -> Response {
    let token_hash = match (query.token_hash.as_deref(), query.kind.as_deref()) {
        (Some(token), None | Some("recovery")) if !token.is_empty() => token,
        _ => {
            let recovery = session.context.snapshot().recovery;
            return Json(RecoveryView { recovery }).into_response();
        }
    };

    let context = Arc::new(AuthContext::mount(state.auth.clone()));
    match context.recover(token_hash).await {
        Ok(()) => {
            let cookie = mount_session(&state, &session, context).await;
            (AppendHeaders([(header::SET_COOKIE, cookie)]), Json(RecoveryView { recovery: true })).into_response()
        }
        Err(e) => failure(ERROR_TITLE, e),
    }
}

async fn reset_password(
    State(state): State<AppState>,
    session: CurrentSession,
    Form(form): Form<ResetForm>,
) -> Response {
    if form.password != form.confirm_password {
        return failure(ERROR_TITLE, AppError::validation("confirm_password", "পাসওয়ার্ড মিলছে না!"));
    }
    if let Err(e) = check_password_length(&form.password) {
        return failure(ERROR_TITLE, e);
    }
    if !session.context.snapshot().recovery {
        return failure(
            ERROR_TITLE,
            AppError::Unauthorized("রিসেট লিংকটি অবৈধ অথবা মেয়াদোত্তীর্ণ।".to_string()),
        );
    }

    if let Err(e) = session.context.update_password(&form.password).await {
        return failure(ERROR_TITLE, e);
    }

    session.context.sign_out().await;
    if let Some(id) = session.id {
        state.sessions.remove(&id).await;
    }
    let notice = Notice::success("সফল!").with_description("পাসওয়ার্ড আপডেট হয়েছে। এখন লগইন করুন।");
    (
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie(state.config.secure_cookies()))]),
        Json(ActionResponse::notice(notice).redirect_to("/login")),
    )
        .into_response()
}

async fn current_session(session: CurrentSession) -> Json<AuthState> {
    Json(session.context.loaded().await)
}
