pub mod admin;
pub mod auth;
pub mod public;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::DataBackendKind;
use crate::error::AppError;
use crate::models::{ActionResponse, Notice};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .merge(public::routes())
        .merge(auth::routes())
        .nest("/admin", admin::routes(state.clone()));

    if state.config.data_backend == DataBackendKind::Sqlite {
        app = app.nest_service("/storage", ServeDir::new(&state.config.storage_dir));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    backend: &'static str,
    configured: bool,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let backend = match state.config.data_backend {
        DataBackendKind::Supabase => "supabase",
        DataBackendKind::Sqlite => "sqlite",
    };
    Json(Health { status: "ok", backend, configured: !state.config.is_placeholder() })
}

/// Destructive notice with the error's message, under the error's status.
pub(crate) fn failure(title: &str, e: AppError) -> Response {
    let notice = Notice::failure(title, e.report()).with_field(e.field());
    (e.status(), Json(ActionResponse::notice(notice))).into_response()
}

pub(crate) fn with_status<T: Serialize>(status: StatusCode, body: ActionResponse<T>) -> Response {
    (status, Json(body)).into_response()
}
