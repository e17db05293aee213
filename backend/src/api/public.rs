use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentSession;
use crate::error::AppError;
use crate::models::{CourseCard, SessionUser};
use crate::services::catalog::{AppPromotion, Catalog, CoursePage, HomeView};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/courses", get(courses))
        .route("/course/{slug}", get(course_detail))
        .route("/app", get(app_page))
}

/// Page body with the header's signed-in user.
#[derive(Serialize)]
struct Page<T: Serialize> {
    user: Option<SessionUser>,
    #[serde(flatten)]
    content: T,
}

impl<T: Serialize> Page<T> {
    fn new(session: &CurrentSession, content: T) -> Json<Self> {
        Json(Self { user: session.context.snapshot().user, content })
    }
}

#[derive(Serialize)]
struct CoursesView {
    courses: Vec<CourseCard>,
}

#[derive(Deserialize)]
struct LectureQuery {
    lecture: Option<String>,
}

async fn home(State(state): State<AppState>, session: CurrentSession) -> Result<Json<Page<HomeView>>, AppError> {
    let view = Catalog::new(&session.repositories(&state)).home().await?;
    Ok(Page::new(&session, view))
}

async fn courses(State(state): State<AppState>, session: CurrentSession) -> Result<Json<Page<CoursesView>>, AppError> {
    let courses = Catalog::new(&session.repositories(&state)).courses().await?;
    Ok(Page::new(&session, CoursesView { courses }))
}

async fn course_detail(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(slug): Path<String>,
    Query(query): Query<LectureQuery>,
) -> Result<Response, AppError> {
    let page = Catalog::new(&session.repositories(&state))
        .course_detail(&slug, query.lecture.as_deref())
        .await?;
    let status = match page {
        CoursePage::Found(_) => StatusCode::OK,
        CoursePage::NotFound(_) => StatusCode::NOT_FOUND,
    };
    Ok((status, Page::new(&session, page)).into_response())
}

async fn app_page(session: CurrentSession) -> Json<Page<AppPromotion>> {
    Page::new(&session, AppPromotion::default())
}
