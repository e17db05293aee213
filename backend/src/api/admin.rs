//! Admin dashboard: course, lecture and user tabs. Every route sits behind
//! [`require_admin`], which also hands the handlers the caller's repositories.

use std::collections::HashMap;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json, Router, middleware, routing::{get, post}};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{failure, with_status};
use crate::auth::{AdminUser, require_admin};
use crate::error::AppError;
use crate::models::{ActionResponse, Course, FileUpload, Lecture, Notice, SessionUser, UserSummary};
use crate::repository::Repositories;
use crate::services::course_form::{CourseFields, CourseForm};
use crate::services::lecture_form::{LectureFields, LectureForm};
use crate::services::{
    Confirmation, CourseList, DeleteOutcome, FilePreview, FormMode, LectureList, UploadAdapter, UserList, Written,
};
use crate::state::AppState;

const SAVE_FAILED: &str = "সংরক্ষণ ব্যর্থ";
const DELETE_FAILED: &str = "মুছে ফেলা ব্যর্থ";
const UPDATE_FAILED: &str = "হালনাগাদ ব্যর্থ";
const LIST_STALE: &str = "পরিবর্তন সংরক্ষিত হয়েছে, তবে তালিকা হালনাগাদ করা যায়নি";

pub fn routes(state: AppState) -> Router<AppState> {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(dashboard))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/new", get(new_course))
        .route("/courses/{id}", get(edit_course).post(update_course))
        .route("/courses/{id}/delete", post(delete_course))
        .route("/courses/{id}/visibility", post(course_visibility))
        .route("/lectures", get(list_lectures).post(create_lecture))
        .route("/lectures/new", get(new_lecture))
        .route("/lectures/{id}", get(edit_lecture).post(update_lecture))
        .route("/lectures/{id}/delete", post(delete_lecture))
        .route("/lectures/{id}/visibility", post(lecture_visibility))
        .route("/users", get(list_users))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

/// Text fields and files of a multipart submission. Empty file inputs are
/// dropped.
#[derive(Default)]
struct FormData {
    text: HashMap<String, String>,
    files: HashMap<String, FileUpload>,
}

impl FormData {
    async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut data = FormData::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    if file_name.is_empty() || bytes.is_empty() {
                        continue;
                    }
                    let mut file = FileUpload::new(file_name, bytes);
                    file.content_type = content_type;
                    data.files.insert(name, file);
                }
                None => {
                    data.text.insert(name, field.text().await?);
                }
            }
        }
        Ok(data)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    fn take_file(&mut self, name: &str) -> Option<FileUpload> {
        self.files.remove(name)
    }

    /// Checkbox value; absent means unchanged.
    fn flag(&self, name: &str) -> Option<bool> {
        self.text(name).map(parse_flag)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "true" | "on" | "1" | "yes")
}

#[derive(Deserialize)]
struct DeleteForm {
    #[serde(default)]
    confirm: String,
}

#[derive(Deserialize)]
struct VisibilityForm {
    value: String,
}

#[derive(Deserialize)]
struct LectureFilter {
    course_id: Option<String>,
}

#[derive(Serialize)]
struct Stat {
    label: &'static str,
    value: usize,
}

#[derive(Serialize)]
struct DashboardView {
    user: SessionUser,
    stats: Vec<Stat>,
}

/// An open form as the dialog renders it.
#[derive(Serialize)]
struct FormView<F: Serialize> {
    mode: &'static str,
    fields: F,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    previews: Vec<(&'static str, FilePreview)>,
}

fn mode_name<T>(mode: &FormMode<T>) -> &'static str {
    if mode.is_create() { "create" } else { "edit" }
}

#[derive(Serialize)]
struct Saved<T: Serialize, L: Serialize> {
    saved: T,
    items: Vec<L>,
}

/// Success notice for a write; a failed re-fetch is mentioned but does not
/// turn the write into a failure.
fn written_notice<T>(title: &str, written: &Written<T>) -> Notice {
    match &written.stale {
        None => Notice::success(title),
        Some(e) => Notice::success(title).with_description(format!("{} ({})", LIST_STALE, e.report())),
    }
}

async fn dashboard(
    Extension(repos): Extension<Repositories>,
    Extension(AdminUser(user)): Extension<AdminUser>,
) -> Result<Json<DashboardView>, AppError> {
    let courses = repos.courses.list().await?.len();
    let lectures = repos.lectures.list(None).await?.len();
    let users = repos.profiles.list().await?.len();
    Ok(Json(DashboardView {
        user,
        stats: vec![
            Stat { label: "মোট কোর্স", value: courses },
            Stat { label: "মোট লেকচার", value: lectures },
            Stat { label: "মোট ব্যবহারকারী", value: users },
        ],
    }))
}

async fn list_courses(Extension(repos): Extension<Repositories>) -> Result<Json<Vec<Course>>, AppError> {
    Ok(Json(CourseList::load(repos.courses).await?.into_items()))
}

async fn new_course() -> Json<FormView<CourseFields>> {
    let form = CourseForm::open(FormMode::Create);
    Json(FormView { mode: mode_name(form.mode()), fields: form.fields().clone(), previews: Vec::new() })
}

async fn edit_course(
    Extension(repos): Extension<Repositories>,
    Path(id): Path<String>,
) -> Result<Json<FormView<CourseFields>>, AppError> {
    let course = repos.courses.get(&id).await?.ok_or(AppError::NotFound)?;
    let form = CourseForm::open(FormMode::Edit(course));
    Ok(Json(FormView {
        mode: mode_name(form.mode()),
        fields: form.fields().clone(),
        previews: form.thumbnail_preview().map(|p| ("thumbnail", p)).into_iter().collect(),
    }))
}

async fn create_course(Extension(repos): Extension<Repositories>, multipart: Multipart) -> Response {
    save_course(repos, None, multipart).await
}

async fn update_course(
    Extension(repos): Extension<Repositories>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    save_course(repos, Some(id), multipart).await
}

async fn save_course(repos: Repositories, id: Option<String>, multipart: Multipart) -> Response {
    let mut data = match FormData::read(multipart).await {
        Ok(data) => data,
        Err(e) => return e.into_response(),
    };

    let mode = match id {
        None => FormMode::Create,
        Some(id) => match repos.courses.get(&id).await {
            Ok(Some(course)) => FormMode::Edit(course),
            Ok(None) => return failure(SAVE_FAILED, AppError::NotFound),
            Err(e) => return failure(SAVE_FAILED, e),
        },
    };
    let created = mode.is_create();
    let mut form = CourseForm::open(mode);

    if let Some(title) = data.text("title") {
        form.set_title(title);
    }
    if let Some(slug) = data.text("slug") {
        // A blank slug on a new course keeps the derived one.
        if !created || !slug.trim().is_empty() {
            form.set_slug(slug);
        }
    }
    if let Some(description) = data.text("description") {
        form.set_description(description);
    }
    if let Some(instructor) = data.text("instructor") {
        form.set_instructor(instructor);
    }
    if let Some(url) = data.text("thumbnail_url") {
        form.set_thumbnail_url(url);
    }
    if let Some(published) = data.flag("is_published") {
        form.set_published(published);
    }
    if let Some(file) = data.take_file("thumbnail") {
        form.attach_thumbnail(file);
    }

    if let Err(e) = form.validate() {
        return failure(SAVE_FAILED, e);
    }

    let uploads = UploadAdapter::new(repos.storage.clone());
    let mut list = CourseList::new(repos.courses.clone());
    match list.save(&mut form, &uploads).await {
        Ok(written) => {
            let (status, title) = if created {
                (StatusCode::CREATED, "কোর্স তৈরি হয়েছে")
            } else {
                (StatusCode::OK, "কোর্স আপডেট হয়েছে")
            };
            let notice = written_notice(title, &written);
            let body = Saved { saved: written.value, items: list.into_items() };
            with_status(status, ActionResponse::with_data(notice, body))
        }
        Err(e) => failure(SAVE_FAILED, e),
    }
}

async fn delete_course(
    Extension(repos): Extension<Repositories>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Response {
    let confirmation = Confirmation::from(parse_flag(&form.confirm));
    let mut list = CourseList::new(repos.courses);
    match list.delete(&id, confirmation).await {
        Ok(written) if written.value == DeleteOutcome::Cancelled => {
            debug!("delete cancelled");
            match list.refresh().await {
                Ok(()) => cancelled(list.into_items()),
                Err(e) => failure(DELETE_FAILED, e),
            }
        }
        Ok(written) => {
            let notice = written_notice("কোর্স মুছে ফেলা হয়েছে", &written);
            Json(ActionResponse::with_data(notice, list.into_items())).into_response()
        }
        Err(e) => failure(DELETE_FAILED, e),
    }
}

fn cancelled<T: Serialize>(items: Vec<T>) -> Response {
    Json(ActionResponse::with_data(Notice::success("মুছে ফেলা বাতিল করা হয়েছে"), items)).into_response()
}

async fn course_visibility(
    Extension(repos): Extension<Repositories>,
    Path(id): Path<String>,
    Form(form): Form<VisibilityForm>,
) -> Response {
    let published = parse_flag(&form.value);
    let mut list = CourseList::new(repos.courses);
    match list.set_published(&id, published).await {
        Ok(written) => {
            let title = if published { "কোর্স প্রকাশিত হয়েছে" } else { "কোর্স অপ্রকাশিত করা হয়েছে" };
            let notice = written_notice(title, &written);
            Json(ActionResponse::with_data(notice, list.into_items())).into_response()
        }
        Err(e) => failure(UPDATE_FAILED, e),
    }
}

async fn list_lectures(
    Extension(repos): Extension<Repositories>,
    Query(filter): Query<LectureFilter>,
) -> Result<Json<Vec<Lecture>>, AppError> {
    Ok(Json(LectureList::load(repos.lectures, filter.course_id).await?.into_items()))
}

/// New lecture dialog, preselecting the first course of the list.
async fn new_lecture(Extension(repos): Extension<Repositories>) -> Result<Json<FormView<LectureFields>>, AppError> {
    let first_course = repos.courses.list().await?.into_iter().next().map(|c| c.id);
    let form = LectureForm::open(FormMode::Create, first_course);
    Ok(Json(FormView { mode: mode_name(form.mode()), fields: form.fields().clone(), previews: Vec::new() }))
}

async fn edit_lecture(
    Extension(repos): Extension<Repositories>,
    Path(id): Path<String>,
) -> Result<Json<FormView<LectureFields>>, AppError> {
    let lecture = repos.lectures.get(&id).await?.ok_or(AppError::NotFound)?;
    let form = LectureForm::open(FormMode::Edit(lecture), None);
    let previews = [("pdf", form.pdf_preview()), ("thumbnail", form.thumbnail_preview())]
        .into_iter()
        .filter_map(|(name, p)| p.map(|p| (name, p)))
        .collect();
    Ok(Json(FormView { mode: mode_name(form.mode()), fields: form.fields().clone(), previews }))
}

async fn create_lecture(Extension(repos): Extension<Repositories>, multipart: Multipart) -> Response {
    save_lecture(repos, None, multipart).await
}

async fn update_lecture(
    Extension(repos): Extension<Repositories>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    save_lecture(repos, Some(id), multipart).await
}

async fn save_lecture(repos: Repositories, id: Option<String>, multipart: Multipart) -> Response {
    let mut data = match FormData::read(multipart).await {
        Ok(data) => data,
        Err(e) => return e.into_response(),
    };

    let sort_order = match data.text("sort_order").map(str::trim) {
        None => None,
        Some("") => Some(0),
        Some(raw) => match raw.parse::<i32>() {
            Ok(n) => Some(n),
            Err(_) => {
                return failure(SAVE_FAILED, AppError::validation("sort_order", "ক্রম অবশ্যই একটি পূর্ণসংখ্যা হতে হবে"));
            }
        },
    };

    let mode = match id {
        None => FormMode::Create,
        Some(id) => match repos.lectures.get(&id).await {
            Ok(Some(lecture)) => FormMode::Edit(lecture),
            Ok(None) => return failure(SAVE_FAILED, AppError::NotFound),
            Err(e) => return failure(SAVE_FAILED, e),
        },
    };
    let created = mode.is_create();
    let mut form = LectureForm::open(mode, None);

    if let Some(course_id) = data.text("course_id") {
        form.set_course(course_id);
    }
    if let Some(title) = data.text("title") {
        form.set_title(title);
    }
    if let Some(url) = data.text("youtube_url") {
        form.set_youtube_url(url);
    }
    if let Some(url) = data.text("pdf_url") {
        form.set_pdf_url(url);
    }
    if let Some(url) = data.text("thumbnail_url") {
        form.set_thumbnail_url(url);
    }
    if let Some(sort_order) = sort_order {
        form.set_sort_order(sort_order);
    }
    if let Some(public) = data.flag("is_public") {
        form.set_public(public);
    }
    if let Some(file) = data.take_file("pdf") {
        form.attach_pdf(file);
    }
    if let Some(file) = data.take_file("thumbnail") {
        form.attach_thumbnail(file);
    }

    if let Err(e) = form.validate() {
        return failure(SAVE_FAILED, e);
    }

    let uploads = UploadAdapter::new(repos.storage.clone());
    let course_filter = Some(form.fields().course_id.trim().to_string());
    let mut list = LectureList::new(repos.lectures.clone(), course_filter);
    match list.save(&mut form, &uploads).await {
        Ok(written) => {
            let (status, title) = if created {
                (StatusCode::CREATED, "লেকচার তৈরি হয়েছে")
            } else {
                (StatusCode::OK, "লেকচার আপডেট হয়েছে")
            };
            let notice = written_notice(title, &written);
            let body = Saved { saved: written.value, items: list.into_items() };
            with_status(status, ActionResponse::with_data(notice, body))
        }
        Err(e) => failure(SAVE_FAILED, e),
    }
}

async fn delete_lecture(
    Extension(repos): Extension<Repositories>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Response {
    let confirmation = Confirmation::from(parse_flag(&form.confirm));
    let mut list = LectureList::new(repos.lectures, None);
    match list.delete(&id, confirmation).await {
        Ok(written) if written.value == DeleteOutcome::Cancelled => {
            debug!("delete cancelled");
            match list.refresh().await {
                Ok(()) => cancelled(list.into_items()),
                Err(e) => failure(DELETE_FAILED, e),
            }
        }
        Ok(written) => {
            let notice = written_notice("লেকচার মুছে ফেলা হয়েছে", &written);
            Json(ActionResponse::with_data(notice, list.into_items())).into_response()
        }
        Err(e) => failure(DELETE_FAILED, e),
    }
}

async fn lecture_visibility(
    Extension(repos): Extension<Repositories>,
    Path(id): Path<String>,
    Form(form): Form<VisibilityForm>,
) -> Response {
    let public = parse_flag(&form.value);
    let mut list = LectureList::new(repos.lectures, None);
    match list.set_public(&id, public).await {
        Ok(written) => {
            let title = if public { "লেকচার উন্মুক্ত করা হয়েছে" } else { "লেকচার লক করা হয়েছে" };
            let notice = written_notice(title, &written);
            Json(ActionResponse::with_data(notice, list.into_items())).into_response()
        }
        Err(e) => failure(UPDATE_FAILED, e),
    }
}

async fn list_users(Extension(repos): Extension<Repositories>) -> Result<Json<Vec<UserSummary>>, AppError> {
    let users = UserList::load(repos.profiles.as_ref(), repos.roles.as_ref()).await?;
    Ok(Json(users.into_items()))
}
