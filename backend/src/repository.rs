//! Narrow data-access interfaces, one per table.
//!
//! The hosted backend (`crate::supabase`) and the local SQLite store
//! (`crate::db::repository`) both implement these, so the form and list
//! controllers never see a transport.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Course, CoursePayload, Lecture, LecturePayload, Profile};
use crate::storage::ObjectStorage;

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// All courses, newest first.
    async fn list(&self) -> Result<Vec<Course>, AppError>;
    async fn get(&self, id: &str) -> Result<Option<Course>, AppError>;
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Course>, AppError>;
    async fn create(&self, payload: &CoursePayload) -> Result<Course, AppError>;
    async fn update(&self, id: &str, payload: &CoursePayload) -> Result<Course, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
    async fn set_visibility(&self, id: &str, published: bool) -> Result<(), AppError>;
}

#[async_trait]
pub trait LectureRepository: Send + Sync {
    /// Lectures ordered by `sort_order`, optionally restricted to one course.
    async fn list(&self, course_id: Option<&str>) -> Result<Vec<Lecture>, AppError>;
    async fn get(&self, id: &str) -> Result<Option<Lecture>, AppError>;
    async fn create(&self, payload: &LecturePayload) -> Result<Lecture, AppError>;
    async fn update(&self, id: &str, payload: &LecturePayload) -> Result<Lecture, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
    async fn set_visibility(&self, id: &str, public: bool) -> Result<(), AppError>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn is_admin(&self, user_id: &str) -> Result<bool, AppError>;
    async fn admin_ids(&self) -> Result<Vec<String>, AppError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Profile>, AppError>;
}

/// Repositories bound to one caller's credentials.
#[derive(Clone)]
pub struct Repositories {
    pub courses: Arc<dyn CourseRepository>,
    pub lectures: Arc<dyn LectureRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub storage: Arc<dyn ObjectStorage>,
}

/// Source of [`Repositories`]. Row-level policies on the hosted backend
/// depend on the caller, so every request asks for its own scope.
pub trait DataBackend: Send + Sync {
    fn scoped(&self, access_token: Option<&str>) -> Repositories;
}
