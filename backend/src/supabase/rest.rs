//! PostgREST implementations of the repository traits.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::SupabaseClient;
use super::dto::{CourseVisibility, LectureVisibility};
use crate::error::AppError;
use crate::models::{ADMIN_ROLE, Course, CoursePayload, Lecture, LecturePayload, Profile, UserRole};
use crate::repository::{CourseRepository, LectureRepository, ProfileRepository, RoleRepository};

impl SupabaseClient {
    fn table_url(&self, table: &str, params: &[(&str, String)]) -> Result<Url, AppError> {
        let mut url = self.endpoint(&format!("rest/v1/{}", table))?;
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, params: &[(&str, String)]) -> Result<Vec<T>, AppError> {
        let url = self.table_url(table, params)?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned>(&self, table: &str, body: &B) -> Result<T, AppError> {
        let url = self.table_url(table, &[])?;
        let rows: Vec<T> = self
            .send_json(
                self.request(Method::POST, url)
                    .header("Prefer", "return=representation")
                    .json(body),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Backend(format!("insert into {} returned no row", table)))
    }

    /// PATCH by id. Row-level security hides rows the caller cannot touch, so
    /// an empty representation reads as not found.
    async fn patch<B: Serialize + Sync, T: DeserializeOwned>(&self, table: &str, id: &str, body: &B) -> Result<T, AppError> {
        let url = self.table_url(table, &[("id", eq(id))])?;
        let rows: Vec<T> = self
            .send_json(
                self.request(Method::PATCH, url)
                    .header("Prefer", "return=representation")
                    .json(body),
            )
            .await?;
        rows.into_iter().next().ok_or(AppError::NotFound)
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> Result<(), AppError> {
        let url = self.table_url(table, &[("id", eq(id))])?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

fn all() -> (&'static str, String) {
    ("select", "*".to_string())
}

pub struct RestCourses(pub SupabaseClient);

#[async_trait]
impl CourseRepository for RestCourses {
    async fn list(&self) -> Result<Vec<Course>, AppError> {
        self.0
            .select("courses", &[all(), ("order", "created_at.desc".to_string())])
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<Course>, AppError> {
        let rows: Vec<Course> = self.0.select("courses", &[all(), ("id", eq(id))]).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Course>, AppError> {
        let rows: Vec<Course> = self
            .0
            .select(
                "courses",
                &[
                    all(),
                    ("slug", eq(slug)),
                    ("is_published", "eq.true".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn create(&self, payload: &CoursePayload) -> Result<Course, AppError> {
        self.0.insert("courses", payload).await
    }

    async fn update(&self, id: &str, payload: &CoursePayload) -> Result<Course, AppError> {
        self.0.patch("courses", id, payload).await
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.0.delete_by_id("courses", id).await
    }

    async fn set_visibility(&self, id: &str, published: bool) -> Result<(), AppError> {
        let body = CourseVisibility { is_published: published, updated_at: Utc::now() };
        let _: Course = self.0.patch("courses", id, &body).await?;
        Ok(())
    }
}

pub struct RestLectures(pub SupabaseClient);

#[async_trait]
impl LectureRepository for RestLectures {
    async fn list(&self, course_id: Option<&str>) -> Result<Vec<Lecture>, AppError> {
        let mut params = vec![all(), ("order", "sort_order.asc".to_string())];
        if let Some(course_id) = course_id {
            params.push(("course_id", eq(course_id)));
        }
        self.0.select("lectures", &params).await
    }

    async fn get(&self, id: &str) -> Result<Option<Lecture>, AppError> {
        let rows: Vec<Lecture> = self.0.select("lectures", &[all(), ("id", eq(id))]).await?;
        Ok(rows.into_iter().next())
    }

    async fn create(&self, payload: &LecturePayload) -> Result<Lecture, AppError> {
        self.0.insert("lectures", payload).await
    }

    async fn update(&self, id: &str, payload: &LecturePayload) -> Result<Lecture, AppError> {
        self.0.patch("lectures", id, payload).await
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.0.delete_by_id("lectures", id).await
    }

    async fn set_visibility(&self, id: &str, public: bool) -> Result<(), AppError> {
        let body = LectureVisibility { is_public: public, updated_at: Utc::now() };
        let _: Lecture = self.0.patch("lectures", id, &body).await?;
        Ok(())
    }
}

pub struct RestRoles(pub SupabaseClient);

#[async_trait]
impl RoleRepository for RestRoles {
    async fn is_admin(&self, user_id: &str) -> Result<bool, AppError> {
        let rows: Vec<UserRole> = self
            .0
            .select(
                "user_roles",
                &[
                    ("select", "user_id,role".to_string()),
                    ("user_id", eq(user_id)),
                    ("role", eq(ADMIN_ROLE)),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn admin_ids(&self) -> Result<Vec<String>, AppError> {
        let rows: Vec<UserRole> = self
            .0
            .select(
                "user_roles",
                &[("select", "user_id,role".to_string()), ("role", eq(ADMIN_ROLE))],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.user_id).collect())
    }
}

pub struct RestProfiles(pub SupabaseClient);

#[async_trait]
impl ProfileRepository for RestProfiles {
    async fn list(&self) -> Result<Vec<Profile>, AppError> {
        self.0
            .select(
                "profiles",
                &[("select", "id,full_name,email".to_string()), ("order", "full_name.asc,id.asc".to_string())],
            )
            .await
    }
}
