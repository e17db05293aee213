use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ADMIN_ROLE, Course, CoursePayload, Lecture, LecturePayload, Profile};
use crate::repository::{
    CourseRepository, DataBackend, LectureRepository, ProfileRepository, Repositories,
    RoleRepository,
};
use crate::storage::ObjectStorage;

/// Constraint violations are rejections, reported verbatim like the hosted
/// backend does; everything else is an internal database error.
fn db_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) => AppError::Backend(db.message().to_string()),
        _ => AppError::Database(e),
    }
}

pub struct SqliteCourses(pub SqlitePool);

#[async_trait]
impl CourseRepository for SqliteCourses {
    async fn list(&self) -> Result<Vec<Course>, AppError> {
        sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, slug, description, thumbnail_url, instructor,
                is_published, created_at, updated_at
            FROM courses
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.0)
        .await
        .map_err(db_error)
    }

    async fn get(&self, id: &str) -> Result<Option<Course>, AppError> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.0)
            .await
            .map_err(db_error)
    }

    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Course>, AppError> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE slug = ?1 AND is_published = 1")
            .bind(slug)
            .fetch_optional(&self.0)
            .await
            .map_err(db_error)
    }

    async fn create(&self, payload: &CoursePayload) -> Result<Course, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO courses
                (id, title, slug, description, thumbnail_url, instructor,
                is_published, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&id)
        .bind(&payload.title)
        .bind(&payload.slug)
        .bind(&payload.description)
        .bind(&payload.thumbnail_url)
        .bind(&payload.instructor)
        .bind(payload.is_published)
        .bind(now)
        .bind(payload.updated_at)
        .execute(&self.0)
        .await
        .map_err(db_error)?;

        Ok(Course {
            id,
            title: payload.title.clone(),
            slug: payload.slug.clone(),
            description: payload.description.clone(),
            thumbnail_url: payload.thumbnail_url.clone(),
            instructor: payload.instructor.clone(),
            is_published: payload.is_published,
            created_at: now,
            updated_at: payload.updated_at,
        })
    }

    async fn update(&self, id: &str, payload: &CoursePayload) -> Result<Course, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET title = ?1, slug = ?2, description = ?3, thumbnail_url = ?4,
                instructor = ?5, is_published = ?6, updated_at = ?7
            WHERE id = ?8
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.slug)
        .bind(&payload.description)
        .bind(&payload.thumbnail_url)
        .bind(&payload.instructor)
        .bind(payload.is_published)
        .bind(payload.updated_at)
        .bind(id)
        .execute(&self.0)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        self.get(id).await?.ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(id)
            .execute(&self.0)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn set_visibility(&self, id: &str, published: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE courses SET is_published = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(published)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.0)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

pub struct SqliteLectures(pub SqlitePool);

#[async_trait]
impl LectureRepository for SqliteLectures {
    async fn list(&self, course_id: Option<&str>) -> Result<Vec<Lecture>, AppError> {
        sqlx::query_as::<_, Lecture>(
            r#"
            SELECT id, course_id, title, youtube_url, pdf_url, thumbnail_url,
                sort_order, is_public, updated_at
            FROM lectures
            WHERE ?1 IS NULL OR course_id = ?1
            ORDER BY sort_order ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.0)
        .await
        .map_err(db_error)
    }

    async fn get(&self, id: &str) -> Result<Option<Lecture>, AppError> {
        sqlx::query_as::<_, Lecture>("SELECT * FROM lectures WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.0)
            .await
            .map_err(db_error)
    }

    async fn create(&self, payload: &LecturePayload) -> Result<Lecture, AppError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO lectures
                (id, course_id, title, youtube_url, pdf_url, thumbnail_url,
                sort_order, is_public, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&id)
        .bind(&payload.course_id)
        .bind(&payload.title)
        .bind(&payload.youtube_url)
        .bind(&payload.pdf_url)
        .bind(&payload.thumbnail_url)
        .bind(payload.sort_order)
        .bind(payload.is_public)
        .bind(payload.updated_at)
        .execute(&self.0)
        .await
        .map_err(db_error)?;

        Ok(Lecture {
            id,
            course_id: payload.course_id.clone(),
            title: payload.title.clone(),
            youtube_url: payload.youtube_url.clone(),
            pdf_url: payload.pdf_url.clone(),
            thumbnail_url: payload.thumbnail_url.clone(),
            sort_order: payload.sort_order,
            is_public: payload.is_public,
            updated_at: payload.updated_at,
        })
    }

    async fn update(&self, id: &str, payload: &LecturePayload) -> Result<Lecture, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE lectures
            SET course_id = ?1, title = ?2, youtube_url = ?3, pdf_url = ?4,
                thumbnail_url = ?5, sort_order = ?6, is_public = ?7, updated_at = ?8
            WHERE id = ?9
            "#,
        )
        .bind(&payload.course_id)
        .bind(&payload.title)
        .bind(&payload.youtube_url)
        .bind(&payload.pdf_url)
        .bind(&payload.thumbnail_url)
        .bind(payload.sort_order)
        .bind(payload.is_public)
        .bind(payload.updated_at)
        .bind(id)
        .execute(&self.0)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        self.get(id).await?.ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM lectures WHERE id = ?1")
            .bind(id)
            .execute(&self.0)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn set_visibility(&self, id: &str, public: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE lectures SET is_public = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(public)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.0)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

pub struct SqliteRoles(pub SqlitePool);

#[async_trait]
impl RoleRepository for SqliteRoles {
    async fn is_admin(&self, user_id: &str) -> Result<bool, AppError> {
        let found: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM user_roles WHERE user_id = ?1 AND role = ?2")
                .bind(user_id)
                .bind(ADMIN_ROLE)
                .fetch_optional(&self.0)
                .await
                .map_err(db_error)?;
        Ok(found.is_some())
    }

    async fn admin_ids(&self) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT user_id FROM user_roles WHERE role = ?1")
            .bind(ADMIN_ROLE)
            .fetch_all(&self.0)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

pub struct SqliteProfiles(pub SqlitePool);

#[async_trait]
impl ProfileRepository for SqliteProfiles {
    async fn list(&self) -> Result<Vec<Profile>, AppError> {
        sqlx::query_as::<_, Profile>("SELECT id, full_name, email FROM profiles ORDER BY full_name, id")
            .fetch_all(&self.0)
            .await
            .map_err(db_error)
    }
}

/// Local tables plus a local storage directory. Users still authenticate
/// against the hosted project; roles and profiles live here.
pub struct SqliteBackend {
    pool: SqlitePool,
    storage: Arc<dyn ObjectStorage>,
}

impl SqliteBackend {
    pub fn new(pool: SqlitePool, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { pool, storage }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Records a profile for `user_id` and grants it the admin role.
    pub async fn grant_admin(&self, user_id: &str, full_name: Option<&str>, email: Option<&str>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, full_name, email)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                full_name = COALESCE(excluded.full_name, profiles.full_name),
                email = COALESCE(excluded.email, profiles.email)
            "#,
        )
        .bind(user_id)
        .bind(full_name)
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(ADMIN_ROLE)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

impl DataBackend for SqliteBackend {
    fn scoped(&self, _access_token: Option<&str>) -> Repositories {
        Repositories {
            courses: Arc::new(SqliteCourses(self.pool.clone())),
            lectures: Arc::new(SqliteLectures(self.pool.clone())),
            roles: Arc::new(SqliteRoles(self.pool.clone())),
            profiles: Arc::new(SqliteProfiles(self.pool.clone())),
            storage: self.storage.clone(),
        }
    }
}
