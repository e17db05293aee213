use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub instructor: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert/update body for the `courses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursePayload {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub instructor: Option<String>,
    pub is_published: bool,
    pub updated_at: DateTime<Utc>,
}

/// Published course as shown in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct CourseCard {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub instructor: Option<String>,
    pub lecture_count: usize,
}

impl CourseCard {
    pub fn new(course: &Course, lecture_count: usize) -> Self {
        Self {
            title: course.title.clone(),
            slug: course.slug.clone(),
            description: course.description.clone(),
            thumbnail_url: course.thumbnail_url.clone(),
            instructor: course.instructor.clone(),
            lecture_count,
        }
    }
}
