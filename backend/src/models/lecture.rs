use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Lecture {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub youtube_url: Option<String>,
    pub pdf_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub sort_order: i32,
    pub is_public: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LecturePayload {
    pub course_id: String,
    pub title: String,
    pub youtube_url: Option<String>,
    pub pdf_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub sort_order: i32,
    pub is_public: bool,
    pub updated_at: DateTime<Utc>,
}
