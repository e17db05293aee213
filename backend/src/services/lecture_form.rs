use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{FileUpload, Lecture, LecturePayload};
use crate::repository::LectureRepository;
use crate::services::form::{FilePreview, FormMode, non_empty, preview};
use crate::services::upload::UploadAdapter;
use crate::services::video_url::normalize_video_url;
use crate::storage::Bucket;

const THUMBNAIL_FOLDER: &str = "lectures";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LectureFields {
    pub course_id: String,
    pub title: String,
    pub youtube_url: String,
    pub pdf_url: String,
    pub thumbnail_url: String,
    pub sort_order: i32,
    pub is_public: bool,
}

impl From<&Lecture> for LectureFields {
    fn from(lecture: &Lecture) -> Self {
        Self {
            course_id: lecture.course_id.clone(),
            title: lecture.title.clone(),
            youtube_url: lecture.youtube_url.clone().unwrap_or_default(),
            pdf_url: lecture.pdf_url.clone().unwrap_or_default(),
            thumbnail_url: lecture.thumbnail_url.clone().unwrap_or_default(),
            sort_order: lecture.sort_order,
            is_public: lecture.is_public,
        }
    }
}

/// Create/edit form for a lecture.
pub struct LectureForm {
    mode: FormMode<Lecture>,
    default_course_id: Option<String>,
    fields: LectureFields,
    pdf_file: Option<FileUpload>,
    thumbnail_file: Option<FileUpload>,
    open: bool,
}

impl LectureForm {
    /// `default_course_id` preselects a course for new lectures, usually the
    /// first one in the admin list.
    pub fn open(mode: FormMode<Lecture>, default_course_id: Option<String>) -> Self {
        let mut form = Self {
            mode,
            default_course_id,
            fields: LectureFields::default(),
            pdf_file: None,
            thumbnail_file: None,
            open: true,
        };
        form.reset();
        form
    }

    fn pristine(&self) -> LectureFields {
        match &self.mode {
            FormMode::Create => LectureFields {
                course_id: self.default_course_id.clone().unwrap_or_default(),
                ..LectureFields::default()
            },
            FormMode::Edit(lecture) => LectureFields::from(lecture),
        }
    }

    fn reset(&mut self) {
        self.fields = self.pristine();
        self.pdf_file = None;
        self.thumbnail_file = None;
    }

    pub fn close(&mut self) {
        self.reset();
        self.open = false;
    }

    pub fn mode(&self) -> &FormMode<Lecture> {
        &self.mode
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn fields(&self) -> &LectureFields {
        &self.fields
    }

    pub fn is_dirty(&self) -> bool {
        self.pdf_file.is_some() || self.thumbnail_file.is_some() || self.fields != self.pristine()
    }

    pub fn set_course(&mut self, course_id: &str) {
        self.fields.course_id = course_id.to_string();
    }

    pub fn set_title(&mut self, title: &str) {
        self.fields.title = title.to_string();
    }

    pub fn set_youtube_url(&mut self, url: &str) {
        self.fields.youtube_url = url.to_string();
    }

    pub fn set_pdf_url(&mut self, url: &str) {
        self.fields.pdf_url = url.to_string();
    }

    pub fn set_thumbnail_url(&mut self, url: &str) {
        self.fields.thumbnail_url = url.to_string();
    }

    pub fn set_sort_order(&mut self, sort_order: i32) {
        self.fields.sort_order = sort_order;
    }

    pub fn set_public(&mut self, public: bool) {
        self.fields.is_public = public;
    }

    pub fn attach_pdf(&mut self, file: FileUpload) {
        self.pdf_file = Some(file);
    }

    pub fn attach_thumbnail(&mut self, file: FileUpload) {
        self.thumbnail_file = Some(file);
    }

    pub fn pdf_preview(&self) -> Option<FilePreview> {
        preview(self.pdf_file.as_ref(), &self.fields.pdf_url)
    }

    pub fn thumbnail_preview(&self) -> Option<FilePreview> {
        preview(self.thumbnail_file.as_ref(), &self.fields.thumbnail_url)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.fields.title.trim().is_empty() {
            return Err(AppError::validation("title", "শিরোনাম আবশ্যক"));
        }
        if self.fields.course_id.trim().is_empty() {
            return Err(AppError::validation("course_id", "কোর্স নির্বাচন আবশ্যক"));
        }
        Ok(())
    }

    pub fn payload(&self) -> LecturePayload {
        self.payload_with(non_empty(&self.fields.pdf_url), non_empty(&self.fields.thumbnail_url))
    }

    fn payload_with(&self, pdf_url: Option<String>, thumbnail_url: Option<String>) -> LecturePayload {
        LecturePayload {
            course_id: self.fields.course_id.trim().to_string(),
            title: self.fields.title.trim().to_string(),
            youtube_url: non_empty(&normalize_video_url(self.fields.youtube_url.trim())),
            pdf_url,
            thumbnail_url,
            sort_order: self.fields.sort_order,
            is_public: self.fields.is_public,
            updated_at: Utc::now(),
        }
    }

    /// Validates, uploads pending files one after the other, then writes the
    /// row. An upload failure aborts before the row write.
    pub async fn save(
        &mut self,
        lectures: &dyn LectureRepository,
        uploads: &UploadAdapter,
    ) -> Result<Lecture, AppError> {
        self.validate()?;

        let pdf_url = match &self.pdf_file {
            Some(file) => {
                let folder = self.fields.course_id.trim().to_string();
                Some(uploads.upload(file, Bucket::LecturePdfs, &folder).await?)
            }
            None => non_empty(&self.fields.pdf_url),
        };
        let thumbnail_url = match &self.thumbnail_file {
            Some(file) => Some(uploads.upload(file, Bucket::Thumbnails, THUMBNAIL_FOLDER).await?),
            None => non_empty(&self.fields.thumbnail_url),
        };
        let payload = self.payload_with(pdf_url, thumbnail_url);

        let result = match &self.mode {
            FormMode::Create => lectures.create(&payload).await,
            FormMode::Edit(lecture) => lectures.update(&lecture.id, &payload).await,
        };
        let saved = result.inspect_err(|e| warn!("saving lecture {:?} failed: {}", payload.title, e))?;

        info!("lecture {} saved in course {}", saved.id, saved.course_id);
        self.mode = FormMode::Edit(saved.clone());
        self.close();
        Ok(saved)
    }
}
