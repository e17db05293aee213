use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{Course, CoursePayload, FileUpload};
use crate::repository::CourseRepository;
use crate::services::form::{FilePreview, FormMode, non_empty, preview};
use crate::services::slug::{is_slug, slugify};
use crate::services::upload::UploadAdapter;
use crate::storage::Bucket;

const THUMBNAIL_FOLDER: &str = "courses";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseFields {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub thumbnail_url: String,
    pub instructor: String,
    pub is_published: bool,
}

impl From<&Course> for CourseFields {
    fn from(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            slug: course.slug.clone(),
            description: course.description.clone().unwrap_or_default(),
            thumbnail_url: course.thumbnail_url.clone().unwrap_or_default(),
            instructor: course.instructor.clone().unwrap_or_default(),
            is_published: course.is_published,
        }
    }
}

/// Create/edit form for a course.
pub struct CourseForm {
    mode: FormMode<Course>,
    fields: CourseFields,
    slug_touched: bool,
    thumbnail_file: Option<FileUpload>,
    open: bool,
}

impl CourseForm {
    pub fn open(mode: FormMode<Course>) -> Self {
        let mut form = Self {
            mode,
            fields: CourseFields::default(),
            slug_touched: false,
            thumbnail_file: None,
            open: true,
        };
        form.reset();
        form
    }

    fn reset(&mut self) {
        self.fields = match &self.mode {
            FormMode::Create => CourseFields::default(),
            FormMode::Edit(course) => CourseFields::from(course),
        };
        self.slug_touched = false;
        self.thumbnail_file = None;
    }

    /// Hides the form and discards unsaved edits. Never touches the backend.
    pub fn close(&mut self) {
        self.reset();
        self.open = false;
    }

    pub fn mode(&self) -> &FormMode<Course> {
        &self.mode
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn fields(&self) -> &CourseFields {
        &self.fields
    }

    pub fn is_dirty(&self) -> bool {
        let pristine = match &self.mode {
            FormMode::Create => CourseFields::default(),
            FormMode::Edit(course) => CourseFields::from(course),
        };
        self.thumbnail_file.is_some() || self.fields != pristine
    }

    /// New courses follow the title until the slug is edited by hand.
    pub fn set_title(&mut self, title: &str) {
        self.fields.title = title.to_string();
        if self.mode.is_create() && !self.slug_touched {
            self.fields.slug = slugify(title);
        }
    }

    pub fn set_slug(&mut self, slug: &str) {
        self.fields.slug = slug.to_string();
        self.slug_touched = true;
    }

    pub fn set_description(&mut self, description: &str) {
        self.fields.description = description.to_string();
    }

    pub fn set_thumbnail_url(&mut self, url: &str) {
        self.fields.thumbnail_url = url.to_string();
    }

    pub fn set_instructor(&mut self, instructor: &str) {
        self.fields.instructor = instructor.to_string();
    }

    pub fn set_published(&mut self, published: bool) {
        self.fields.is_published = published;
    }

    pub fn attach_thumbnail(&mut self, file: FileUpload) {
        self.thumbnail_file = Some(file);
    }

    pub fn thumbnail_preview(&self) -> Option<FilePreview> {
        preview(self.thumbnail_file.as_ref(), &self.fields.thumbnail_url)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.fields.title.trim().is_empty() {
            return Err(AppError::validation("title", "শিরোনাম আবশ্যক"));
        }
        let slug = self.fields.slug.trim();
        if slug.is_empty() {
            return Err(AppError::validation("slug", "স্লাগ আবশ্যক"));
        }
        // Rows keep whatever slug they already have; only a new or changed
        // slug has to be in generated form.
        let unchanged = self.mode.existing().is_some_and(|course| course.slug == slug);
        if !unchanged && !is_slug(slug) {
            return Err(AppError::validation(
                "slug",
                "স্লাগে শুধু ছোট হাতের ইংরেজি অক্ষর, সংখ্যা, বাংলা অক্ষর ও হাইফেন ব্যবহার করুন",
            ));
        }
        Ok(())
    }

    pub fn payload(&self) -> CoursePayload {
        self.payload_with(non_empty(&self.fields.thumbnail_url))
    }

    fn payload_with(&self, thumbnail_url: Option<String>) -> CoursePayload {
        CoursePayload {
            title: self.fields.title.trim().to_string(),
            slug: self.fields.slug.trim().to_string(),
            description: non_empty(&self.fields.description),
            thumbnail_url,
            instructor: non_empty(&self.fields.instructor),
            is_published: self.fields.is_published,
            updated_at: Utc::now(),
        }
    }

    /// Validates, uploads a pending thumbnail, then inserts or updates the
    /// row. Any failure leaves the form open with its fields intact.
    pub async fn save(
        &mut self,
        courses: &dyn CourseRepository,
        uploads: &UploadAdapter,
    ) -> Result<Course, AppError> {
        self.validate()?;

        let thumbnail_url = match &self.thumbnail_file {
            Some(file) => Some(uploads.upload(file, Bucket::Thumbnails, THUMBNAIL_FOLDER).await?),
            None => non_empty(&self.fields.thumbnail_url),
        };
        let payload = self.payload_with(thumbnail_url);

        let result = match &self.mode {
            FormMode::Create => courses.create(&payload).await,
            FormMode::Edit(course) => courses.update(&course.id, &payload).await,
        };
        let saved = result.inspect_err(|e| warn!("saving course {:?} failed: {}", payload.slug, e))?;

        info!("course {} saved ({})", saved.id, saved.slug);
        self.mode = FormMode::Edit(saved.clone());
        self.close();
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{InMemoryBackend, MemoryCourses};

    fn setup() -> (InMemoryBackend, MemoryCourses, UploadAdapter) {
        let backend = InMemoryBackend::default();
        let courses = MemoryCourses(backend.store.clone());
        let uploads = UploadAdapter::new(backend.storage.clone());
        (backend, courses, uploads)
    }

    #[test]
    fn title_drives_slug_until_slug_is_edited() {
        let mut form = CourseForm::open(FormMode::Create);
        form.set_title("কুরআন বেসিক");
        assert_eq!(form.fields().slug, "কুরআন-বেসিক");

        form.set_slug("quran-basic");
        form.set_title("কুরআন বেসিক ২");
        assert_eq!(form.fields().slug, "quran-basic");
    }

    #[test]
    fn edit_mode_never_rederives_slug() {
        let (backend, _, _) = setup();
        let course = backend.store.seed_course("Old", "old-slug", true);
        let mut form = CourseForm::open(FormMode::Edit(course));
        form.set_title("New Title");
        assert_eq!(form.fields().slug, "old-slug");
    }

    #[tokio::test]
    async fn validation_blocks_io() {
        let (backend, courses, uploads) = setup();
        let mut form = CourseForm::open(FormMode::Create);
        form.attach_thumbnail(FileUpload::new("a.png", b"x".to_vec()));

        let err = form.save(&courses, &uploads).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "title", .. }));

        form.set_title("Title");
        form.set_slug("Bad Slug");
        let err = form.save(&courses, &uploads).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "slug", .. }));

        assert!(backend.store.calls().is_empty());
        assert!(backend.storage.objects().is_empty());
        assert!(form.is_open());
    }

    #[tokio::test]
    async fn existing_foreign_slug_can_still_be_edited() {
        let (backend, courses, uploads) = setup();
        let course = backend.store.seed_course("Quran Basics", "Quran_Basics", true);
        let mut form = CourseForm::open(FormMode::Edit(course.clone()));
        form.set_description("নতুন বিবরণ");

        let saved = form.save(&courses, &uploads).await.unwrap();
        assert_eq!(saved.slug, "Quran_Basics");
        assert_eq!(saved.description.as_deref(), Some("নতুন বিবরণ"));

        let mut form = CourseForm::open(FormMode::Edit(saved));
        form.set_slug("Quran_Basics_2");
        let err = form.save(&courses, &uploads).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "slug", .. }));
    }

    #[test]
    fn closing_discards_unsaved_edits() {
        let (backend, _, _) = setup();
        let course = backend.store.seed_course("Course", "course", false);
        let mut form = CourseForm::open(FormMode::Edit(course.clone()));
        form.set_title("Changed");
        form.attach_thumbnail(FileUpload::new("a.png", b"x".to_vec()));

        form.close();

        assert!(!form.is_open());
        assert!(!form.is_dirty());
        assert_eq!(form.fields(), &CourseFields::from(&course));
    }

    #[tokio::test]
    async fn create_uses_generated_slug_and_closes() {
        let (backend, courses, uploads) = setup();
        let mut form = CourseForm::open(FormMode::Create);
        form.set_title("কুরআন বেসিক");
        form.set_description("  ");

        let saved = form.save(&courses, &uploads).await.unwrap();

        assert_eq!(saved.slug, slugify("কুরআন বেসিক"));
        assert_eq!(saved.description, None);
        assert!(!form.is_open());
        assert_eq!(form.mode(), &FormMode::Edit(saved.clone()));
        assert_eq!(backend.store.writes(), vec!["courses.insert"]);
    }

    #[tokio::test]
    async fn opening_and_closing_edit_form_issues_nothing() {
        let (backend, _, _) = setup();
        let mut course = backend.store.seed_course("সহজ সূত্রে কুরআন শিখি", "quran-shikhi", true);
        course.description = Some("বিবরণ".to_string());
        course.thumbnail_url = Some("https://cdn.example/t.jpg".to_string());

        let mut form = CourseForm::open(FormMode::Edit(course.clone()));
        assert!(!form.is_dirty());
        let payload = form.payload();
        assert_eq!(payload.title, course.title);
        assert_eq!(payload.slug, course.slug);
        assert_eq!(payload.description, course.description);
        assert_eq!(payload.thumbnail_url, course.thumbnail_url);
        assert_eq!(payload.is_published, course.is_published);

        form.close();
        assert!(!form.is_open());
        assert!(backend.store.calls().is_empty());
    }

    #[tokio::test]
    async fn thumbnail_is_uploaded_before_the_row_write() {
        let (backend, courses, uploads) = setup();
        let course = backend.store.seed_course("Course", "course", false);
        let mut form = CourseForm::open(FormMode::Edit(course));
        form.attach_thumbnail(FileUpload::new("cover.JPG", b"jpg".to_vec()));
        assert!(matches!(form.thumbnail_preview(), Some(FilePreview::Pending { .. })));

        let saved = form.save(&courses, &uploads).await.unwrap();

        let url = saved.thumbnail_url.expect("thumbnail url");
        assert!(url.starts_with("memory://thumbnails/courses/") && url.ends_with(".jpg"));
        assert_eq!(form.thumbnail_preview(), Some(FilePreview::Persisted { url }));
    }

    #[tokio::test]
    async fn failed_upload_aborts_without_row_write() {
        let (backend, courses, uploads) = setup();
        let course = backend.store.seed_course("Course", "course", false);
        let mut form = CourseForm::open(FormMode::Edit(course.clone()));
        form.attach_thumbnail(FileUpload::new("cover.png", b"png".to_vec()));
        backend.storage.fail_with("Bucket not found");

        let err = form.save(&courses, &uploads).await.unwrap_err();

        assert!(matches!(err, AppError::Upload(ref m) if m == "Bucket not found"));
        assert!(backend.store.writes().is_empty());
        assert!(form.is_open());
        assert_eq!(form.fields().thumbnail_url, "");
        assert!(matches!(form.thumbnail_preview(), Some(FilePreview::Pending { .. })));
        assert_eq!(backend.store.courses()[0], course);
    }

    #[tokio::test]
    async fn backend_error_is_kept_verbatim_and_form_stays_open() {
        let (backend, courses, uploads) = setup();
        backend.store.seed_course("Existing", "taken", true);
        let mut form = CourseForm::open(FormMode::Create);
        form.set_title("Another");
        form.set_slug("taken");

        let err = form.save(&courses, &uploads).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "duplicate key value violates unique constraint \"courses_slug_key\""
        );
        assert!(form.is_open());
        assert!(form.mode().is_create());
        assert_eq!(form.fields().slug, "taken");
    }
}
