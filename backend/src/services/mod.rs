pub mod catalog;
pub mod course_form;
pub mod form;
pub mod lecture_form;
pub mod lists;
pub mod slug;
pub mod upload;
pub mod video_url;

pub use catalog::{Catalog, CoursePage};
pub use course_form::CourseForm;
pub use form::{FilePreview, FormMode};
pub use lecture_form::LectureForm;
pub use lists::{Confirmation, CourseList, DeleteOutcome, LectureList, UserList, Written};
pub use slug::slugify;
pub use upload::UploadAdapter;
pub use video_url::normalize_video_url;
