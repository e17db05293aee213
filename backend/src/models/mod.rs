pub mod course;
pub mod lecture;
pub mod notice;
pub mod upload;
pub mod user;

pub use course::{Course, CourseCard, CoursePayload};
pub use lecture::{Lecture, LecturePayload};
pub use notice::{ActionResponse, Notice, NoticeLevel};
pub use upload::FileUpload;
pub use user::{ADMIN_ROLE, Profile, Session, SessionUser, UserRole, UserSummary};
