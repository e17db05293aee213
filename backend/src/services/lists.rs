//! Admin list tabs. Every mutation is followed by a re-fetch; the cached rows
//! only ever reflect what the backend returned. A failed re-fetch does not
//! undo a write that went through: it is reported next to the written value.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{Course, Lecture, UserSummary};
use crate::repository::{CourseRepository, LectureRepository, ProfileRepository, RoleRepository};
use crate::services::course_form::CourseForm;
use crate::services::lecture_form::LectureForm;
use crate::services::upload::UploadAdapter;

/// Answer to the "are you sure?" prompt before a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed { Confirmation::Confirmed } else { Confirmation::Declined }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

/// A write the backend accepted. `stale` holds the error of the re-fetch that
/// followed it, in which case the cached rows predate the write.
#[derive(Debug)]
pub struct Written<T> {
    pub value: T,
    pub stale: Option<AppError>,
}

impl<T> Written<T> {
    fn after(value: T, refreshed: Result<(), AppError>) -> Self {
        let stale = refreshed
            .inspect_err(|e| warn!("re-fetch after write failed: {}", e))
            .err();
        Self { value, stale }
    }
}

pub struct CourseList {
    repo: Arc<dyn CourseRepository>,
    items: Vec<Course>,
}

impl CourseList {
    /// An empty list that has not fetched yet.
    pub fn new(repo: Arc<dyn CourseRepository>) -> Self {
        Self { repo, items: Vec::new() }
    }

    pub async fn load(repo: Arc<dyn CourseRepository>) -> Result<Self, AppError> {
        let mut list = Self::new(repo);
        list.refresh().await?;
        Ok(list)
    }

    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.items = self.repo.list().await?;
        Ok(())
    }

    pub fn items(&self) -> &[Course] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Course> {
        self.items
    }

    /// Saves the form and re-fetches on success.
    pub async fn save(&mut self, form: &mut CourseForm, uploads: &UploadAdapter) -> Result<Written<Course>, AppError> {
        let saved = form.save(self.repo.as_ref(), uploads).await?;
        Ok(Written::after(saved, self.refresh().await))
    }

    /// A declined delete issues no call and does not re-fetch.
    pub async fn delete(&mut self, id: &str, confirmation: Confirmation) -> Result<Written<DeleteOutcome>, AppError> {
        if confirmation == Confirmation::Declined {
            return Ok(Written { value: DeleteOutcome::Cancelled, stale: None });
        }
        self.repo
            .delete(id)
            .await
            .inspect_err(|e| warn!("deleting course {} failed: {}", id, e))?;
        info!("course {} deleted", id);
        Ok(Written::after(DeleteOutcome::Deleted, self.refresh().await))
    }

    pub async fn set_published(&mut self, id: &str, published: bool) -> Result<Written<()>, AppError> {
        self.repo.set_visibility(id, published).await?;
        info!("course {} published={}", id, published);
        Ok(Written::after((), self.refresh().await))
    }
}

pub struct LectureList {
    repo: Arc<dyn LectureRepository>,
    course_id: Option<String>,
    items: Vec<Lecture>,
}

impl LectureList {
    pub fn new(repo: Arc<dyn LectureRepository>, course_id: Option<String>) -> Self {
        Self { repo, course_id, items: Vec::new() }
    }

    pub async fn load(repo: Arc<dyn LectureRepository>, course_id: Option<String>) -> Result<Self, AppError> {
        let mut list = Self::new(repo, course_id);
        list.refresh().await?;
        Ok(list)
    }

    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.items = self.repo.list(self.course_id.as_deref()).await?;
        Ok(())
    }

    pub fn items(&self) -> &[Lecture] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Lecture> {
        self.items
    }

    pub async fn save(&mut self, form: &mut LectureForm, uploads: &UploadAdapter) -> Result<Written<Lecture>, AppError> {
        let saved = form.save(self.repo.as_ref(), uploads).await?;
        Ok(Written::after(saved, self.refresh().await))
    }

    pub async fn delete(&mut self, id: &str, confirmation: Confirmation) -> Result<Written<DeleteOutcome>, AppError> {
        if confirmation == Confirmation::Declined {
            return Ok(Written { value: DeleteOutcome::Cancelled, stale: None });
        }
        self.repo
            .delete(id)
            .await
            .inspect_err(|e| warn!("deleting lecture {} failed: {}", id, e))?;
        info!("lecture {} deleted", id);
        Ok(Written::after(DeleteOutcome::Deleted, self.refresh().await))
    }

    pub async fn set_public(&mut self, id: &str, public: bool) -> Result<Written<()>, AppError> {
        self.repo.set_visibility(id, public).await?;
        info!("lecture {} public={}", id, public);
        Ok(Written::after((), self.refresh().await))
    }
}

/// Users tab: profiles with their admin flag.
pub struct UserList {
    items: Vec<UserSummary>,
}

impl UserList {
    pub async fn load(profiles: &dyn ProfileRepository, roles: &dyn RoleRepository) -> Result<Self, AppError> {
        let admins: HashSet<String> = roles.admin_ids().await?.into_iter().collect();
        let items = profiles
            .list()
            .await?
            .into_iter()
            .map(|p| UserSummary {
                is_admin: admins.contains(&p.id),
                id: p.id,
                name: p.full_name,
                email: p.email,
            })
            .collect();
        Ok(Self { items })
    }

    pub fn items(&self) -> &[UserSummary] {
        &self.items
    }

    pub fn into_items(self) -> Vec<UserSummary> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::form::FormMode;
    use crate::test_utils::{InMemoryBackend, MemoryProfiles, MemoryRoles};

    #[tokio::test]
    async fn declined_delete_keeps_row() {
        let backend = InMemoryBackend::default();
        let course = backend.store.seed_course("Course", "course", true);
        let mut list = CourseList::load(backend.repositories().courses).await.unwrap();

        let outcome = list.delete(&course.id, Confirmation::Declined).await.unwrap();

        assert_eq!(outcome.value, DeleteOutcome::Cancelled);
        list.refresh().await.unwrap();
        assert_eq!(list.items().len(), 1);
        assert!(backend.store.writes().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_keeps_rows() {
        let backend = InMemoryBackend::default();
        let course = backend.store.seed_course("Course", "course", true);
        let mut list = CourseList::load(backend.repositories().courses).await.unwrap();
        backend.store.fail_writes("permission denied for table courses");

        let err = list.delete(&course.id, Confirmation::Confirmed).await.unwrap_err();

        assert_eq!(err.to_string(), "permission denied for table courses");
        assert_eq!(list.items(), &[course]);
    }

    #[tokio::test]
    async fn confirmed_delete_refetches() {
        let backend = InMemoryBackend::default();
        let course = backend.store.seed_course("Course", "course", true);
        backend.store.seed_course("Other", "other", true);
        let mut list = CourseList::load(backend.repositories().courses).await.unwrap();

        list.delete(&course.id, Confirmation::from(true)).await.unwrap();

        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].slug, "other");
        assert_eq!(
            backend.store.calls(),
            vec!["courses.list", "courses.delete", "courses.list"]
        );
    }

    #[tokio::test]
    async fn visibility_toggle_is_not_optimistic() {
        let backend = InMemoryBackend::default();
        let course = backend.store.seed_course("Course", "course", false);
        let mut list = CourseList::load(backend.repositories().courses).await.unwrap();
        backend.store.fail_writes("JWT expired");

        assert!(list.set_published(&course.id, true).await.is_err());
        assert!(!list.items()[0].is_published);

        backend.store.heal();
        list.set_published(&course.id, true).await.unwrap();
        assert!(list.items()[0].is_published);
    }

    #[tokio::test]
    async fn saved_course_appears_after_refetch() {
        let backend = InMemoryBackend::default();
        let repos = backend.repositories();
        let uploads = UploadAdapter::new(repos.storage.clone());
        let mut list = CourseList::load(repos.courses).await.unwrap();
        let mut form = CourseForm::open(FormMode::Create);
        form.set_title("কুরআন বেসিক");

        let saved = list.save(&mut form, &uploads).await.unwrap();

        assert!(saved.stale.is_none());
        assert!(list.items().iter().any(|c| c.id == saved.value.id && c.slug == "কুরআন-বেসিক"));
    }

    #[tokio::test]
    async fn failed_refetch_does_not_fail_the_save() {
        let backend = InMemoryBackend::default();
        let course = backend.store.seed_course("Course", "course", true);
        let repos = backend.repositories();
        let uploads = UploadAdapter::new(repos.storage.clone());
        let mut list = LectureList::new(repos.lectures, Some(course.id.clone()));
        backend.store.fail_lists("list timeout");
        let mut form = LectureForm::open(FormMode::Create, Some(course.id.clone()));
        form.set_title("লেকচার ১");

        let written = list.save(&mut form, &uploads).await.unwrap();

        assert!(matches!(written.stale, Some(AppError::Backend(ref m)) if m == "list timeout"));
        assert_eq!(backend.store.lectures(), vec![written.value.clone()]);
        assert!(!form.is_open());
        assert!(list.items().is_empty());

        let deleted = list.delete(&written.value.id, Confirmation::Confirmed).await.unwrap();
        assert_eq!(deleted.value, DeleteOutcome::Deleted);
        assert!(deleted.stale.is_some());
        assert!(backend.store.lectures().is_empty());
    }

    #[tokio::test]
    async fn lectures_are_listed_in_sort_order_per_course() {
        let backend = InMemoryBackend::default();
        let a = backend.store.seed_course("A", "a", true);
        let b = backend.store.seed_course("B", "b", true);
        backend.store.seed_lecture(&a.id, "third", 3, true);
        backend.store.seed_lecture(&a.id, "first", 1, true);
        backend.store.seed_lecture(&b.id, "other", 2, true);

        let mut list = LectureList::load(backend.repositories().lectures, Some(a.id.clone()))
            .await
            .unwrap();
        let titles: Vec<_> = list.items().iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "third"]);

        let first = list.items()[0].id.clone();
        assert_eq!(list.delete(&first, Confirmation::Declined).await.unwrap().value, DeleteOutcome::Cancelled);
        list.set_public(&first, false).await.unwrap();
        assert!(!list.items()[0].is_public);
    }

    #[tokio::test]
    async fn users_carry_admin_flag() {
        let backend = InMemoryBackend::default();
        backend.store.add_profile("u1", "আবদুল্লাহ", "abdullah@example.com");
        backend.store.add_profile("u2", "ফাতিমা", "fatima@example.com");
        backend.store.grant_admin("u2");

        let list = UserList::load(
            &MemoryProfiles(backend.store.clone()),
            &MemoryRoles(backend.store.clone()),
        )
        .await
        .unwrap();

        let flags: Vec<_> = list.items().iter().map(|u| (u.id.as_str(), u.is_admin)).collect();
        assert_eq!(flags, vec![("u1", false), ("u2", true)]);
    }
}
