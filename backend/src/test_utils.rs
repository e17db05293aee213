//! In-memory stand-ins for the hosted backend, used by unit and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::provider::{AuthProvider, SignUpOutcome};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::{
    ADMIN_ROLE, Course, CoursePayload, FileUpload, Lecture, LecturePayload, Profile, Session,
    SessionUser, UserRole,
};
use crate::repository::{
    CourseRepository, DataBackend, LectureRepository, ProfileRepository, Repositories,
    RoleRepository,
};
use crate::state::AppState;
use crate::storage::{Bucket, ObjectStorage};

#[derive(Default)]
struct StoreState {
    courses: Vec<Course>,
    lectures: Vec<Lecture>,
    roles: Vec<UserRole>,
    profiles: Vec<Profile>,
    calls: Vec<String>,
    fail_requests: Option<String>,
    fail_writes: Option<String>,
    fail_lists: Option<String>,
}

/// Tables held in memory. Every repository call is recorded in order.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

const WRITE_OPS: [&str; 4] = ["insert", "update", "delete", "visibility"];

impl InMemoryStore {
    fn with<T>(&self, call: &str, f: impl FnOnce(&mut StoreState) -> Result<T, AppError>) -> Result<T, AppError> {
        let mut state = self.state.lock().expect("store lock");
        state.calls.push(call.to_string());
        if let Some(msg) = state.fail_requests.clone() {
            return Err(AppError::Backend(msg));
        }
        if call.ends_with(".list") {
            if let Some(msg) = state.fail_lists.clone() {
                return Err(AppError::Backend(msg));
            }
        }
        let is_write = WRITE_OPS.iter().any(|op| call.ends_with(op));
        if is_write {
            if let Some(msg) = state.fail_writes.clone() {
                return Err(AppError::Backend(msg));
            }
        }
        f(&mut state)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().expect("store lock").calls.clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| WRITE_OPS.iter().any(|op| c.ends_with(op)))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().expect("store lock").calls.clear();
    }

    pub fn fail_requests(&self, message: &str) {
        self.state.lock().expect("store lock").fail_requests = Some(message.to_string());
    }

    pub fn fail_writes(&self, message: &str) {
        self.state.lock().expect("store lock").fail_writes = Some(message.to_string());
    }

    /// Fails every `list` call while leaving other reads and writes alone.
    pub fn fail_lists(&self, message: &str) {
        self.state.lock().expect("store lock").fail_lists = Some(message.to_string());
    }

    pub fn heal(&self) {
        let mut state = self.state.lock().expect("store lock");
        state.fail_requests = None;
        state.fail_writes = None;
        state.fail_lists = None;
    }

    pub fn courses(&self) -> Vec<Course> {
        self.state.lock().expect("store lock").courses.clone()
    }

    pub fn lectures(&self) -> Vec<Lecture> {
        self.state.lock().expect("store lock").lectures.clone()
    }

    pub fn grant_admin(&self, user_id: &str) {
        self.state.lock().expect("store lock").roles.push(UserRole {
            user_id: user_id.to_string(),
            role: ADMIN_ROLE.to_string(),
        });
    }

    pub fn add_profile(&self, id: &str, full_name: &str, email: &str) {
        self.state.lock().expect("store lock").profiles.push(Profile {
            id: id.to_string(),
            full_name: Some(full_name.to_string()),
            email: Some(email.to_string()),
        });
    }

    pub fn seed_course(&self, title: &str, slug: &str, published: bool) -> Course {
        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: None,
            thumbnail_url: None,
            instructor: None,
            is_published: published,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().expect("store lock").courses.push(course.clone());
        course
    }

    pub fn seed_lecture(&self, course_id: &str, title: &str, sort_order: i32, public: bool) -> Lecture {
        let lecture = Lecture {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            title: title.to_string(),
            youtube_url: Some(format!("https://www.youtube.com/embed/{}", sort_order)),
            pdf_url: None,
            thumbnail_url: None,
            sort_order,
            is_public: public,
            updated_at: Utc::now(),
        };
        self.state.lock().expect("store lock").lectures.push(lecture.clone());
        lecture
    }
}

fn course_from_payload(id: String, payload: &CoursePayload, created_at: chrono::DateTime<Utc>) -> Course {
    Course {
        id,
        title: payload.title.clone(),
        slug: payload.slug.clone(),
        description: payload.description.clone(),
        thumbnail_url: payload.thumbnail_url.clone(),
        instructor: payload.instructor.clone(),
        is_published: payload.is_published,
        created_at,
        updated_at: payload.updated_at,
    }
}

fn lecture_from_payload(id: String, payload: &LecturePayload) -> Lecture {
    Lecture {
        id,
        course_id: payload.course_id.clone(),
        title: payload.title.clone(),
        youtube_url: payload.youtube_url.clone(),
        pdf_url: payload.pdf_url.clone(),
        thumbnail_url: payload.thumbnail_url.clone(),
        sort_order: payload.sort_order,
        is_public: payload.is_public,
        updated_at: payload.updated_at,
    }
}

fn duplicate_slug(state: &StoreState, slug: &str, except: Option<&str>) -> Result<(), AppError> {
    if state.courses.iter().any(|c| c.slug == slug && Some(c.id.as_str()) != except) {
        return Err(AppError::Backend(
            "duplicate key value violates unique constraint \"courses_slug_key\"".to_string(),
        ));
    }
    Ok(())
}

pub struct MemoryCourses(pub Arc<InMemoryStore>);
pub struct MemoryLectures(pub Arc<InMemoryStore>);
pub struct MemoryRoles(pub Arc<InMemoryStore>);
pub struct MemoryProfiles(pub Arc<InMemoryStore>);

#[async_trait]
impl CourseRepository for MemoryCourses {
    async fn list(&self) -> Result<Vec<Course>, AppError> {
        self.0.with("courses.list", |s| {
            let mut courses = s.courses.clone();
            courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(courses)
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Course>, AppError> {
        self.0.with("courses.get", |s| Ok(s.courses.iter().find(|c| c.id == id).cloned()))
    }

    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Course>, AppError> {
        self.0.with("courses.by_slug", |s| {
            Ok(s.courses.iter().find(|c| c.slug == slug && c.is_published).cloned())
        })
    }

    async fn create(&self, payload: &CoursePayload) -> Result<Course, AppError> {
        self.0.with("courses.insert", |s| {
            duplicate_slug(s, &payload.slug, None)?;
            let course = course_from_payload(Uuid::new_v4().to_string(), payload, Utc::now());
            s.courses.push(course.clone());
            Ok(course)
        })
    }

    async fn update(&self, id: &str, payload: &CoursePayload) -> Result<Course, AppError> {
        self.0.with("courses.update", |s| {
            duplicate_slug(s, &payload.slug, Some(id))?;
            let existing = s.courses.iter_mut().find(|c| c.id == id).ok_or(AppError::NotFound)?;
            *existing = course_from_payload(id.to_string(), payload, existing.created_at);
            Ok(existing.clone())
        })
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.0.with("courses.delete", |s| {
            s.courses.retain(|c| c.id != id);
            s.lectures.retain(|l| l.course_id != id);
            Ok(())
        })
    }

    async fn set_visibility(&self, id: &str, published: bool) -> Result<(), AppError> {
        self.0.with("courses.visibility", |s| {
            let course = s.courses.iter_mut().find(|c| c.id == id).ok_or(AppError::NotFound)?;
            course.is_published = published;
            course.updated_at = Utc::now();
            Ok(())
        })
    }
}

#[async_trait]
impl LectureRepository for MemoryLectures {
    async fn list(&self, course_id: Option<&str>) -> Result<Vec<Lecture>, AppError> {
        self.0.with("lectures.list", |s| {
            let mut lectures: Vec<Lecture> = s
                .lectures
                .iter()
                .filter(|l| course_id.is_none_or(|id| l.course_id == id))
                .cloned()
                .collect();
            lectures.sort_by_key(|l| l.sort_order);
            Ok(lectures)
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Lecture>, AppError> {
        self.0.with("lectures.get", |s| Ok(s.lectures.iter().find(|l| l.id == id).cloned()))
    }

    async fn create(&self, payload: &LecturePayload) -> Result<Lecture, AppError> {
        self.0.with("lectures.insert", |s| {
            if !s.courses.iter().any(|c| c.id == payload.course_id) {
                return Err(AppError::Backend(
                    "insert or update on table \"lectures\" violates foreign key constraint".to_string(),
                ));
            }
            let lecture = lecture_from_payload(Uuid::new_v4().to_string(), payload);
            s.lectures.push(lecture.clone());
            Ok(lecture)
        })
    }

    async fn update(&self, id: &str, payload: &LecturePayload) -> Result<Lecture, AppError> {
        self.0.with("lectures.update", |s| {
            let existing = s.lectures.iter_mut().find(|l| l.id == id).ok_or(AppError::NotFound)?;
            *existing = lecture_from_payload(id.to_string(), payload);
            Ok(existing.clone())
        })
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.0.with("lectures.delete", |s| {
            s.lectures.retain(|l| l.id != id);
            Ok(())
        })
    }

    async fn set_visibility(&self, id: &str, public: bool) -> Result<(), AppError> {
        self.0.with("lectures.visibility", |s| {
            let lecture = s.lectures.iter_mut().find(|l| l.id == id).ok_or(AppError::NotFound)?;
            lecture.is_public = public;
            lecture.updated_at = Utc::now();
            Ok(())
        })
    }
}

#[async_trait]
impl RoleRepository for MemoryRoles {
    async fn is_admin(&self, user_id: &str) -> Result<bool, AppError> {
        self.0.with("roles.is_admin", |s| {
            Ok(s.roles.iter().any(|r| r.user_id == user_id && r.role == ADMIN_ROLE))
        })
    }

    async fn admin_ids(&self) -> Result<Vec<String>, AppError> {
        self.0.with("roles.admin_ids", |s| {
            Ok(s.roles.iter().filter(|r| r.role == ADMIN_ROLE).map(|r| r.user_id.clone()).collect())
        })
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfiles {
    async fn list(&self) -> Result<Vec<Profile>, AppError> {
        self.0.with("profiles.list", |s| {
            let mut profiles = s.profiles.clone();
            profiles.sort_by(|a, b| (&a.full_name, &a.id).cmp(&(&b.full_name, &b.id)));
            Ok(profiles)
        })
    }
}

/// Object storage that keeps only the keys it was given.
#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<Vec<(String, String)>>,
    failure: Mutex<Option<String>>,
}

impl InMemoryStorage {
    pub fn objects(&self) -> Vec<(String, String)> {
        self.objects.lock().expect("storage lock").clone()
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().expect("storage lock") = Some(message.to_string());
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn upload(&self, bucket: Bucket, key: &str, _file: &FileUpload) -> Result<(), AppError> {
        if let Some(msg) = self.failure.lock().expect("storage lock").clone() {
            return Err(AppError::Upload(msg));
        }
        self.objects
            .lock()
            .expect("storage lock")
            .push((bucket.as_str().to_string(), key.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("memory://{}/{}", bucket.as_str(), key)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBackend {
    pub store: Arc<InMemoryStore>,
    pub storage: Arc<InMemoryStorage>,
}

impl InMemoryBackend {
    pub fn repositories(&self) -> Repositories {
        self.scoped(None)
    }
}

impl DataBackend for InMemoryBackend {
    fn scoped(&self, _access_token: Option<&str>) -> Repositories {
        Repositories {
            courses: Arc::new(MemoryCourses(self.store.clone())),
            lectures: Arc::new(MemoryLectures(self.store.clone())),
            roles: Arc::new(MemoryRoles(self.store.clone())),
            profiles: Arc::new(MemoryProfiles(self.store.clone())),
            storage: self.storage.clone(),
        }
    }
}

#[derive(Default)]
struct AuthTables {
    users: HashMap<String, (String, SessionUser)>,
    access: HashMap<String, String>,
    refresh: HashMap<String, String>,
    recovery: HashMap<String, String>,
    calls: Vec<String>,
}

/// Auth provider backed by a user table in memory.
#[derive(Default)]
pub struct FakeAuthProvider {
    tables: Mutex<AuthTables>,
    counter: AtomicU64,
    require_confirmation: AtomicBool,
}

impl FakeAuthProvider {
    pub fn add_user(&self, id: &str, email: &str, password: &str, display_name: &str) {
        let user = SessionUser {
            id: id.to_string(),
            email: Some(email.to_string()),
            display_name: Some(display_name.to_string()),
        };
        self.tables
            .lock()
            .expect("auth lock")
            .users
            .insert(email.to_string(), (password.to_string(), user));
    }

    pub fn require_confirmation(&self) {
        self.require_confirmation.store(true, Ordering::SeqCst);
    }

    pub fn issue_recovery(&self, email: &str) -> String {
        let token = format!("recovery-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.tables
            .lock()
            .expect("auth lock")
            .recovery
            .insert(token.clone(), email.to_string());
        token
    }

    pub fn password_of(&self, email: &str) -> Option<String> {
        self.tables.lock().expect("auth lock").users.get(email).map(|(p, _)| p.clone())
    }

    pub fn calls(&self) -> Vec<String> {
        self.tables.lock().expect("auth lock").calls.clone()
    }

    fn issue_session(&self, tables: &mut AuthTables, user: SessionUser) -> Session {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let access_token = format!("access-{}-{}", user.id, n);
        let refresh_token = format!("refresh-{}-{}", user.id, n);
        tables.access.insert(access_token.clone(), user.id.clone());
        tables.refresh.insert(refresh_token.clone(), user.id.clone());
        Session {
            access_token,
            refresh_token: Some(refresh_token),
            expires_at: Some(Utc::now() + Duration::hours(1)),
            user,
        }
    }

    fn user_by_id(tables: &AuthTables, id: &str) -> Option<SessionUser> {
        tables.users.values().find(|(_, u)| u.id == id).map(|(_, u)| u.clone())
    }
}

fn rejected(message: &str) -> AppError {
    AppError::Backend(message.to_string())
}

#[async_trait]
impl AuthProvider for FakeAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let mut tables = self.tables.lock().expect("auth lock");
        tables.calls.push("sign_in".to_string());
        let user = match tables.users.get(email) {
            Some((stored, user)) if stored == password => user.clone(),
            _ => return Err(rejected("Invalid login credentials")),
        };
        Ok(self.issue_session(&mut tables, user))
    }

    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<SignUpOutcome, AppError> {
        let mut tables = self.tables.lock().expect("auth lock");
        tables.calls.push("sign_up".to_string());
        if tables.users.contains_key(email) {
            return Err(rejected("User already registered"));
        }
        let user = SessionUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            display_name: Some(display_name.to_string()),
        };
        tables.users.insert(email.to_string(), (password.to_string(), user.clone()));
        if self.require_confirmation.load(Ordering::SeqCst) {
            return Ok(SignUpOutcome::ConfirmationSent(user));
        }
        Ok(SignUpOutcome::SignedIn(self.issue_session(&mut tables, user)))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let mut tables = self.tables.lock().expect("auth lock");
        tables.calls.push("sign_out".to_string());
        tables.access.remove(access_token);
        Ok(())
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), AppError> {
        let mut tables = self.tables.lock().expect("auth lock");
        tables.calls.push(format!("recover:{}:{}", email, redirect_to));
        Ok(())
    }

    async fn verify_recovery(&self, token_hash: &str) -> Result<Session, AppError> {
        let mut tables = self.tables.lock().expect("auth lock");
        tables.calls.push("verify".to_string());
        let email = tables
            .recovery
            .remove(token_hash)
            .ok_or_else(|| rejected("Email link is invalid or has expired"))?;
        let user = tables.users.get(&email).map(|(_, u)| u.clone()).ok_or_else(|| rejected("User not found"))?;
        Ok(self.issue_session(&mut tables, user))
    }

    async fn update_password(&self, access_token: &str, password: &str) -> Result<SessionUser, AppError> {
        let mut tables = self.tables.lock().expect("auth lock");
        tables.calls.push("update_password".to_string());
        let id = tables.access.get(access_token).cloned().ok_or_else(|| rejected("invalid JWT"))?;
        let entry = tables
            .users
            .values_mut()
            .find(|(_, u)| u.id == id)
            .ok_or_else(|| rejected("User not found"))?;
        entry.0 = password.to_string();
        Ok(entry.1.clone())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AppError> {
        let mut tables = self.tables.lock().expect("auth lock");
        tables.calls.push("refresh".to_string());
        let id = tables
            .refresh
            .remove(refresh_token)
            .ok_or_else(|| rejected("Invalid Refresh Token"))?;
        let user = Self::user_by_id(&tables, &id).ok_or_else(|| rejected("User not found"))?;
        Ok(self.issue_session(&mut tables, user))
    }

    async fn get_user(&self, access_token: &str) -> Result<SessionUser, AppError> {
        let mut tables = self.tables.lock().expect("auth lock");
        tables.calls.push("get_user".to_string());
        let id = tables.access.get(access_token).cloned().ok_or_else(|| rejected("invalid JWT"))?;
        Self::user_by_id(&tables, &id).ok_or_else(|| rejected("User not found"))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        supabase_url: "http://supabase.test".to_string(),
        supabase_anon_key: "anon".to_string(),
        site_url: "http://localhost:3000".to_string(),
        bind_addr: "127.0.0.1:0".parse().expect("socket addr"),
        data_backend: crate::config::DataBackendKind::Supabase,
        database_url: "sqlite::memory:".to_string(),
        storage_dir: std::env::temp_dir().join("muslimsdeen-test-storage"),
        max_upload_bytes: 1024 * 1024,
    }
}

/// Application state wired to in-memory fakes.
pub fn test_state(backend: &InMemoryBackend, auth: Arc<FakeAuthProvider>) -> AppState {
    AppState::new(test_config(), Arc::new(backend.clone()), auth)
}
