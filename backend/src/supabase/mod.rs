//! HTTP client for the hosted backend: PostgREST tables, object storage and
//! GoTrue auth share one `reqwest::Client` and the project's anon key.

pub mod auth;
pub mod dto;
pub mod rest;
pub mod storage;

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;
use url::Url;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::repository::{DataBackend, Repositories};

pub use auth::SupabaseAuth;
pub use storage::SupabaseStorage;

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self { url: url.into(), anon_key: anon_key.into() }
    }

    pub fn from_app(config: &AppConfig) -> Self {
        Self::new(config.supabase_url.clone(), config.supabase_anon_key.clone())
    }
}

/// Client bound to one caller. Requests carry the anon key as `apikey` and
/// the caller's access token (or the anon key) as bearer.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base: Arc<Url>,
    anon_key: Arc<str>,
    access_token: Option<Arc<str>>,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, AppError> {
        let base = Url::parse(&format!("{}/", config.url.trim_end_matches('/')))
            .map_err(|e| AppError::Config(format!("SUPABASE_URL is invalid: {}", e)))?;
        if base.cannot_be_a_base() {
            return Err(AppError::Config(format!("SUPABASE_URL is not a base URL: {}", base)));
        }
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base: Arc::new(base),
            anon_key: Arc::from(config.anon_key.as_str()),
            access_token: None,
        })
    }

    pub fn with_token(&self, access_token: Option<&str>) -> Self {
        Self { access_token: access_token.map(Arc::from), ..self.clone() }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base
            .join(path)
            .map_err(|e| AppError::Config(format!("invalid endpoint {}: {}", path, e)))
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&*self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &*self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> Result<(), AppError> {
        check(request.send().await?).await?;
        Ok(())
    }
}

/// Turns a non-success response into `AppError::Backend` carrying the
/// backend's own message.
async fn check(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    warn!("backend responded {}: {}", status, message);
    Err(AppError::Backend(message))
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<dto::ErrorBody>(body)
        .ok()
        .and_then(dto::ErrorBody::into_message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                format!("{}: {}", status, body.trim())
            }
        })
}

/// Data backend talking to the hosted project.
pub struct SupabaseBackend {
    client: SupabaseClient,
}

impl SupabaseBackend {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

impl DataBackend for SupabaseBackend {
    fn scoped(&self, access_token: Option<&str>) -> Repositories {
        let client = self.client.with_token(access_token);
        Repositories {
            courses: Arc::new(rest::RestCourses(client.clone())),
            lectures: Arc::new(rest::RestLectures(client.clone())),
            roles: Arc::new(rest::RestRoles(client.clone())),
            profiles: Arc::new(rest::RestProfiles(client.clone())),
            storage: Arc::new(SupabaseStorage::new(client)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_backend_fields() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            error_message(status, r#"{"code":"23505","message":"duplicate key value"}"#),
            "duplicate key value"
        );
        assert_eq!(
            error_message(status, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(status, r#"{"msg":"User already registered"}"#), "User already registered");
        assert_eq!(error_message(status, "upstream down"), "400 Bad Request: upstream down");
        assert_eq!(error_message(status, ""), "400 Bad Request");
    }

    #[test]
    fn endpoints_keep_project_path() {
        let client = SupabaseClient::new(&SupabaseConfig::new("https://abc.supabase.co/", "anon")).unwrap();
        assert_eq!(
            client.endpoint("rest/v1/courses").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/courses"
        );
    }
}
