use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::warn;

use crate::error::AppError;

pub const PLACEHOLDER_SUPABASE_URL: &str = "https://placeholder.supabase.co";
pub const PLACEHOLDER_ANON_KEY: &str = "placeholder-anon-key";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataBackendKind {
    Supabase,
    Sqlite,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub site_url: String,
    pub bind_addr: SocketAddr,
    pub data_backend: DataBackendKind,
    pub database_url: String,
    pub storage_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Reads the environment. Missing backend credentials are not fatal: the
    /// server starts with placeholders and every backend call fails.
    pub fn new_from_env() -> Result<Self, AppError> {
        let supabase_url = env::var("SUPABASE_URL").unwrap_or_else(|_| {
            warn!("SUPABASE_URL is not set; using a placeholder, backend calls will fail");
            PLACEHOLDER_SUPABASE_URL.to_string()
        });
        let supabase_anon_key = env::var("SUPABASE_ANON_KEY").unwrap_or_else(|_| {
            warn!("SUPABASE_ANON_KEY is not set; using a placeholder, backend calls will fail");
            PLACEHOLDER_ANON_KEY.to_string()
        });

        let site_url = env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is invalid: {}", e)))?;

        let data_backend = match env::var("DATA_BACKEND").as_deref() {
            Err(_) | Ok("supabase") => DataBackendKind::Supabase,
            Ok("sqlite") => DataBackendKind::Sqlite,
            Ok(other) => {
                return Err(AppError::Config(format!(
                    "DATA_BACKEND must be `supabase` or `sqlite`, got `{}`",
                    other
                )));
            }
        };

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://muslimsdeen.db?mode=rwc".to_string());

        let storage_dir = env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(v) => v
                .parse()
                .map_err(|e| AppError::Config(format!("MAX_UPLOAD_BYTES is invalid: {}", e)))?,
            Err(_) => 50 * 1024 * 1024,
        };

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            site_url: site_url.trim_end_matches('/').to_string(),
            bind_addr,
            data_backend,
            database_url,
            storage_dir,
            max_upload_bytes,
        })
    }

    pub fn is_placeholder(&self) -> bool {
        self.supabase_url == PLACEHOLDER_SUPABASE_URL || self.supabase_anon_key == PLACEHOLDER_ANON_KEY
    }

    pub fn secure_cookies(&self) -> bool {
        self.site_url.starts_with("https://")
    }

    pub fn reset_password_redirect(&self) -> String {
        format!("{}/reset-password", self.site_url)
    }
}
