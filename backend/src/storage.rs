use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use url::Url;

use crate::error::AppError;
use crate::models::FileUpload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Thumbnails,
    LecturePdfs,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Thumbnails => "thumbnails",
            Bucket::LecturePdfs => "lecture-pdfs",
        }
    }
}

/// `base` followed by `prefix` and the `/`-separated parts of `key`, each
/// percent-encoded as one path segment.
pub fn object_url(base: &Url, prefix: &[&str], key: &str) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(prefix.iter().copied().chain(key.split('/')));
    Some(url)
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bucket: Bucket, key: &str, file: &FileUpload) -> Result<(), AppError>;
    fn public_url(&self, bucket: Bucket, key: &str) -> String;
}

/// Stores objects under a local directory, served at `/storage/...`.
pub struct LocalStorage {
    root: PathBuf,
    base_url: Option<Url>,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, site_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: Url::parse(&format!("{}/storage", site_url.trim_end_matches('/'))).ok(),
        }
    }

    fn object_path(&self, bucket: Bucket, key: &str) -> Result<PathBuf, AppError> {
        let key_path = Path::new(key);
        if key_path.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(AppError::Upload(format!("invalid object key: {}", key)));
        }
        Ok(self.root.join(bucket.as_str()).join(key_path))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, bucket: Bucket, key: &str, file: &FileUpload) -> Result<(), AppError> {
        let path = self.object_path(bucket, key)?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AppError::Upload("The resource already exists".to_string()));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Upload(e.to_string()))?;
        }
        tokio::fs::write(&path, &file.data)
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;
        tracing::debug!("stored {} bytes at {}", file.data.len(), path.display());
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        match self.base_url.as_ref().and_then(|base| object_url(base, &[bucket.as_str()], key)) {
            Some(url) => url.into(),
            None => {
                tracing::warn!("SITE_URL cannot carry object paths, serving {} relative", key);
                format!("/storage/{}/{}", bucket.as_str(), key)
            }
        }
    }
}
