use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::FileUpload;
use crate::storage::{Bucket, ObjectStorage};

/// Uploads form files to object storage and hands back their public URL.
#[derive(Clone)]
pub struct UploadAdapter {
    storage: Arc<dyn ObjectStorage>,
}

impl UploadAdapter {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    pub async fn upload(
        &self,
        file: &FileUpload,
        bucket: Bucket,
        folder: &str,
    ) -> Result<String, AppError> {
        let suffix = Uuid::new_v4().simple().to_string();
        let key = object_key(folder, file, Utc::now(), &suffix[..8]);

        if let Err(e) = self.storage.upload(bucket, &key, file).await {
            warn!("upload of {} to {} failed: {}", file.file_name, bucket.as_str(), e);
            return Err(match e {
                AppError::Upload(msg) | AppError::Backend(msg) => AppError::Upload(msg),
                other => AppError::Upload(other.to_string()),
            });
        }

        info!("uploaded {} to {}/{}", file.file_name, bucket.as_str(), key);
        Ok(self.storage.public_url(bucket, &key))
    }
}

/// `{folder}/{unix millis}-{suffix}.{ext}`; the extension is dropped when the
/// original name has none.
pub fn object_key(folder: &str, file: &FileUpload, now: DateTime<Utc>, suffix: &str) -> String {
    let folder = folder.trim_matches('/');
    let name = match file.extension() {
        Some(ext) => format!("{}-{}.{}", now.timestamp_millis(), suffix, ext),
        None => format!("{}-{}", now.timestamp_millis(), suffix),
    };
    if folder.is_empty() {
        name
    } else {
        format!("{}/{}", folder, name)
    }
}
