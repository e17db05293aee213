use async_trait::async_trait;
use reqwest::Method;

use super::SupabaseClient;
use crate::error::AppError;
use crate::models::FileUpload;
use crate::storage::{Bucket, ObjectStorage, object_url};

/// Object storage of the hosted project. Both buckets are public.
pub struct SupabaseStorage {
    client: SupabaseClient,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, bucket: Bucket, key: &str, file: &FileUpload) -> Result<(), AppError> {
        let url = object_url(self.client.base_url(), &["storage", "v1", "object", bucket.as_str()], key)
            .ok_or_else(|| AppError::Config(format!("{} cannot carry object paths", self.client.base_url())))?;
        let request = self
            .client
            .request(Method::POST, url)
            .header("Content-Type", file.content_type())
            .header("x-upsert", "false")
            .body(file.data.clone());
        self.client.send_empty(request).await.map_err(|e| match e {
            AppError::Backend(msg) => AppError::Upload(msg),
            other => other,
        })
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        let base = self.client.base_url();
        match object_url(base, &["storage", "v1", "object", "public", bucket.as_str()], key) {
            Some(url) => url.into(),
            None => format!("{}storage/v1/object/public/{}/{}", base, bucket.as_str(), key),
        }
    }
}
