use bytes::Bytes;

/// File received from a multipart form, held in memory until saved.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self { file_name: file_name.into(), content_type: None, data: data.into() }
    }

    pub fn content_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| mime_guess::from_path(&self.file_name).first_or_octet_stream().to_string())
    }

    /// Lower-cased extension of the original file name. Names whose
    /// extension is not plain ASCII letters and digits have none.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}
