use serde::Serialize;

use crate::models::FileUpload;

/// Whether a form creates a new row or edits an existing one.
#[derive(Debug, Clone, PartialEq)]
pub enum FormMode<T> {
    Create,
    Edit(T),
}

impl<T> FormMode<T> {
    pub fn is_create(&self) -> bool {
        matches!(self, FormMode::Create)
    }

    pub fn existing(&self) -> Option<&T> {
        match self {
            FormMode::Create => None,
            FormMode::Edit(entity) => Some(entity),
        }
    }
}

/// What a file field currently shows. A pending file stays provisional until
/// the row that references it has been written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilePreview {
    Pending { file_name: String },
    Persisted { url: String },
}

pub(crate) fn preview(pending: Option<&FileUpload>, persisted: &str) -> Option<FilePreview> {
    match pending {
        Some(file) => Some(FilePreview::Pending { file_name: file.file_name.clone() }),
        None if !persisted.trim().is_empty() => Some(FilePreview::Persisted { url: persisted.to_string() }),
        None => None,
    }
}

/// Trimmed value, or `None` when blank.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
