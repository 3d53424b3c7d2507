use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::domain::DocumentField;

/// File received from the multipart form but not yet written to disk.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub field: DocumentField,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{} exceeds the {max} byte upload limit ({size} bytes)", .field.label())]
    TooLarge {
        field: DocumentField,
        size: u64,
        max: u64,
    },
    #[error("{} must be an image or PDF (received {content_type})", .field.label())]
    UnsupportedType {
        field: DocumentField,
        content_type: String,
    },
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes uploaded supporting documents into the upload directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: u64,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Persist one upload as `<field>-<millis>-<random><ext>` and return its path.
    pub fn store(&self, upload: &PendingUpload) -> Result<PathBuf, UploadError> {
        let size = upload.bytes.len() as u64;
        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                field: upload.field,
                size,
                max: self.max_bytes,
            });
        }

        let content_type = resolve_content_type(upload);
        if !is_accepted_type(&content_type) {
            return Err(UploadError::UnsupportedType {
                field: upload.field,
                content_type,
            });
        }

        fs::create_dir_all(&self.root)?;
        let random = Uuid::new_v4().as_u128() % 1_000_000_000;
        let file_name = format!(
            "{}-{}-{random}{}",
            upload.field.form_name(),
            Utc::now().timestamp_millis(),
            extension_of(upload.file_name.as_deref())
        );
        let path = self.root.join(file_name);
        fs::write(&path, &upload.bytes)?;
        debug!(field = upload.field.form_name(), path = %path.display(), size, "stored upload");
        Ok(path)
    }

    /// Best-effort removal of uploads that belong to a rejected submission.
    pub fn discard<'a>(&self, paths: impl IntoIterator<Item = &'a PathBuf>) {
        for path in paths {
            if let Err(err) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %err, "could not remove orphaned upload");
            }
        }
    }
}

fn resolve_content_type(upload: &PendingUpload) -> String {
    upload
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != mime::APPLICATION_OCTET_STREAM.essence_str())
        .map(str::to_ascii_lowercase)
        .or_else(|| {
            upload
                .file_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|guess| guess.essence_str().to_string())
        })
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
}

fn is_accepted_type(content_type: &str) -> bool {
    content_type.starts_with("image/") || content_type == mime::APPLICATION_PDF.essence_str()
}

fn extension_of(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
