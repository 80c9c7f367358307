//! Local file selected for upload

use crate::error::{ClientError, ClientResult};
use bytes::Bytes;
use std::path::Path;

/// Extensions the analysis service accepts
pub const ALLOWED_EXTENSIONS: [&str; 1] = ["mp3"];

const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

/// A file picked by the user, held in memory until uploaded
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Bytes,
    pub content_type: String,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// Read a file from disk
    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::Validation(format!("Not a file: {}", path.display())))?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Common(e.into()))?;
        Ok(Self::new(name, bytes))
    }

    /// Check the file before any network call
    pub fn validate(&self) -> ClientResult<()> {
        if self.name.trim().is_empty() {
            return Err(ClientError::Validation("No file selected".to_string()));
        }

        let extension = Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        let allowed = extension
            .as_deref()
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if !allowed {
            return Err(ClientError::Validation(format!(
                "Unsupported file type: {} (allowed: {})",
                self.name,
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        if self.bytes.is_empty() {
            return Err(ClientError::Validation(format!("File is empty: {}", self.name)));
        }

        Ok(())
    }
}
