//! Document storage port
//!
//! Prescriptions and verification documents are stored content-addressed:
//! the file name is the SHA-256 of the bytes plus the original extension,
//! so re-uploading the same file returns the same URL.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Accepted file extensions
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "webp"];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported file extension: {0}")]
    InvalidExtension(String),
    #[error("empty file")]
    Empty,
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub filename: String,
    pub url: String,
    pub size: usize,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn store(&self, original_name: &str, data: &[u8]) -> Result<StoredDocument, DocumentError>;

    /// Read a stored file by its stored name. `None` when absent.
    async fn load(&self, filename: &str) -> Result<Option<Vec<u8>>, DocumentError>;
}

/// Lowercased extension of `name` if it is accepted
pub fn accepted_extension(name: &str) -> Result<String, DocumentError> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| DocumentError::InvalidExtension(name.to_string()))?;

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(DocumentError::InvalidExtension(ext))
    }
}

/// Content type for a stored file name
pub fn content_type(filename: &str) -> &'static str {
    match accepted_extension(filename).as_deref() {
        Ok("pdf") => "application/pdf",
        Ok("png") => "image/png",
        Ok("jpg" | "jpeg") => "image/jpeg",
        Ok("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Files on local disk, served back under `{public_base_url}/uploads/`
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalDocumentStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn store(&self, original_name: &str, data: &[u8]) -> Result<StoredDocument, DocumentError> {
        if data.is_empty() {
            return Err(DocumentError::Empty);
        }
        let ext = accepted_extension(original_name)?;

        let hash = hex::encode(Sha256::digest(data));
        let filename = format!("{hash}.{ext}");
        let path = self.dir.join(&filename);

        tokio::fs::create_dir_all(&self.dir).await?;
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(filename = %filename, "Duplicate upload, reusing stored file");
        } else {
            tokio::fs::write(&path, data).await?;
            tracing::info!(
                original_name = %original_name,
                filename = %filename,
                size = data.len(),
                "Document stored"
            );
        }

        Ok(StoredDocument {
            url: format!("{}/uploads/{}", self.public_base_url, filename),
            filename,
            size: data.len(),
        })
    }

    async fn load(&self, filename: &str) -> Result<Option<Vec<u8>>, DocumentError> {
        match tokio::fs::read(self.dir.join(filename)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
