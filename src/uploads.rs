use std::path::{Path, PathBuf};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::{AppError, Result};

/// Allowed image extensions
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// A file written into the uploads directory.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub filename: String,
    pub url: String,
}

/// Local directory holding uploaded image blobs.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.dir, &config.url_prefix, config.max_bytes)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/{}", self.url_prefix, filename)
    }

    /// Checks size, extension and declared MIME type before anything is written.
    /// Returns the normalized extension.
    pub fn validate(&self, filename: &str, content_type: Option<&str>, data: &[u8]) -> Result<String> {
        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        if data.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large (max {} MB)",
                self.max_bytes / (1024 * 1024)
            )));
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .ok_or_else(|| AppError::BadRequest("Invalid filename".to_string()))?;

        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Invalid file type. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        if let Some(content_type) = content_type {
            if !content_type.starts_with("image/") {
                return Err(AppError::BadRequest(format!(
                    "Only image uploads are accepted, got {}",
                    content_type
                )));
            }
        }

        Ok(extension)
    }

    /// Writes `data` under a freshly generated name.
    pub async fn save(&self, extension: &str, data: &[u8]) -> Result<StoredFile> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            AppError::Internal(format!("Failed to create uploads directory: {}", e))
        })?;

        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        let file_path = self.dir.join(&filename);

        let mut file = fs::File::create(&file_path).await.map_err(|e| {
            AppError::Internal(format!("Failed to create file: {}", e))
        })?;

        file.write_all(data).await.map_err(|e| {
            AppError::Internal(format!("Failed to write file: {}", e))
        })?;
        file.flush().await?;

        Ok(StoredFile {
            url: self.url_for(&filename),
            filename,
        })
    }

    /// Removes a stored file. Returns false when it was already gone.
    pub async fn delete(&self, filename: &str) -> Result<bool> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.contains("..") {
            return Err(AppError::BadRequest(format!("Invalid stored filename: {}", filename)));
        }

        match fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Internal(format!("Failed to delete file: {}", e))),
        }
    }
}

/// SHA-256 of the bytes, hex encoded. Used as the dedup key for uploads.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UploadStore {
        UploadStore::new("uploads", "/uploads/", 16)
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_url_prefix_normalized() {
        assert_eq!(store().url_for("a.png"), "/uploads/a.png");
    }

    #[test]
    fn test_validate_accepts_images() {
        assert_eq!(store().validate("Photo.JPG", Some("image/jpeg"), b"abc").unwrap(), "jpg");
        assert_eq!(store().validate("x.webp", None, b"abc").unwrap(), "webp");
    }

    #[test]
    fn test_validate_rejects() {
        let store = store();
        assert!(matches!(
            store.validate("x.exe", None, b"abc"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            store.validate("x.png", Some("text/html"), b"abc"),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            store.validate("x.png", None, &[0u8; 17]),
            Err(AppError::PayloadTooLarge(_))
        ));
        assert!(store.validate("noext", None, b"abc").is_err());
        assert!(store.validate("x.png", None, b"").is_err());
    }
}
