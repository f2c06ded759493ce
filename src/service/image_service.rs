use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::Image,
    error::{AppError, Result},
    repository::ImageRepository,
    uploads::{content_hash, UploadStore},
};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct GcReport {
    pub candidates: usize,
    pub files_removed: usize,
    pub rows_removed: usize,
    pub failed: usize,
}

pub struct ImageService {
    repo: Arc<dyn ImageRepository>,
    store: UploadStore,
    retention: Duration,
}

impl ImageService {
    pub fn new(repo: Arc<dyn ImageRepository>, store: UploadStore, retention: Duration) -> Self {
        Self { repo, store, retention }
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    pub async fn list(&self) -> Result<Vec<Image>> {
        self.repo.list().await
    }

    /// Stores an uploaded image, returning the existing record instead when
    /// the same bytes were uploaded before. The flag is true for a dedup hit.
    pub async fn upload(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<(Image, bool)> {
        let extension = self.store.validate(filename, content_type, data)?;
        let hash = content_hash(data);

        if let Some(existing) = self.repo.find_by_hash(&hash).await? {
            tracing::debug!("Upload of {} matches existing image {}", filename, existing.url);
            return Ok((existing, true));
        }

        let stored = self.store.save(&extension, data).await?;
        let now = Utc::now();
        let image = Image {
            id: Uuid::new_v4(),
            hash: hash.clone(),
            filename: stored.filename.clone(),
            url: stored.url.clone(),
            reference_count: 0,
            size: data.len() as i64,
            created_at: now,
            updated_at: now,
        };

        match self.repo.create(image).await {
            Ok(image) => {
                tracing::info!("Stored image {} ({} bytes)", image.url, image.size);
                Ok((image, false))
            }
            Err(e) => {
                self.discard(&stored.filename).await;

                // A concurrent upload of the same bytes won the insert
                if matches!(e, AppError::Conflict(_)) {
                    if let Some(existing) = self.repo.find_by_hash(&hash).await? {
                        return Ok((existing, true));
                    }
                }

                Err(e)
            }
        }
    }

    /// Removes images that have had no references for longer than the
    /// retention window. The file goes first, then the row; a row is only
    /// removed while its count is still zero.
    pub async fn collect_garbage(&self, now: DateTime<Utc>) -> Result<GcReport> {
        let cutoff = now - self.retention;
        let candidates = self.repo.find_unreferenced_before(cutoff).await?;
        let mut report = GcReport {
            candidates: candidates.len(),
            ..Default::default()
        };

        for image in candidates {
            match self.store.delete(&image.filename).await {
                Ok(true) => report.files_removed += 1,
                Ok(false) => {
                    tracing::warn!("Image file {} already missing, removing record", image.filename);
                }
                Err(e) => {
                    tracing::error!("Failed to delete image file {}: {}", image.filename, e);
                    report.failed += 1;
                    continue;
                }
            }

            match self.repo.delete_if_unreferenced(image.id).await {
                Ok(true) => report.rows_removed += 1,
                Ok(false) => {
                    tracing::warn!("Image {} was referenced again during cleanup", image.url);
                }
                Err(e) => {
                    tracing::error!("Failed to delete image record {}: {}", image.id, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Image cleanup: {} candidates, {} files removed, {} records removed, {} failed",
            report.candidates,
            report.files_removed,
            report.rows_removed,
            report.failed
        );

        Ok(report)
    }

    async fn discard(&self, filename: &str) {
        if let Err(e) = self.store.delete(filename).await {
            tracing::warn!("Failed to remove orphaned upload {}: {}", filename, e);
        }
    }
}
