use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    domain::Image,
    error::{AppError, Result},
    repository::ImageRepository,
};

#[derive(FromRow)]
struct ImageRow {
    id: String,
    hash: String,
    filename: String,
    url: String,
    reference_count: i64,
    size: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteImageRepository {
    pool: SqlitePool,
}

impl SqliteImageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_image(row: ImageRow) -> Result<Image> {
        Ok(Image {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            hash: row.hash,
            filename: row.filename,
            url: row.url,
            reference_count: row.reference_count,
            size: row.size,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl ImageRepository for SqliteImageRepository {
    async fn create(&self, image: Image) -> Result<Image> {
        sqlx::query(
            r#"
            INSERT INTO images (id, hash, filename, url, reference_count, size, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(image.id.to_string())
        .bind(&image.hash)
        .bind(&image.filename)
        .bind(&image.url)
        .bind(image.reference_count)
        .bind(image.size)
        .bind(image.created_at.naive_utc())
        .bind(image.updated_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Image with hash {} already exists", image.hash))
            }
            other => AppError::Database(other.to_string()),
        })?;

        self.find_by_id(image.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created image".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Image>> {
        let row = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, hash, filename, url, reference_count, size, created_at, updated_at
            FROM images
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_image).transpose()
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<Image>> {
        let row = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, hash, filename, url, reference_count, size, created_at, updated_at
            FROM images
            WHERE hash = ?
            "#
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_image).transpose()
    }

    async fn list(&self) -> Result<Vec<Image>> {
        let rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, hash, filename, url, reference_count, size, created_at, updated_at
            FROM images
            ORDER BY created_at DESC
            "#
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_image)
            .collect()
    }

    async fn adjust_reference_count(&self, url: &str, delta: i64) -> Result<bool> {
        // Single statement so concurrent edits of the same image never lose an update
        let result = sqlx::query(
            r#"
            UPDATE images
            SET reference_count = MAX(reference_count + ?, 0), updated_at = ?
            WHERE url = ?
            "#
        )
        .bind(delta)
        .bind(Utc::now().naive_utc())
        .bind(url)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_unreferenced_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Image>> {
        let rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, hash, filename, url, reference_count, size, created_at, updated_at
            FROM images
            WHERE reference_count = 0 AND created_at < ?
            ORDER BY created_at ASC
            "#
        )
        .bind(cutoff.naive_utc())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_image)
            .collect()
    }

    async fn delete_if_unreferenced(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM images WHERE id = ? AND reference_count = 0")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
