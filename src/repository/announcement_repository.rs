use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow, QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::{
    domain::{Announcement, AnnouncementFilter, PublishStatus},
    error::{AppError, Result},
    repository::AnnouncementRepository,
};

const SELECT_COLUMNS: &str = r#"
    SELECT id, title, content, category, author, is_published, scheduled_publish_at,
           publish_status, is_pinned, pinned_at, priority, read_count, created_at, updated_at
    FROM announcements
"#;

const LISTING_ORDER: &str = " ORDER BY is_pinned DESC, priority DESC, created_at DESC";

/// Makes `%`, `_` and `\` in user input match literally under `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(FromRow)]
struct AnnouncementRow {
    id: String,
    title: String,
    content: String,
    category: String,
    author: String,
    is_published: i32,
    scheduled_publish_at: Option<NaiveDateTime>,
    publish_status: String,
    is_pinned: i32,
    pinned_at: Option<NaiveDateTime>,
    priority: i32,
    read_count: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteAnnouncementRepository {
    pool: SqlitePool,
}

impl SqliteAnnouncementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_announcement(row: AnnouncementRow) -> Result<Announcement> {
        let publish_status = PublishStatus::parse(&row.publish_status).ok_or_else(|| {
            AppError::Database(format!("Invalid publish status: {}", row.publish_status))
        })?;

        Ok(Announcement {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            title: row.title,
            content: row.content,
            category: row.category,
            author: row.author,
            is_published: row.is_published != 0,
            scheduled_publish_at: row.scheduled_publish_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            publish_status,
            is_pinned: row.is_pinned != 0,
            pinned_at: row.pinned_at.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            priority: row.priority,
            read_count: row.read_count,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl AnnouncementRepository for SqliteAnnouncementRepository {
    async fn create(&self, announcement: Announcement) -> Result<Announcement> {
        let id_str = announcement.id.to_string();
        let is_published_int = if announcement.is_published { 1i32 } else { 0i32 };
        let is_pinned_int = if announcement.is_pinned { 1i32 } else { 0i32 };

        sqlx::query(
            r#"
            INSERT INTO announcements (
                id, title, content, category, author, is_published, scheduled_publish_at,
                publish_status, is_pinned, pinned_at, priority, read_count, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&id_str)
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(&announcement.category)
        .bind(&announcement.author)
        .bind(is_published_int)
        .bind(announcement.scheduled_publish_at.map(|dt| dt.naive_utc()))
        .bind(announcement.publish_status.as_str())
        .bind(is_pinned_int)
        .bind(announcement.pinned_at.map(|dt| dt.naive_utc()))
        .bind(announcement.priority)
        .bind(announcement.read_count)
        .bind(announcement.created_at.naive_utc())
        .bind(announcement.updated_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(announcement.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created announcement".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Announcement>> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_announcement(r)?)),
            None => Ok(None)
        }
    }

    async fn list_published(&self, filter: &AnnouncementFilter) -> Result<Vec<Announcement>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        query.push(" WHERE is_published = 1");

        if let Some(keyword) = filter.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            let pattern = format!("%{}%", escape_like(keyword));
            query
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR content LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            query.push(" AND category = ").push_bind(category.to_string());
        }

        query.push(LISTING_ORDER);

        let rows = query
            .build_query_as::<AnnouncementRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_announcement)
            .collect()
    }

    async fn list_all(&self) -> Result<Vec<Announcement>> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(&format!("{}{}", SELECT_COLUMNS, LISTING_ORDER))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_announcement)
            .collect()
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM announcements WHERE is_published = 1 ORDER BY category"
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(categories)
    }

    async fn update(
        &self,
        id: Uuid,
        expected_content: &str,
        announcement: Announcement,
    ) -> Result<Announcement> {
        let id_str = id.to_string();
        let is_published_int = if announcement.is_published { 1i32 } else { 0i32 };
        let is_pinned_int = if announcement.is_pinned { 1i32 } else { 0i32 };

        let result = sqlx::query(
            r#"
            UPDATE announcements
            SET title = ?, content = ?, category = ?, author = ?,
                is_published = ?, scheduled_publish_at = ?, publish_status = ?,
                is_pinned = ?, pinned_at = ?, priority = ?, updated_at = ?
            WHERE id = ? AND content = ?
            "#
        )
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(&announcement.category)
        .bind(&announcement.author)
        .bind(is_published_int)
        .bind(announcement.scheduled_publish_at.map(|dt| dt.naive_utc()))
        .bind(announcement.publish_status.as_str())
        .bind(is_pinned_int)
        .bind(announcement.pinned_at.map(|dt| dt.naive_utc()))
        .bind(announcement.priority)
        .bind(announcement.updated_at.naive_utc())
        .bind(&id_str)
        .bind(expected_content)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(id).await? {
                Some(_) => Err(AppError::Conflict(
                    "Announcement was modified by another request".to_string(),
                )),
                None => Err(AppError::NotFound("Announcement not found".to_string())),
            };
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated announcement".to_string())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT id FROM announcements
            WHERE publish_status = 'scheduled' AND scheduled_publish_at <= ?
            ORDER BY scheduled_publish_at ASC
            "#
        )
        .bind(now.naive_utc())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        ids.iter()
            .map(|id| Uuid::parse_str(id).map_err(|e| AppError::Database(e.to_string())))
            .collect()
    }

    async fn publish_if_scheduled(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE announcements
            SET is_published = 1, publish_status = 'published', updated_at = ?
            WHERE id = ? AND publish_status = 'scheduled'
            "#
        )
        .bind(now.naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_read_count(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE announcements SET read_count = read_count + 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
