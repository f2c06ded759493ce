use std::sync::Arc;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::AnnouncementRepository,
    service::{
        image_refs::ImageReferenceCounter,
        publication::PublicationTracker,
        read_tracker::ReadTracker,
    },
};

pub struct AnnouncementService {
    repo: Arc<dyn AnnouncementRepository>,
    image_refs: Arc<ImageReferenceCounter>,
    tracker: Arc<PublicationTracker>,
    reads: Arc<ReadTracker>,
    // Held from reading the old content until its image references are adjusted
    edit_lock: Mutex<()>,
}

impl AnnouncementService {
    pub fn new(
        repo: Arc<dyn AnnouncementRepository>,
        image_refs: Arc<ImageReferenceCounter>,
        tracker: Arc<PublicationTracker>,
        reads: Arc<ReadTracker>,
    ) -> Self {
        Self { repo, image_refs, tracker, reads, edit_lock: Mutex::new(()) }
    }

    pub async fn list_published(&self, filter: &AnnouncementFilter) -> Result<Vec<Announcement>> {
        self.repo.list_published(filter).await
    }

    pub async fn list_all(&self) -> Result<Vec<Announcement>> {
        self.repo.list_all().await
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        self.repo.list_categories().await
    }

    /// Fetches one announcement for display and counts the read.
    ///
    /// Unpublished announcements are only visible when `include_unpublished`
    /// is set (an authenticated admin) and are never counted.
    pub async fn read(
        &self,
        id: Uuid,
        client: &str,
        include_unpublished: bool,
    ) -> Result<Announcement> {
        let mut announcement = self.repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))?;

        if !announcement.is_published {
            if include_unpublished {
                return Ok(announcement);
            }
            return Err(AppError::NotFound("Announcement not found".to_string()));
        }

        if self.reads.should_count(client, id, Utc::now()) {
            self.repo.increment_read_count(id).await?;
            announcement.read_count += 1;
        }

        Ok(announcement)
    }

    pub async fn create(&self, request: CreateAnnouncementRequest) -> Result<Announcement> {
        let missing: Vec<&str> = [
            ("title", &request.title),
            ("content", &request.content),
            ("category", &request.category),
            ("author", &request.author),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let priority = validate_priority(request.priority.unwrap_or(DEFAULT_PRIORITY))?;
        let publication = Publication::for_new(request.is_published, request.scheduled_publish_at);
        let now = Utc::now();

        let announcement = Announcement {
            id: Uuid::new_v4(),
            title: request.title.trim().to_string(),
            content: request.content,
            category: request.category.trim().to_string(),
            author: request.author.trim().to_string(),
            is_published: publication.is_published,
            scheduled_publish_at: publication.scheduled_publish_at,
            publish_status: publication.status,
            is_pinned: request.is_pinned,
            pinned_at: request.is_pinned.then_some(now),
            priority,
            read_count: 0,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(announcement).await?;
        self.image_refs.on_create(&created.content).await;

        tracing::info!("Created announcement {} ({})", created.id, created.publish_status.as_str());

        self.reconcile_if_scheduled(created).await
    }

    pub async fn update(&self, id: Uuid, request: UpdateAnnouncementRequest) -> Result<Announcement> {
        let updated = {
            let _guard = self.edit_lock.lock().await;
            self.apply_update(id, request).await?
        };

        self.reconcile_if_scheduled(updated).await
    }

    async fn apply_update(&self, id: Uuid, request: UpdateAnnouncementRequest) -> Result<Announcement> {
        let current = self.repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))?;

        let title = required_update("title", request.title, &current.title)?;
        let content = required_update("content", request.content, &current.content)?;
        let category = required_update("category", request.category, &current.category)?;
        let author = required_update("author", request.author, &current.author)?;

        let priority = match request.priority {
            Some(priority) => validate_priority(priority)?,
            None => current.priority,
        };

        let publication = Publication::for_update(
            &current,
            request.is_published,
            request.scheduled_publish_at,
        );

        let now = Utc::now();
        let (is_pinned, pinned_at) = match request.is_pinned {
            Some(true) if !current.is_pinned => (true, Some(now)),
            Some(false) => (false, None),
            _ => (current.is_pinned, current.pinned_at),
        };

        let updated = Announcement {
            id,
            title,
            content,
            category,
            author,
            is_published: publication.is_published,
            scheduled_publish_at: publication.scheduled_publish_at,
            publish_status: publication.status,
            is_pinned,
            pinned_at,
            priority,
            read_count: current.read_count,
            created_at: current.created_at,
            updated_at: now,
        };

        let updated = self.repo.update(id, &current.content, updated).await?;
        self.image_refs.on_update(&current.content, &updated.content).await;

        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let _guard = self.edit_lock.lock().await;
        let current = self.repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))?;

        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound("Announcement not found".to_string()));
        }

        self.image_refs.on_delete(&current.content).await;
        tracing::info!("Deleted announcement {}", id);

        Ok(())
    }

    // A schedule set in the past should not wait for the next periodic pass
    async fn reconcile_if_scheduled(&self, announcement: Announcement) -> Result<Announcement> {
        if announcement.publish_status != PublishStatus::Scheduled {
            return Ok(announcement);
        }

        match self.tracker.run_once(Utc::now()).await {
            Ok(report) if report.published > 0 => Ok(self
                .repo
                .find_by_id(announcement.id)
                .await?
                .unwrap_or(announcement)),
            Ok(_) => Ok(announcement),
            Err(e) => {
                tracing::warn!("Publication pass after write failed: {}", e);
                Ok(announcement)
            }
        }
    }
}

fn validate_priority(priority: i32) -> Result<i32> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(AppError::BadRequest(format!(
            "Priority must be between {} and {}",
            MIN_PRIORITY, MAX_PRIORITY
        )));
    }
    Ok(priority)
}

fn required_update(field: &str, value: Option<String>, current: &str) -> Result<String> {
    match value {
        None => Ok(current.to_string()),
        Some(value) if value.trim().is_empty() => {
            Err(AppError::BadRequest(format!("{} cannot be empty", field)))
        }
        Some(value) if field == "content" => Ok(value),
        Some(value) => Ok(value.trim().to_string()),
    }
}
