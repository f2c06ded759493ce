use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod announcement_repository;
pub mod event_repository;
pub mod image_repository;
pub mod user_repository;

pub use announcement_repository::SqliteAnnouncementRepository;
pub use event_repository::SqliteEventRepository;
pub use image_repository::SqliteImageRepository;
pub use user_repository::SqliteUserRepository;

#[async_trait]
pub trait AnnouncementRepository: Send + Sync {
    async fn create(&self, announcement: Announcement) -> Result<Announcement>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Announcement>>;
    /// Published announcements, pinned first, then priority and recency.
    async fn list_published(&self, filter: &AnnouncementFilter) -> Result<Vec<Announcement>>;
    async fn list_all(&self) -> Result<Vec<Announcement>>;
    async fn list_categories(&self) -> Result<Vec<String>>;
    /// Replaces the row only while its content still equals `expected_content`.
    /// A concurrent content change yields `Conflict`.
    async fn update(
        &self,
        id: Uuid,
        expected_content: &str,
        announcement: Announcement,
    ) -> Result<Announcement>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    /// Ids of scheduled announcements whose publish time is at or before `now`.
    async fn find_due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>>;
    /// Publishes `id` only if it is still scheduled. Returns whether a row changed.
    async fn publish_if_scheduled(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;
    async fn increment_read_count(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn create(&self, image: Image) -> Result<Image>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Image>>;
    async fn find_by_hash(&self, hash: &str) -> Result<Option<Image>>;
    async fn list(&self) -> Result<Vec<Image>>;
    /// Adds `delta` to the reference count of the image at `url`, never going
    /// below zero. Returns false when no image has that url.
    async fn adjust_reference_count(&self, url: &str, delta: i64) -> Result<bool>;
    /// Unreferenced images created before `cutoff`.
    async fn find_unreferenced_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Image>>;
    /// Deletes the row only while it is still unreferenced.
    async fn delete_if_unreferenced(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: Event) -> Result<Event>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;
    /// Events overlapping the optional `[from, to]` day range, earliest first.
    async fn list(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Vec<Event>>;
    async fn update(&self, id: Uuid, event: Event) -> Result<Event>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: CreateUserRequest) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list(&self) -> Result<Vec<User>>;
    async fn count_by_role(&self, role: UserRole) -> Result<i64>;
    /// Stores an already hashed password.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()>;
    async fn update_role(&self, id: Uuid, role: UserRole) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}
