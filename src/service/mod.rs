pub mod admin_service;
pub mod announcement_service;
pub mod event_service;
pub mod image_refs;
pub mod image_service;
pub mod publication;
pub mod read_tracker;

use std::sync::Arc;
use chrono::Duration;
use sqlx::SqlitePool;

use crate::auth::AuthService;
use crate::config::Settings;
use crate::repository::*;
use crate::uploads::UploadStore;
use admin_service::AdminService;
use announcement_service::AnnouncementService;
use event_service::EventService;
use image_refs::ImageReferenceCounter;
use image_service::ImageService;
use publication::PublicationTracker;
use read_tracker::ReadTracker;

pub struct ServiceContext {
    pub announcement_repo: Arc<dyn AnnouncementRepository>,
    pub image_repo: Arc<dyn ImageRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub auth_service: Arc<AuthService>,
    pub admin_service: Arc<AdminService>,
    pub announcement_service: Arc<AnnouncementService>,
    pub event_service: Arc<EventService>,
    pub image_service: Arc<ImageService>,
    pub publication_tracker: Arc<PublicationTracker>,
    pub read_tracker: Arc<ReadTracker>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, settings: &Settings) -> Self {
        let announcement_repo: Arc<dyn AnnouncementRepository> =
            Arc::new(SqliteAnnouncementRepository::new(db_pool.clone()));
        let image_repo: Arc<dyn ImageRepository> =
            Arc::new(SqliteImageRepository::new(db_pool.clone()));
        let event_repo: Arc<dyn EventRepository> =
            Arc::new(SqliteEventRepository::new(db_pool.clone()));
        let user_repo: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(db_pool.clone()));

        let auth_service = Arc::new(AuthService::new(
            db_pool.clone(),
            settings.auth.session_duration_hours,
        ));

        let publication_tracker = Arc::new(PublicationTracker::new(announcement_repo.clone()));
        let read_tracker = Arc::new(ReadTracker::new(Duration::seconds(settings.reads.cooldown_secs)));
        let image_refs = Arc::new(ImageReferenceCounter::new(image_repo.clone()));

        let image_service = Arc::new(ImageService::new(
            image_repo.clone(),
            UploadStore::from_config(&settings.uploads),
            Duration::days(settings.jobs.image_retention_days),
        ));
        let announcement_service = Arc::new(AnnouncementService::new(
            announcement_repo.clone(),
            image_refs,
            publication_tracker.clone(),
            read_tracker.clone(),
        ));
        let event_service = Arc::new(EventService::new(event_repo.clone()));
        let admin_service = Arc::new(AdminService::new(user_repo.clone(), auth_service.clone()));

        Self {
            announcement_repo,
            image_repo,
            event_repo,
            user_repo,
            auth_service,
            admin_service,
            announcement_service,
            event_service,
            image_service,
            publication_tracker,
            read_tracker,
            db_pool,
        }
    }
}
