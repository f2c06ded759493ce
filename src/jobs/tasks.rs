use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;

use crate::{
    auth::AuthService,
    error::Result,
    jobs::Job,
    service::{image_service::ImageService, publication::PublicationTracker},
};

pub struct PublishScheduledJob {
    tracker: Arc<PublicationTracker>,
}

impl PublishScheduledJob {
    pub fn new(tracker: Arc<PublicationTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl Job for PublishScheduledJob {
    fn name(&self) -> &'static str {
        "publish-scheduled"
    }

    async fn run(&self) -> Result<()> {
        self.tracker.run_once(Utc::now()).await?;
        Ok(())
    }
}

pub struct ImageCleanupJob {
    images: Arc<ImageService>,
}

impl ImageCleanupJob {
    pub fn new(images: Arc<ImageService>) -> Self {
        Self { images }
    }
}

#[async_trait]
impl Job for ImageCleanupJob {
    fn name(&self) -> &'static str {
        "image-cleanup"
    }

    async fn run(&self) -> Result<()> {
        self.images.collect_garbage(Utc::now()).await?;
        Ok(())
    }
}

pub struct SessionCleanupJob {
    auth: Arc<AuthService>,
}

impl SessionCleanupJob {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl Job for SessionCleanupJob {
    fn name(&self) -> &'static str {
        "session-cleanup"
    }

    async fn run(&self) -> Result<()> {
        let removed = self.auth.cleanup_expired_sessions().await?;
        if removed > 0 {
            tracing::info!("Removed {} expired sessions", removed);
        }
        Ok(())
    }
}
