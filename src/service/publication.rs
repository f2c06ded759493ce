use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::Result, repository::AnnouncementRepository};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub due: usize,
    pub published: usize,
    pub failed: usize,
}

/// Moves scheduled announcements to published once their time has come.
///
/// Runs from the periodic job and right after any write that leaves an
/// announcement scheduled. Each row is flipped with a conditional update,
/// so overlapping passes never publish the same row twice.
pub struct PublicationTracker {
    repo: Arc<dyn AnnouncementRepository>,
}

impl PublicationTracker {
    pub fn new(repo: Arc<dyn AnnouncementRepository>) -> Self {
        Self { repo }
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<PublishReport> {
        let due = self.repo.find_due_scheduled(now).await?;
        let mut report = PublishReport {
            due: due.len(),
            ..Default::default()
        };

        for id in due {
            match self.repo.publish_if_scheduled(id, now).await {
                Ok(true) => {
                    tracing::info!("Published scheduled announcement {}", id);
                    report.published += 1;
                }
                // Another pass or an edit got there first
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("Failed to publish scheduled announcement {}: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        if report.due > 0 {
            tracing::debug!(
                "Publication pass: {} due, {} published, {} failed",
                report.due,
                report.published,
                report.failed
            );
        }

        Ok(report)
    }
}
