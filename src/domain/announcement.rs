use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::double_option;

pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 5;
pub const DEFAULT_PRIORITY: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub is_published: bool,
    pub scheduled_publish_at: Option<DateTime<Utc>>,
    pub publish_status: PublishStatus,
    pub is_pinned: bool,
    pub pinned_at: Option<DateTime<Utc>>,
    pub priority: i32,
    pub read_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Draft,
    Scheduled,
    Published,
}

impl PublishStatus {
    /// The single status consistent with a publish flag and a schedule.
    /// An explicit publish always wins over a pending schedule.
    pub fn derive(is_published: bool, scheduled_publish_at: Option<DateTime<Utc>>) -> Self {
        if is_published {
            PublishStatus::Published
        } else if scheduled_publish_at.is_some() {
            PublishStatus::Scheduled
        } else {
            PublishStatus::Draft
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Scheduled => "scheduled",
            PublishStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PublishStatus::Draft),
            "scheduled" => Some(PublishStatus::Scheduled),
            "published" => Some(PublishStatus::Published),
            _ => None,
        }
    }
}

/// Publication fields after applying a create or update payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Publication {
    pub is_published: bool,
    pub scheduled_publish_at: Option<DateTime<Utc>>,
    pub status: PublishStatus,
}

impl Publication {
    pub fn for_new(is_published: bool, scheduled_publish_at: Option<DateTime<Utc>>) -> Self {
        Self {
            is_published,
            scheduled_publish_at,
            status: PublishStatus::derive(is_published, scheduled_publish_at),
        }
    }

    /// Applies a partial update. `scheduled` distinguishes an absent field
    /// (`None`) from an explicit null (`Some(None)`).
    pub fn for_update(
        current: &Announcement,
        is_published: Option<bool>,
        scheduled: Option<Option<DateTime<Utc>>>,
    ) -> Self {
        let (is_published, scheduled_publish_at) = match (is_published, scheduled) {
            (Some(true), scheduled) => (true, scheduled.unwrap_or(current.scheduled_publish_at)),
            (Some(false), Some(scheduled)) => (false, scheduled),
            // Unpublishing without a new schedule drops back to draft
            (Some(false), None) => (false, None),
            (None, Some(Some(at))) => (false, Some(at)),
            (None, Some(None)) => (current.is_published, None),
            (None, None) => (current.is_published, current.scheduled_publish_at),
        };

        Self {
            is_published,
            scheduled_publish_at,
            status: PublishStatus::derive(is_published, scheduled_publish_at),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub scheduled_publish_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub is_published: Option<bool>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub scheduled_publish_at: Option<Option<DateTime<Utc>>>,
    pub is_pinned: Option<bool>,
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AnnouncementFilter {
    pub keyword: Option<String>,
    pub category: Option<String>,
}
