use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Uuid,
    /// SHA-256 of the file bytes, hex encoded.
    pub hash: String,
    pub filename: String,
    pub url: String,
    pub reference_count: i64,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub image: Image,
    /// True when identical bytes were already stored.
    pub deduplicated: bool,
}
