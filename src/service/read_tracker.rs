use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::cache::TtlCache;

/// Decides whether a read of an announcement should bump its read count.
///
/// Repeat reads from the same client address within the cooldown are not
/// counted. State is per process and resets on restart; client addresses
/// are spoofable, so this only smooths accidental double counts.
pub struct ReadTracker {
    recent: TtlCache<(String, Uuid)>,
}

impl ReadTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            recent: TtlCache::new(cooldown),
        }
    }

    /// Records the read and returns true if it falls outside the cooldown.
    pub fn should_count(&self, client: &str, announcement_id: Uuid, now: DateTime<Utc>) -> bool {
        self.recent
            .insert_if_absent((client.to_string(), announcement_id), now)
    }
}
