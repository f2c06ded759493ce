use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// In-process cache of recently seen keys; an entry expires `ttl` after it was stored.
///
/// Expired entries are swept on every write, so memory stays bounded by the
/// number of keys touched within one TTL. The clock is passed in by the
/// caller, which keeps behavior deterministic under test.
#[derive(Debug)]
pub struct TtlCache<K> {
    entries: Mutex<HashMap<K, DateTime<Utc>>>,
    ttl: Duration,
}

impl<K> TtlCache<K>
where
    K: Eq + Hash,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Stores `key` unless a fresh entry already exists for it.
    /// Returns true when the key was stored. Check and store happen under
    /// one lock, so two concurrent callers cannot both win.
    pub fn insert_if_absent(&self, key: K, now: DateTime<Utc>) -> bool {
        let mut entries = self.lock();
        Self::evict_expired_locked(&mut entries, now, self.ttl);

        if entries.contains_key(&key) {
            return false;
        }

        entries.insert(key, now);
        true
    }

    fn evict_expired_locked(
        entries: &mut HashMap<K, DateTime<Utc>>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) {
        entries.retain(|_, stored_at| now - *stored_at < ttl);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, DateTime<Utc>>> {
        // A poisoned map only ever holds timestamps, so keep using it
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_if_absent() {
        let cache: TtlCache<&str> = TtlCache::new(Duration::seconds(10));
        let t0 = Utc::now();

        assert!(cache.insert_if_absent("a", t0));
        assert!(!cache.insert_if_absent("a", t0 + Duration::seconds(5)));
        assert!(!cache.insert_if_absent("a", t0 + Duration::seconds(9)));
        assert!(cache.insert_if_absent("a", t0 + Duration::seconds(10)));
    }

    #[test]
    fn test_writes_sweep_stale_entries() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::seconds(10));
        let t0 = Utc::now();

        for key in 0..5 {
            assert!(cache.insert_if_absent(key, t0));
        }
        assert_eq!(cache.lock().len(), 5);

        assert!(cache.insert_if_absent(99, t0 + Duration::seconds(11)));
        assert_eq!(cache.lock().len(), 1);
    }
}
