use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::models::{ImageRecord, Orientation};

/// How long a cached upstream image stays servable
pub const IMAGE_CACHE_TTL_SECONDS: i64 = 60;

struct CacheSlot {
    record: ImageRecord,
    expires_at: DateTime<Utc>,
}

/// One live slot per orientation holding the most recent upstream
/// image. Entries are immutable and overwritten wholesale, so
/// last-writer-wins between racing requests is fine.
pub struct ImageCache {
    slots: RwLock<HashMap<Orientation, CacheSlot>>,
    ttl: Duration,
}

impl ImageCache {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub fn get(&self, orientation: Orientation) -> Option<ImageRecord> {
        self.get_at(orientation, Utc::now())
    }

    pub fn put(&self, orientation: Orientation, record: ImageRecord) {
        self.put_at(orientation, record, Utc::now())
    }

    /// A read exactly at the expiry instant already counts as a miss
    pub fn get_at(&self, orientation: Orientation, now: DateTime<Utc>) -> Option<ImageRecord> {
        let slots = self.slots.read();
        slots
            .get(&orientation)
            .filter(|slot| now < slot.expires_at)
            .map(|slot| slot.record.clone())
    }

    pub fn put_at(&self, orientation: Orientation, record: ImageRecord, now: DateTime<Utc>) {
        let mut slots = self.slots.write();
        slots.insert(
            orientation,
            CacheSlot {
                record,
                expires_at: now + self.ttl,
            },
        );
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(IMAGE_CACHE_TTL_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> ImageRecord {
        ImageRecord {
            url: url.to_owned(),
            author_name: "Someone".to_owned(),
            author_profile_url: "https://unsplash.com/@someone".to_owned(),
            retrieved_at: Utc::now(),
        }
    }

    #[test]
    fn reads_within_ttl_return_the_same_record() {
        let cache = ImageCache::new(60);
        let now = Utc::now();
        cache.put_at(Orientation::Landscape, record("a"), now);

        let first = cache.get_at(Orientation::Landscape, now + Duration::seconds(10));
        let second = cache.get_at(Orientation::Landscape, now + Duration::seconds(59));
        assert_eq!(first, second);
        assert_eq!(first.unwrap().url, "a");
    }

    #[test]
    fn entries_expire_exactly_at_the_ttl_boundary() {
        let cache = ImageCache::new(60);
        let now = Utc::now();
        cache.put_at(Orientation::Portrait, record("a"), now);

        assert!(cache
            .get_at(Orientation::Portrait, now + Duration::seconds(60))
            .is_none());
        assert!(cache
            .get_at(Orientation::Portrait, now + Duration::seconds(61))
            .is_none());
    }

    #[test]
    fn orientations_do_not_share_slots() {
        let cache = ImageCache::new(60);
        let now = Utc::now();
        cache.put_at(Orientation::Landscape, record("wide"), now);

        assert!(cache.get_at(Orientation::Portrait, now).is_none());
        assert!(cache.get_at(Orientation::Squarish, now).is_none());
    }

    #[test]
    fn a_new_fetch_overwrites_the_slot() {
        let cache = ImageCache::new(60);
        let now = Utc::now();
        cache.put_at(Orientation::Squarish, record("old"), now);
        cache.put_at(Orientation::Squarish, record("new"), now + Duration::seconds(5));

        let slot = cache.get_at(Orientation::Squarish, now + Duration::seconds(6));
        assert_eq!(slot.unwrap().url, "new");
    }
}
