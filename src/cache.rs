//! Explicitly owned TTL caches keyed by content fingerprints. Stores are
//! constructed once and passed by handle; nothing here is process-global.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Bounded in-memory cache with per-entry TTL. Entries are written at most
/// once per key per TTL window; an expired entry reads as a miss and the
/// caller re-fetches rather than seeing stale data.
pub struct TtlCache<V> {
    inner: Mutex<LruCache<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).expect("max(1) is non-zero");
        Self {
            inner: Mutex::new(LruCache::new(cap)),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.inner.lock().expect("cache lock poisoned");
        match guard.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                guard.pop(key);
                None
            }
            None => None,
        }
    }

    /// Insert unless a live entry already exists for this key.
    pub fn put(&self, key: &str, value: V) {
        let mut guard = self.inner.lock().expect("cache lock poisoned");
        let live = guard
            .peek(key)
            .is_some_and(|e| e.expires_at > Instant::now());
        if live {
            return;
        }
        guard.put(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stable hex fingerprint of arbitrary key material.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\x1f");
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache: TtlCache<u32> = TtlCache::new(8, Duration::from_secs(60));
        cache.put("a", 1);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn test_expired_entry_reads_as_miss() {
        let cache: TtlCache<u32> = TtlCache::new(8, Duration::from_millis(0));
        cache.put("a", 1);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_write_once_per_ttl_window() {
        let cache: TtlCache<u32> = TtlCache::new(8, Duration::from_secs(60));
        cache.put("a", 1);
        cache.put("a", 2);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn test_fingerprint_is_stable_and_order_sensitive() {
        assert_eq!(fingerprint(&["x", "y"]), fingerprint(&["x", "y"]));
        assert_ne!(fingerprint(&["x", "y"]), fingerprint(&["y", "x"]));
        assert_ne!(fingerprint(&["xy"]), fingerprint(&["x", "y"]));
    }
}
