//! Resolved-permission cache.
//!
//! # Purpose
//! Memoizes flattened permission sets per caller role set so repeated checks
//! within the TTL skip the store walk.
//!
//! # Key invariants
//! - Keys are the sorted, deduplicated role names joined by `,`, so
//!   `["b","a","a"]` and `["a","b"]` share an entry.
//! - Invalidation clears every entry and bumps a generation counter. An
//!   insert carrying an older generation is dropped, so a resolution that
//!   raced with a role mutation can never repopulate stale data.
//! - The cache is only a latency aid; a miss always recomputes from the store.
//! - A zero TTL disables caching entirely.
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

struct CacheEntry {
    permissions: Vec<String>,
    inserted_at: Instant,
}

pub struct PermissionCache {
    ttl: Duration,
    generation: AtomicU64,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            generation: AtomicU64::new(0),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn cache_key<S: AsRef<str>>(role_names: &[S]) -> String {
        let mut names: Vec<&str> = role_names.iter().map(AsRef::as_ref).collect();
        names.sort_unstable();
        names.dedup();
        names.join(",")
    }

    /// Generation to pass back into [`PermissionCache::insert`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Fresh entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        if !self.is_enabled() {
            return None;
        }
        let hit = match self.entries.read() {
            Ok(entries) => entries
                .get(key)
                .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
                .map(|entry| entry.permissions.clone()),
            Err(_) => None,
        };
        if hit.is_some() {
            metrics::counter!("kanban_permission_cache_hits_total").increment(1);
            tracing::debug!(key, "permission cache hit");
        } else {
            metrics::counter!("kanban_permission_cache_misses_total").increment(1);
            tracing::debug!(key, "permission cache miss");
        }
        hit
    }

    /// Store `permissions` unless the cache was invalidated after
    /// `generation` was read.
    pub fn insert(&self, key: String, permissions: Vec<String>, generation: u64) {
        if !self.is_enabled() {
            return;
        }
        if let Ok(mut entries) = self.entries.write() {
            // Checked under the write lock: invalidate_all bumps first, then clears.
            if self.generation.load(Ordering::Acquire) != generation {
                tracing::debug!(key, "dropping permission set computed before invalidation");
                return;
            }
            entries.insert(
                key,
                CacheEntry {
                    permissions,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        metrics::counter!("kanban_permission_cache_invalidations_total").increment(1);
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn key_is_order_and_duplicate_insensitive() {
        assert_eq!(
            PermissionCache::cache_key(&["b", "a", "a"]),
            PermissionCache::cache_key(&["a", "b"])
        );
        assert_eq!(PermissionCache::cache_key::<&str>(&[]), "");
    }

    #[test]
    fn insert_then_get() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        let generation = cache.generation();
        cache.insert("a".to_string(), perms(&["boards.list"]), generation);
        assert_eq!(cache.get("a"), Some(perms(&["boards.list"])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn stale_generation_is_not_written_back() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        let generation = cache.generation();
        cache.invalidate_all();
        cache.insert("a".to_string(), perms(&["boards.list"]), generation);
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_clears_entries() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), perms(&["x.y"]), cache.generation());
        cache.invalidate_all();
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn disabled_cache_never_stores() {
        let cache = PermissionCache::disabled();
        cache.insert("a".to_string(), perms(&["x.y"]), cache.generation());
        assert!(cache.get("a").is_none());
        assert!(!cache.is_enabled());
    }

    #[test]
    fn expired_entries_miss() {
        let cache = PermissionCache::new(Duration::from_millis(1));
        cache.insert("a".to_string(), perms(&["x.y"]), cache.generation());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("a").is_none());
    }
}
