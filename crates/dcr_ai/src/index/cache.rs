use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use dcr_core::error::AppError;

use super::{IndexStore, LoadedIndex};

/// Cache of loaded index handles keyed by index name.
///
/// Entries expire after a TTL so a long-running process does not accumulate
/// every index it ever touched, and `invalidate` must be called after a
/// rebuild so the fresh index is never shadowed by a stale handle.
pub struct IndexCache {
    entries: Mutex<HashMap<String, CachedIndex>>,
    ttl_seconds: u64,
}

struct CachedIndex {
    index: Arc<LoadedIndex>,
    loaded_at: SystemTime,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::with_ttl(300)
    }

    pub fn with_ttl(ttl_seconds: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_seconds,
        }
    }

    /// Fetch a cached handle or deserialize it from the store. `Ok(None)`
    /// means the index does not exist on disk.
    pub fn get_or_load(
        &self,
        store: &IndexStore,
        name: &str,
    ) -> Result<Option<Arc<LoadedIndex>>, AppError> {
        if let Some(hit) = self.get(name) {
            return Ok(Some(hit));
        }
        let Some(index) = store.load(name)? else {
            return Ok(None);
        };
        let handle = Arc::new(index);
        self.entries.lock().unwrap().insert(
            name.to_string(),
            CachedIndex {
                index: handle.clone(),
                loaded_at: SystemTime::now(),
            },
        );
        Ok(Some(handle))
    }

    pub fn get(&self, name: &str) -> Option<Arc<LoadedIndex>> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(cached) = entries.get(name) {
            let age = SystemTime::now()
                .duration_since(cached.loaded_at)
                .unwrap_or(Duration::from_secs(self.ttl_seconds + 1));
            if age.as_secs() < self.ttl_seconds {
                return Some(cached.index.clone());
            }
            entries.remove(name);
        }
        None
    }

    /// Drop the handle for `name`. Called after every rebuild.
    pub fn invalidate(&self, name: &str) {
        self.entries.lock().unwrap().remove(name);
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexStatus, IndexedChunk};

    fn dummy_index(name: &str, text: &str) -> LoadedIndex {
        LoadedIndex {
            name: name.to_string(),
            status: IndexStatus {
                embed_model: "mock".to_string(),
                dims: 1,
                chunk_count: 1,
                updated_at: "2026-02-10T00:00:00Z".to_string(),
            },
            chunks: vec![IndexedChunk {
                ordinal: 0,
                text: text.to_string(),
                text_sha256: String::new(),
            }],
            vectors: vec![vec![1.0]],
        }
    }

    fn insert(cache: &IndexCache, index: LoadedIndex) {
        cache.entries.lock().unwrap().insert(
            index.name.clone(),
            CachedIndex {
                index: Arc::new(index),
                loaded_at: SystemTime::now(),
            },
        );
    }

    #[test]
    fn hit_returns_the_cached_handle() {
        let cache = IndexCache::new();
        insert(&cache, dummy_index("visit", "hello"));
        let hit = cache.get("visit").expect("hit");
        assert_eq!(hit.chunks[0].text, "hello");
    }

    #[test]
    fn invalidate_removes_the_entry() {
        let cache = IndexCache::new();
        insert(&cache, dummy_index("visit", "hello"));
        cache.invalidate("visit");
        assert!(cache.get("visit").is_none());
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = IndexCache::with_ttl(0);
        insert(&cache, dummy_index("visit", "hello"));
        assert!(cache.get("visit").is_none());
    }
}
