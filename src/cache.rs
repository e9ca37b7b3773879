use moka::sync::Cache;
use std::time::Duration;

const MAX_PAGES: u64 = 10_000;

/// Rendered pages kept for a fixed time. Writes never invalidate entries, so
/// a page may lag behind the data until its TTL runs out.
pub struct PageCache {
    pages: Cache<String, String>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> PageCache {
        PageCache {
            pages: Cache::builder().max_capacity(MAX_PAGES).time_to_live(ttl).build(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.pages.get(key)
    }

    pub fn insert(&self, key: String, body: String) {
        self.pages.insert(key, body);
    }

    /// Drops every cached page.
    pub fn clear(&self) {
        self.pages.invalidate_all();
    }
}
