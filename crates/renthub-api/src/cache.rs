use std::collections::HashMap;
use std::sync::Mutex;

use renthub_types::api::ListingListResponse;
use renthub_types::models::{ListingScope, SortOption};

/// A rendered list page is cached under everything that shaped it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub scope: ListingScope,
    pub viewer: Option<String>,
    pub query: String,
    pub page: i64,
    pub sort: SortOption,
}

const MAX_ENTRIES: usize = 256;

/// In-process cache of listing pages. Every listing or like mutation
/// clears it wholesale — all three scopes can be affected by one write,
/// so fine-grained invalidation buys nothing at this size.
#[derive(Default)]
pub struct ListingCache {
    entries: Mutex<HashMap<CacheKey, ListingListResponse>>,
}

impl ListingCache {
    pub fn get(&self, key: &CacheKey) -> Option<ListingListResponse> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    pub fn put(&self, key: CacheKey, value: ListingListResponse) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() >= MAX_ENTRIES {
                entries.clear();
            }
            entries.insert(key, value);
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(page: i64) -> CacheKey {
        CacheKey {
            scope: ListingScope::Public,
            viewer: None,
            query: String::new(),
            page,
            sort: SortOption::Recent,
        }
    }

    fn page() -> ListingListResponse {
        ListingListResponse {
            items: vec![],
            total: 0,
            page_count: 1,
        }
    }

    #[test]
    fn hit_after_put_miss_after_invalidate() {
        let cache = ListingCache::default();
        assert!(cache.get(&key(1)).is_none());

        cache.put(key(1), page());
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(2)).is_none());

        cache.invalidate();
        assert!(cache.get(&key(1)).is_none());
    }
}
