//! The recent and saved search lists.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::{SaveSearch, StoreError, storage::Storage};

/// Key of the recent-search list.
pub const RECENT_SEARCHES_KEY: &str = "alerts-search";

/// Key of the saved-search list.
pub const SAVED_SEARCHES_KEY: &str = "alerts-saved-search";

/// How many recent searches are kept by default.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Recent and saved searches over a [`Storage`].
///
/// Recent searches form a most-recently-used list: running a search again only refreshes
/// its access time, and once the list is full the least recently accessed entry makes room.
/// Saved searches are curated by the analyst and never evicted.
///
/// Both lists are read afresh on every call, so several consoles sharing a directory see
/// each other's changes.
#[derive(Debug, Clone)]
pub struct SearchStore<S> {
    /// Where the lists live.
    storage: S,
    /// Maximum recent searches kept.
    recent_limit: usize,
}

impl<S: Storage> SearchStore<S> {
    /// Creates a store keeping at most `recent_limit` recent searches.
    pub fn new(storage: S, recent_limit: usize) -> Self {
        Self {
            storage,
            recent_limit,
        }
    }

    /// The underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Recent searches in stored order.
    pub fn list_recent(&self) -> Result<Vec<SaveSearch>, StoreError> {
        self.load(RECENT_SEARCHES_KEY)
    }

    /// Saved searches in the order they were saved.
    pub fn list_saved(&self) -> Result<Vec<SaveSearch>, StoreError> {
        self.load(SAVED_SEARCHES_KEY)
    }

    /// Looks up a saved search by name.
    pub fn find_saved(&self, name: &str) -> Result<Option<SaveSearch>, StoreError> {
        Ok(self.list_saved()?.into_iter().find(|s| s.name == name))
    }

    /// Records `search` as run at `now`.
    ///
    /// A search already in the list keeps its place and only has its access time bumped.
    /// A new search is appended, first evicting the least recently accessed entry when the
    /// list is full.
    pub fn save_as_recent(
        &mut self,
        mut search: SaveSearch,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        search.touch(now);
        let mut recent = self.list_recent()?;

        if let Some(existing) = recent.iter_mut().find(|s| s.name == search.name) {
            existing.touch(now);
        } else {
            if recent.len() >= self.recent_limit {
                recent.sort_by_key(|s| s.last_accessed);
                let excess = recent.len() + 1 - self.recent_limit.max(1);
                recent.drain(..excess);
            }
            recent.push(search);
        }

        self.store(RECENT_SEARCHES_KEY, &recent)
    }

    /// Removes a recent search by name. Returns whether one was removed.
    pub fn delete_recent(&mut self, name: &str) -> Result<bool, StoreError> {
        self.delete(RECENT_SEARCHES_KEY, name)
    }

    /// Appends a saved search.
    pub fn save_search(&mut self, search: SaveSearch) -> Result<(), StoreError> {
        let mut saved = self.list_saved()?;
        saved.push(search);
        self.store(SAVED_SEARCHES_KEY, &saved)
    }

    /// Replaces the request and access time of the saved search with the same name.
    ///
    /// Returns `false` when no saved search has that name.
    pub fn update_search(&mut self, search: &SaveSearch) -> Result<bool, StoreError> {
        let mut saved = self.list_saved()?;
        let Some(existing) = saved.iter_mut().find(|s| s.name == search.name) else {
            return Ok(false);
        };
        existing.last_accessed = search.last_accessed;
        existing.search_request = search.search_request.clone();
        self.store(SAVED_SEARCHES_KEY, &saved)?;
        Ok(true)
    }

    /// Removes a saved search by name. Returns whether one was removed.
    pub fn delete_saved(&mut self, name: &str) -> Result<bool, StoreError> {
        self.delete(SAVED_SEARCHES_KEY, name)
    }

    /// Reads a list. Unparseable contents count as an empty list.
    fn load(&self, key: &str) -> Result<Vec<SaveSearch>, StoreError> {
        let Some(contents) = self.storage.read(key)? else {
            return Ok(Vec::new());
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Option<Vec<SaveSearch>>>(&contents) {
            Ok(searches) => Ok(searches.unwrap_or_default()),
            Err(e) => {
                warn!(key, error = %e, "ignoring unreadable stored searches");
                Ok(Vec::new())
            }
        }
    }

    /// Writes a list.
    fn store(&mut self, key: &str, searches: &[SaveSearch]) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(searches)?;
        self.storage.write(key, &contents)
    }

    /// Removes every entry named `name` from a list.
    fn delete(&mut self, key: &str, name: &str) -> Result<bool, StoreError> {
        let mut searches = self.load(key)?;
        let before = searches.len();
        searches.retain(|s| s.name != name);
        let removed = searches.len() != before;
        self.store(key, &searches)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use triage_query::SearchRequest;

    use super::*;
    use crate::MemoryStorage;

    fn store() -> SearchStore<MemoryStorage> {
        SearchStore::new(MemoryStorage::new(), 3)
    }

    fn search(name: &str) -> SaveSearch {
        let request = SearchRequest {
            query: name.to_string(),
            ..SearchRequest::default()
        };
        SaveSearch::new(name, request, Vec::new())
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn names(searches: &[SaveSearch]) -> Vec<&str> {
        searches.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn empty_store_lists_nothing() {
        let store = store();
        assert!(store.list_recent().unwrap().is_empty());
        assert!(store.list_saved().unwrap().is_empty());
    }

    #[test]
    fn recent_searches_append_in_order() {
        let mut store = store();
        store.save_as_recent(search("a"), at(1)).unwrap();
        store.save_as_recent(search("b"), at(2)).unwrap();

        let recent = store.list_recent().unwrap();
        assert_eq!(names(&recent), ["a", "b"]);
        assert_eq!(recent[1].last_accessed, 2);
    }

    #[test]
    fn rerunning_a_search_only_bumps_access_time() {
        let mut store = store();
        store.save_as_recent(search("a"), at(1)).unwrap();
        store.save_as_recent(search("b"), at(2)).unwrap();

        store.save_as_recent(search("a"), at(5)).unwrap();

        let recent = store.list_recent().unwrap();
        assert_eq!(names(&recent), ["a", "b"]);
        assert_eq!(recent[0].last_accessed, 5);
    }

    #[test]
    fn full_list_evicts_least_recently_accessed() {
        let mut store = store();
        store.save_as_recent(search("a"), at(1)).unwrap();
        store.save_as_recent(search("b"), at(2)).unwrap();
        store.save_as_recent(search("c"), at(3)).unwrap();
        store.save_as_recent(search("a"), at(4)).unwrap();

        store.save_as_recent(search("d"), at(5)).unwrap();

        let recent = store.list_recent().unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(names(&recent), ["c", "a", "d"]);
    }

    #[test]
    fn lowered_limit_trims_on_next_insert() {
        let mut store = store();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            store.save_as_recent(search(name), at(i as i64)).unwrap();
        }
        let mut store = SearchStore::new(store.storage().clone(), 1);

        store.save_as_recent(search("d"), at(10)).unwrap();

        assert_eq!(names(&store.list_recent().unwrap()), ["d"]);
    }

    #[test]
    fn delete_recent_by_name() {
        let mut store = store();
        store.save_as_recent(search("a"), at(1)).unwrap();

        assert!(store.delete_recent("a").unwrap());
        assert!(!store.delete_recent("a").unwrap());
        assert!(store.list_recent().unwrap().is_empty());
    }

    #[test]
    fn saved_searches_are_uncapped() {
        let mut store = store();
        for name in ["a", "b", "c", "d", "e"] {
            store.save_search(search(name)).unwrap();
        }
        assert_eq!(store.list_saved().unwrap().len(), 5);
        assert_eq!(
            store.find_saved("c").unwrap().unwrap().search_request.query,
            "c"
        );
    }

    #[test]
    fn update_search_replaces_request_and_access_time() {
        let mut store = store();
        store.save_search(search("mine")).unwrap();

        let mut updated = search("mine");
        updated.search_request.query = "host:foo".to_string();
        updated.last_accessed = 99;
        assert!(store.update_search(&updated).unwrap());
        assert!(!store.update_search(&search("other")).unwrap());

        let saved = store.find_saved("mine").unwrap().unwrap();
        assert_eq!(saved.search_request.query, "host:foo");
        assert_eq!(saved.last_accessed, 99);
    }

    #[test]
    fn delete_saved_by_name() {
        let mut store = store();
        store.save_search(search("a")).unwrap();
        store.save_search(search("b")).unwrap();

        assert!(store.delete_saved("a").unwrap());
        assert_eq!(names(&store.list_saved().unwrap()), ["b"]);
    }

    #[test]
    fn corrupt_lists_read_as_empty() {
        let mut storage = MemoryStorage::new();
        storage.write(RECENT_SEARCHES_KEY, "{not json").unwrap();
        storage.write(SAVED_SEARCHES_KEY, "null").unwrap();
        let mut store = SearchStore::new(storage, 3);

        assert!(store.list_recent().unwrap().is_empty());
        assert!(store.list_saved().unwrap().is_empty());

        store.save_as_recent(search("a"), at(1)).unwrap();
        assert_eq!(names(&store.list_recent().unwrap()), ["a"]);
    }
}
