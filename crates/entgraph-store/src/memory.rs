//! In-memory entity store.
//!
//! Keeps the whole entity graph in RAM. Useful for tests and for short-lived
//! projections that replay from block zero on every start.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use entgraph_core::error::StoreError;
use entgraph_core::store::{EntityKind, EntityStore};
use serde_json::Value;

/// In-memory entity store. All data is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    entities: Mutex<HashMap<(EntityKind, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored entities across all kinds.
    pub fn entity_count(&self) -> usize {
        self.entities.lock().unwrap().len()
    }

    /// Number of stored entities of one kind.
    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.entities
            .lock()
            .unwrap()
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// All ids stored under one kind, unordered.
    pub fn ids_of(&self, kind: EntityKind) -> Vec<String> {
        self.entities
            .lock()
            .unwrap()
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.clone())
            .collect()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_raw(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .get(&(kind, id.to_string()))
            .cloned())
    }

    async fn put_raw(&self, kind: EntityKind, id: &str, value: Value) -> Result<(), StoreError> {
        self.entities
            .lock()
            .unwrap()
            .insert((kind, id.to_string()), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entgraph_core::entities::notice::UnknownNotice;
    use entgraph_core::store::EntityStoreExt;

    #[tokio::test]
    async fn get_of_absent_entity_is_none() {
        let store = MemoryStore::new();
        let loaded: Option<UnknownNotice> = store.load(UnknownNotice::ID).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let store = MemoryStore::new();
        let mut bucket = UnknownNotice::new();
        bucket.notices.push("0xabc".into());
        store.save(&bucket).await.unwrap();

        let loaded: UnknownNotice = store.load(UnknownNotice::ID).await.unwrap().unwrap();
        assert_eq!(loaded.notices, vec!["0xabc"]);
        assert_eq!(store.entity_count(), 1);
        assert_eq!(store.count_of(EntityKind::UnknownNotice), 1);
    }

    #[tokio::test]
    async fn put_replaces_whole_entity() {
        let store = MemoryStore::new();
        let mut bucket = UnknownNotice::new();
        bucket.notices.push("0xaaa".into());
        store.save(&bucket).await.unwrap();

        bucket.notices = vec!["0xbbb".into()];
        store.save(&bucket).await.unwrap();

        let loaded: UnknownNotice = store.load(UnknownNotice::ID).await.unwrap().unwrap();
        assert_eq!(loaded.notices, vec!["0xbbb"]);
        assert_eq!(store.entity_count(), 1);
    }
}
