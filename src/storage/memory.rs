// In-memory record store used by tests and throwaway sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{Collection, Filter, RecordStore};
use crate::core::errors::WalletError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, WalletError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, collection: Collection, doc: Value) -> Result<(), WalletError> {
        self.collections
            .lock()
            .await
            .entry(collection)
            .or_default()
            .push(doc);
        Ok(())
    }

    async fn remove(&self, collection: Collection, filter: &Filter) -> Result<usize, WalletError> {
        let mut collections = self.collections.lock().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok(before - docs.len())
    }
}
