use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::{KvStore, StoreError, WriteBatch, WriteOp};

type Key = (String, String);

/// In-process store. Used when no `DATABASE_URL` is configured and by tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<Key, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys under `namespace`, sorted.
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        let map = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = map
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let map = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        // One write guard for the whole batch: readers see all or nothing.
        let mut map = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for op in batch.ops() {
            match op {
                WriteOp::Put { namespace, key, value } => {
                    map.insert((namespace.clone(), key.clone()), value.clone());
                }
                WriteOp::Delete { namespace, key } => {
                    map.remove(&(namespace.clone(), key.clone()));
                }
            }
        }
        Ok(())
    }
}
