//! Key-value document store used by every model.
//!
//! Values are JSON documents addressed by `(namespace, key)`. Namespaces are
//! per owner (see [`ns`]) so one practitioner's documents are never read
//! under another's scope. Multi-key updates go through [`WriteBatch`] and
//! [`KvStore::commit`], which applies every operation or none.

pub mod memory;
pub mod postgres;
pub mod retry;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use retry::{RetryPolicy, RetryingStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached. Safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("corrupt document at {namespace}/{key}: {source}")]
    Corrupt {
        namespace: String,
        key: String,
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Db(sqlx::Error::PoolTimedOut) | StoreError::Db(sqlx::Error::Io(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        namespace: String,
        key: String,
        value: Value,
    },
    Delete {
        namespace: String,
        key: String,
    },
}

/// A set of writes committed atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_value(&mut self, namespace: &str, key: &str, value: Value) -> &mut Self {
        self.ops.push(WriteOp::Put {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value,
        });
        self
    }

    pub fn put<T: Serialize>(&mut self, namespace: &str, key: &str, doc: &T) -> Result<&mut Self, StoreError> {
        let value = serde_json::to_value(doc)?;
        Ok(self.put_value(namespace, key, value))
    }

    pub fn delete(&mut self, namespace: &str, key: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            namespace: namespace.to_string(),
            key: key.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }
}

/// Storage port. Any backend offering namespaced get/put plus an atomic
/// batch commit can back the portal.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, StoreError>;

    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.put_value(namespace, key, value);
        self.commit(batch).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.delete(namespace, key);
        self.commit(batch).await
    }

    /// Apply all operations of `batch` or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Read and decode a typed document.
pub async fn get_doc<T: DeserializeOwned>(
    store: &dyn KvStore,
    namespace: &str,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(namespace, key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                namespace: namespace.to_string(),
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Read a list document, treating a missing key as empty.
pub async fn get_list<T: DeserializeOwned>(
    store: &dyn KvStore,
    namespace: &str,
    key: &str,
) -> Result<Vec<T>, StoreError> {
    Ok(get_doc::<Vec<T>>(store, namespace, key).await?.unwrap_or_default())
}

/// Namespace builders. Every document lives under exactly one of these.
pub mod ns {
    pub fn practitioner(owner_id: &str) -> String {
        format!("practitioner/{owner_id}")
    }

    pub fn patient(patient_id: &str) -> String {
        format!("patient/{patient_id}")
    }

    pub fn identity(identity_id: &str) -> String {
        format!("identity/{identity_id}")
    }

    pub fn patient_link(email: &str) -> String {
        format!("patient_link/{}", email.trim().to_lowercase())
    }

    pub const EXCHANGE: &str = "exchange";
    pub const REGISTRY: &str = "registry";
    pub const AUDIT: &str = "audit";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_keeps_operation_order() {
        let mut batch = WriteBatch::new();
        batch.put_value("a", "k1", json!(1)).delete("a", "k2");
        assert_eq!(batch.len(), 2);
        assert!(matches!(batch.ops()[0], WriteOp::Put { .. }));
        assert!(matches!(batch.ops()[1], WriteOp::Delete { .. }));
    }

    #[test]
    fn patient_link_namespace_is_case_insensitive() {
        assert_eq!(ns::patient_link(" Sarah@Email.com "), ns::patient_link("sarah@email.com"));
    }

    #[test]
    fn connection_failures_are_transient() {
        assert!(StoreError::Unavailable("down".into()).is_transient());
        assert!(StoreError::Db(sqlx::Error::PoolTimedOut).is_transient());
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(StoreError::Db(sqlx::Error::Io(reset)).is_transient());
        assert!(!StoreError::Db(sqlx::Error::RowNotFound).is_transient());
    }
}
