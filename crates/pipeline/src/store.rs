//! Storage collaborator interfaces.
//!
//! The pipeline is written against these traits; production callers bridge
//! them to their object-storage backend, tests use [`MemoryStore`].

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

/// Overwrite behavior for permanent-store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Existing objects are replaced; retried writes are safe to repeat.
    Upsert,
    /// Existing objects cause an error.
    Reject,
}

/// Errors from a storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("write failed: {0}")]
    Write(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),
}

/// Temporary chunk storage, scoped per upload session key.
#[async_trait]
pub trait TempStore: Send + Sync {
    /// Writes `data` under `key`, replacing any previous object so retried
    /// chunk writes are idempotent.
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Removes the given keys. Missing keys are not an error.
    async fn delete(&self, keys: &[String]) -> Result<(), StoreError>;
}

/// Permanent artifact storage.
#[async_trait]
pub trait PermanentStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        overwrite: OverwritePolicy,
    ) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

struct StoredObject {
    data: Vec<u8>,
    content_type: Option<String>,
}

/// In-memory object store for tests and local runs.
///
/// Implements both [`TempStore`] and [`PermanentStore`].
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content type recorded for `key`, if any.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .unwrap()
            .get(key)
            .and_then(|o| o.content_type.clone())
    }
}

#[async_trait]
impl TempStore for MemoryStore {
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.objects.write().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: None,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .read()
            .unwrap()
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut objects = self.objects.write().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }
}

#[async_trait]
impl PermanentStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        overwrite: OverwritePolicy,
    ) -> Result<(), StoreError> {
        let mut objects = self.objects.write().unwrap();
        if overwrite == OverwritePolicy::Reject && objects.contains_key(key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: Some(content_type.to_string()),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .read()
            .unwrap()
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
