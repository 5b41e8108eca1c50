//! In-process storage backend.
//!
//! Signed targets point at a `memory://` URL that nothing listens on;
//! callers simulate a finished direct upload with [`MemoryStorage::put_object`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{join_url, ObjectMeta, ObjectStorage, SignedTarget, StorageError};

/// Object storage kept in a map, keyed by object key.
pub struct MemoryStorage {
    public_base_url: String,
    objects: RwLock<HashMap<String, i64>>,
}

impl MemoryStorage {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Record that an object of `size` bytes was written to `key`.
    pub fn put_object(&self, key: &str, size: i64) {
        self.objects.write().insert(key.to_string(), size);
    }

    /// Whether an object is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("http://localhost:3000/media")
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        _size: u64,
        expires_in: Duration,
    ) -> Result<SignedTarget, StorageError> {
        let expires_at = chrono::Utc::now()
            + chrono::Duration::from_std(expires_in)
                .map_err(|e| StorageError::Presign(e.to_string()))?;
        Ok(SignedTarget {
            url: format!("memory://uploads/{key}?expires={}", expires_at.timestamp()),
            headers: vec![("content-type".to_string(), content_type.to_string())],
            expires_at,
        })
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError> {
        Ok(self
            .objects
            .read()
            .get(key)
            .map(|size| ObjectMeta { size: Some(*size) }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().remove(key);
        Ok(())
    }
}
