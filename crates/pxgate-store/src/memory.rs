//! In-memory blob store, used in tests and single-process deployments.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::StreamExt;
use pxgate_common::StoreError;

use crate::{BlobStore, ByteStream};

#[derive(Default)]
pub struct MemoryStore {
    blobs: DashMap<String, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.blobs.contains_key(key))
    }

    async fn read(&self, key: &str) -> Result<ByteStream, StoreError> {
        let bytes = self
            .blobs
            .get(key)
            .map(|e| e.value().clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(futures::stream::once(async move { Ok(bytes) }).boxed())
    }

    async fn read_all(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .get(key)
            .map(|e| e.value().to_vec())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, bytes: Bytes) -> Result<(), StoreError> {
        self.blobs.insert(key.to_string(), bytes);
        Ok(())
    }
}
