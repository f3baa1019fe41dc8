//! Blob store capability used by the proxy pipeline.
//!
//! A store is a flat key -> bytes namespace with three operations:
//! existence check, streaming read, and full overwrite. Two independent
//! instances back the service (uploaded originals and proxied/derived
//! content); anything satisfying [`BlobStore`] is substitutable.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use pxgate_common::StoreError;

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Streamed blob contents.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Key -> bytes store. Writes are full overwrites of deterministic
/// content, so concurrent writers racing on one key are tolerated.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Streaming read, for serving cached bodies without buffering.
    async fn read(&self, key: &str) -> Result<ByteStream, StoreError>;

    /// Buffered read, for blobs that feed the transform engine.
    async fn read_all(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn write(&self, key: &str, bytes: Bytes) -> Result<(), StoreError>;
}
