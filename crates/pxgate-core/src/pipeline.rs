//! The two-tier resolve-then-fetch-or-transform protocol.
//!
//! Variant store hit: stream it back. Original hit: transform without
//! touching the network. Full miss: fetch (remote) or fail (upload),
//! persist the original, transform, persist the variant. Persisted
//! content for a given key is deterministic, so concurrent requests
//! racing on one key may both write without divergence.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use pxgate_common::{ImageType, OutputFormat, ProxyError, Result, TransformOptions};
use pxgate_store::{BlobStore, ByteStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::fetch::OriginFetcher;
use crate::keys::{self, KeySource};
use crate::transform;
use crate::{options, Blacklist};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// This service's own origin, used to recognize upload URLs.
    pub service_url: Url,
    /// Byte ceiling on fetched upstream bodies.
    pub max_image_size: u64,
}

/// Which tier produced the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    /// Variant store hit.
    Resized,
    /// Original bytes passed through unchanged.
    Original,
    /// Freshly produced by the transform engine.
    Fresh,
}

pub enum ProxyBody {
    Stream(ByteStream),
    Bytes(Bytes),
}

impl std::fmt::Debug for ProxyBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyBody::Stream(_) => f.debug_tuple("Stream").finish(),
            ProxyBody::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
        }
    }
}

#[derive(Debug)]
pub struct ProxyResponse {
    pub body: ProxyBody,
    pub content_type: String,
    pub served_from: ServedFrom,
}

pub struct Pipeline {
    uploads: Arc<dyn BlobStore>,
    proxied: Arc<dyn BlobStore>,
    fetcher: OriginFetcher,
    blacklist: Blacklist,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        uploads: Arc<dyn BlobStore>,
        proxied: Arc<dyn BlobStore>,
        blacklist: Blacklist,
    ) -> reqwest::Result<Self> {
        let fetcher = OriginFetcher::new(config.max_image_size)?;
        Ok(Self { uploads, proxied, fetcher, blacklist, config })
    }

    /// Handles one proxy request end to end. `encoded` is the base58
    /// path segment; `params` the raw query mapping.
    pub async fn handle(
        &self,
        encoded: &str,
        params: &HashMap<String, String>,
    ) -> Result<ProxyResponse> {
        let url = options::decode_target(encoded)?;
        if self.blacklist.contains(&url) {
            warn!(%url, "refused blacklisted target");
            return Err(ProxyError::Blacklisted);
        }
        let opts = options::parse_options(params)?;

        let original = keys::derive_original_key(&url, &self.config.service_url);
        let variant_key = keys::derive_variant_key(&original.key, &opts);

        if self.proxied.exists(&variant_key).await? {
            info!(key = %variant_key, "variant cache hit");
            return self.serve_variant(&variant_key, &opts).await;
        }

        let (bytes, content_type) = self.resolve_original(&url, &original).await?;

        if transform::is_passthrough(content_type, &opts) {
            debug!(key = %original.key, "passthrough, serving original bytes");
            return Ok(ProxyResponse {
                content_type: content_type.mime_type().to_string(),
                body: ProxyBody::Bytes(bytes),
                served_from: ServedFrom::Original,
            });
        }

        let (produced, produced_type) = {
            let bytes = bytes.clone();
            tokio::task::spawn_blocking(move || transform::transform(&bytes, content_type, &opts))
                .await
                .map_err(|e| ProxyError::Internal(format!("transform task failed: {e}")))??
        };

        let produced = Bytes::from(produced);
        // The write completes before we respond, so an identical request
        // that follows observes the variant tier.
        self.proxied.write(&variant_key, produced.clone()).await?;
        info!(key = %variant_key, size = produced.len(), "stored new variant");

        Ok(ProxyResponse {
            content_type: produced_type.mime_type().to_string(),
            body: ProxyBody::Bytes(produced),
            served_from: ServedFrom::Fresh,
        })
    }

    /// Returns the original bytes, reading the owning store first and
    /// falling back to an upstream fetch for remote sources. Freshly
    /// fetched originals are persisted before the transform runs, so
    /// other variants of the same source skip the refetch.
    async fn resolve_original(
        &self,
        url: &Url,
        original: &keys::OriginalKey,
    ) -> Result<(Bytes, ImageType)> {
        let store = match original.source {
            KeySource::Upload => &self.uploads,
            KeySource::Remote => &self.proxied,
        };

        if store.exists(&original.key).await? {
            debug!(key = %original.key, "original cache hit");
            let bytes = Bytes::from(store.read_all(&original.key).await?);
            let content_type = ImageType::sniff(&bytes).ok_or(ProxyError::InvalidImage)?;
            return Ok((bytes, content_type));
        }

        match original.source {
            KeySource::Upload => Err(ProxyError::UploadNotFound),
            KeySource::Remote => {
                let fetched = self.fetcher.fetch(url).await?;
                self.proxied.write(&original.key, fetched.bytes.clone()).await?;
                info!(key = %original.key, size = fetched.bytes.len(), "stored fetched original");
                Ok((fetched.bytes, fetched.content_type))
            }
        }
    }

    /// Streams a cached variant. A forced output format fixes the
    /// content type; `Match` variants are sniffed from the first chunk
    /// and the chunk is stitched back onto the stream.
    async fn serve_variant(&self, key: &str, opts: &TransformOptions) -> Result<ProxyResponse> {
        let mut stream = self.proxied.read(key).await?;

        let (content_type, body) = match opts.format {
            OutputFormat::Jpeg => (ImageType::Jpeg.mime_type(), ProxyBody::Stream(stream)),
            OutputFormat::Png => (ImageType::Png.mime_type(), ProxyBody::Stream(stream)),
            OutputFormat::Webp => (ImageType::Webp.mime_type(), ProxyBody::Stream(stream)),
            OutputFormat::Match => match stream.next().await.transpose().map_err(|e| {
                ProxyError::Store(pxgate_common::StoreError::Io(e))
            })? {
                None => ("application/octet-stream", ProxyBody::Stream(stream)),
                Some(first) => {
                    let sniffed = ImageType::sniff(&first)
                        .map(ImageType::mime_type)
                        .unwrap_or("application/octet-stream");
                    let rejoined = futures::stream::once(async move { Ok(first) })
                        .chain(stream)
                        .boxed();
                    (sniffed, ProxyBody::Stream(rejoined))
                }
            },
        };

        Ok(ProxyResponse {
            content_type: content_type.to_string(),
            body,
            served_from: ServedFrom::Resized,
        })
    }
}
