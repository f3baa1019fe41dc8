//! Bounded HTTP retrieval of uncached upstream resources.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use pxgate_common::{ImageType, ProxyError, Result};
use reqwest::redirect;
use tracing::{debug, warn};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const TOTAL_TIMEOUT: Duration = Duration::from_secs(60);
const REDIRECT_LIMIT: usize = 5;
const USER_AGENT: &str = concat!("pxgate/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub bytes: Bytes,
    pub content_type: ImageType,
}

/// Fetches raw upstream bytes with every suspension point bounded by a
/// timeout, enforcing the size ceiling and accepted-type policy.
pub struct OriginFetcher {
    client: reqwest::Client,
    max_image_size: u64,
}

impl OriginFetcher {
    pub fn new(max_image_size: u64) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .timeout(TOTAL_TIMEOUT)
            .redirect(redirect::Policy::limited(REDIRECT_LIMIT))
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()?;
        Ok(Self { client, max_image_size })
    }

    /// GETs `url` and returns the body with its sniffed content type.
    ///
    /// Transport failures (timeouts, DNS, resets, redirect loops) map to
    /// `UpstreamError`; a non-2xx status or an unaccepted content type
    /// maps to `InvalidImage`; exceeding the size ceiling aborts the
    /// read with `PayloadTooLarge` without buffering the remainder.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ProxyError::Upstream(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "upstream returned a non-success status");
            return Err(ProxyError::InvalidImage);
        }

        let mut body = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ProxyError::Upstream(Box::new(e)))?;
            if (buf.len() + chunk.len()) as u64 > self.max_image_size {
                warn!(%url, limit = self.max_image_size, "upstream body exceeds size ceiling");
                return Err(ProxyError::PayloadTooLarge);
            }
            buf.extend_from_slice(&chunk);
        }

        let content_type = ImageType::sniff(&buf).ok_or(ProxyError::InvalidImage)?;
        debug!(%url, size = buf.len(), ?content_type, "fetched upstream image");
        Ok(FetchResult {
            bytes: Bytes::from(buf),
            content_type,
        })
    }
}
