//! Storage-key derivation.
//!
//! These strings address the long-term caches, so their exact shape is a
//! compatibility contract: changing it orphans every blob written by a
//! previous deployment.

use pxgate_common::{OutputFormat, ScalingMode, TransformOptions};
use sha1::{Digest, Sha1};
use url::Url;

/// Prefix tagging URL-sourced originals, distinguishing them from
/// upload identifiers in the proxied namespace.
pub const URL_KEY_PREFIX: &str = "U";

/// Path marker under the service's own origin that identifies an upload.
pub const UPLOAD_PATH_MARKER: &str = "/file/";

/// sha1 multihash framing: code 0x11, length 20.
const MULTIHASH_SHA1: [u8; 2] = [0x11, 0x14];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Bytes live in the upload store under their native identifier.
    Upload,
    /// Bytes live in the proxied store under a content-derived identifier.
    Remote,
}

#[derive(Debug, Clone)]
pub struct OriginalKey {
    pub key: String,
    pub source: KeySource,
}

/// Derives the storage key of the unmodified source bytes.
///
/// A target URL pointing back at this service's own upload namespace is
/// resolved to the upload identifier itself; anything else is keyed by a
/// base58 multihash digest of the full URL string.
pub fn derive_original_key(url: &Url, service_url: &Url) -> OriginalKey {
    if url.origin() == service_url.origin() {
        if let Some(rest) = url.path().strip_prefix(UPLOAD_PATH_MARKER) {
            let id = rest.split('/').next().unwrap_or("");
            if !id.is_empty() {
                return OriginalKey {
                    key: id.to_string(),
                    source: KeySource::Upload,
                };
            }
        }
    }

    let digest = Sha1::digest(url.as_str().as_bytes());
    let mut multihash = Vec::with_capacity(2 + digest.len());
    multihash.extend_from_slice(&MULTIHASH_SHA1);
    multihash.extend_from_slice(&digest);
    OriginalKey {
        key: format!("{URL_KEY_PREFIX}{}", bs58::encode(multihash).into_string()),
        source: KeySource::Remote,
    }
}

/// Derives the variant key from the original key plus the request options.
///
/// `(Fit, Match)` requests collapse to a `{key}_{w}x{h}` form that omits
/// the mode/format tokens. This aliasing is kept for compatibility with
/// the key scheme of earlier deployments; see DESIGN.md.
pub fn derive_variant_key(original_key: &str, opts: &TransformOptions) -> String {
    if opts.mode == ScalingMode::Fit && opts.format == OutputFormat::Match {
        return format!(
            "{original_key}_{}x{}",
            opts.width.unwrap_or(0),
            opts.height.unwrap_or(0)
        );
    }

    let mut parts = vec![
        original_key.to_string(),
        opts.mode.token().to_string(),
        opts.format.token().to_string(),
    ];
    if let Some(w) = opts.width.filter(|w| *w > 0) {
        parts.push(w.to_string());
    }
    if let Some(h) = opts.height.filter(|h| *h > 0) {
        parts.push(h.to_string());
    }
    parts.join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(
        width: Option<u32>,
        height: Option<u32>,
        mode: ScalingMode,
        format: OutputFormat,
    ) -> TransformOptions {
        TransformOptions { width, height, mode, format }
    }

    #[test]
    fn remote_keys_are_deterministic_and_tagged() {
        let service = Url::parse("http://localhost:8080").unwrap();
        let url = Url::parse("https://example.com/cat.jpg").unwrap();

        let a = derive_original_key(&url, &service);
        let b = derive_original_key(&url, &service);
        assert_eq!(a.key, b.key);
        assert_eq!(a.source, KeySource::Remote);
        assert!(a.key.starts_with(URL_KEY_PREFIX));

        let other = Url::parse("https://example.com/dog.jpg").unwrap();
        assert_ne!(a.key, derive_original_key(&other, &service).key);
    }

    #[test]
    fn upload_urls_resolve_to_the_upload_identifier() {
        let service = Url::parse("http://localhost:8080").unwrap();
        let url = Url::parse("http://localhost:8080/file/abc123/cat.png").unwrap();

        let key = derive_original_key(&url, &service);
        assert_eq!(key.key, "abc123");
        assert_eq!(key.source, KeySource::Upload);

        // same host, different namespace: treated as a remote URL
        let url = Url::parse("http://localhost:8080/assets/logo.png").unwrap();
        assert_eq!(derive_original_key(&url, &service).source, KeySource::Remote);

        // other origin with an upload-shaped path: still remote
        let url = Url::parse("https://elsewhere.net/file/abc123").unwrap();
        assert_eq!(derive_original_key(&url, &service).source, KeySource::Remote);
    }

    #[test]
    fn fit_match_collapses_to_the_legacy_dimension_key() {
        let o = opts(None, None, ScalingMode::Fit, OutputFormat::Match);
        assert_eq!(derive_variant_key("Uk", &o), "Uk_0x0");

        let o = opts(Some(320), None, ScalingMode::Fit, OutputFormat::Match);
        assert_eq!(derive_variant_key("Uk", &o), "Uk_320x0");

        let o = opts(Some(320), Some(240), ScalingMode::Fit, OutputFormat::Match);
        assert_eq!(derive_variant_key("Uk", &o), "Uk_320x240");
    }

    #[test]
    fn non_legacy_keys_carry_mode_and_format_tokens() {
        let o = opts(Some(100), None, ScalingMode::Cover, OutputFormat::Match);
        assert_eq!(derive_variant_key("Uk", &o), "Uk_Cover_Match_100");

        let o = opts(Some(100), Some(50), ScalingMode::Cover, OutputFormat::Webp);
        assert_eq!(derive_variant_key("Uk", &o), "Uk_Cover_Webp_100_50");

        let o = opts(None, None, ScalingMode::Fit, OutputFormat::Png);
        assert_eq!(derive_variant_key("Uk", &o), "Uk_Fit_Png");
    }

    #[test]
    fn distinct_options_yield_distinct_keys() {
        let combos = [
            opts(None, None, ScalingMode::Cover, OutputFormat::Match),
            opts(Some(10), None, ScalingMode::Cover, OutputFormat::Match),
            opts(Some(10), Some(20), ScalingMode::Cover, OutputFormat::Match),
            opts(Some(10), Some(10), ScalingMode::Cover, OutputFormat::Jpeg),
            opts(Some(10), Some(10), ScalingMode::Fit, OutputFormat::Jpeg),
            opts(Some(10), Some(10), ScalingMode::Fit, OutputFormat::Match),
        ];
        let keys: Vec<String> = combos.iter().map(|o| derive_variant_key("Uk", o)).collect();
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
