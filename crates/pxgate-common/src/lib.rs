// Shared types for the pxgate image proxy: the error taxonomy, the
// request-option enums, and content-type sniffing.

use std::str::FromStr;

use thiserror::Error;

/// Failure modes of a blob store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob not found: {0}")]
    NotFound(String),
}

/// Every rejection path of the proxy pipeline. Each variant maps to a
/// stable wire code and an HTTP status; no variant is retried internally.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("method not allowed")]
    InvalidMethod,

    #[error("missing parameter: {0}")]
    MissingParam(&'static str),

    #[error("target url could not be decoded")]
    InvalidProxyUrl,

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("target url is blacklisted")]
    Blacklisted,

    #[error("upload not found")]
    UploadNotFound,

    #[error("upstream fetch failed: {0}")]
    Upstream(Box<dyn std::error::Error + Send + Sync>),

    #[error("image exceeds the configured size ceiling")]
    PayloadTooLarge,

    #[error("not a valid image")]
    InvalidImage,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Stable machine-readable code carried in error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::InvalidMethod => "invalid_method",
            ProxyError::MissingParam(_) => "missing_param",
            ProxyError::InvalidProxyUrl => "invalid_proxy_url",
            ProxyError::InvalidParam(_) => "invalid_param",
            ProxyError::Blacklisted => "blacklisted",
            ProxyError::UploadNotFound => "upload_not_found",
            ProxyError::Upstream(_) => "upstream_error",
            ProxyError::PayloadTooLarge => "payload_too_large",
            ProxyError::InvalidImage => "invalid_image",
            ProxyError::Store(_) => "store_error",
            ProxyError::Internal(_) => "internal_error",
        }
    }

    /// Deterministic HTTP status for the caller.
    pub fn http_status(&self) -> u16 {
        match self {
            ProxyError::InvalidMethod => 405,
            ProxyError::MissingParam(_)
            | ProxyError::InvalidProxyUrl
            | ProxyError::InvalidParam(_)
            | ProxyError::InvalidImage => 400,
            ProxyError::Blacklisted => 403,
            ProxyError::UploadNotFound => 404,
            ProxyError::PayloadTooLarge => 413,
            ProxyError::Upstream(_) => 502,
            ProxyError::Store(_) | ProxyError::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

/// How the requested box is applied to the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalingMode {
    /// Fill the box exactly, cropping overflow symmetrically.
    Cover,
    /// Fit within the box, preserving aspect ratio.
    #[default]
    Fit,
}

impl ScalingMode {
    /// Token used in variant keys. Must stay stable: it is part of the
    /// persisted key format.
    pub fn token(self) -> &'static str {
        match self {
            ScalingMode::Cover => "Cover",
            ScalingMode::Fit => "Fit",
        }
    }
}

impl FromStr for ScalingMode {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cover" => Ok(ScalingMode::Cover),
            "fit" => Ok(ScalingMode::Fit),
            other => Err(ProxyError::InvalidParam(format!("invalid mode: {other}"))),
        }
    }
}

/// Requested output encoding. `Match` preserves the source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Match,
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// Token used in variant keys; part of the persisted key format.
    pub fn token(self) -> &'static str {
        match self {
            OutputFormat::Match => "Match",
            OutputFormat::Jpeg => "Jpeg",
            OutputFormat::Png => "Png",
            OutputFormat::Webp => "Webp",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "match" => Ok(OutputFormat::Match),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(ProxyError::InvalidParam(format!("invalid format: {other}"))),
        }
    }
}

/// Validated transform options of a single request, immutable once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mode: ScalingMode,
    pub format: OutputFormat,
}

/// The image types the proxy accepts from an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Gif,
    Jpeg,
    Png,
    Webp,
}

impl ImageType {
    /// Magic-byte sniff; anything that is not an accepted image type
    /// comes back as `None`.
    pub fn sniff(buf: &[u8]) -> Option<ImageType> {
        match infer::get(buf)?.mime_type() {
            "image/gif" => Some(ImageType::Gif),
            "image/jpeg" => Some(ImageType::Jpeg),
            "image/png" => Some(ImageType::Png),
            "image/webp" => Some(ImageType::Webp),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageType::Gif => "image/gif",
            ImageType::Jpeg => "image/jpeg",
            ImageType::Png => "image/png",
            ImageType::Webp => "image/webp",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!("cover".parse::<ScalingMode>().unwrap(), ScalingMode::Cover);
        assert_eq!("fit".parse::<ScalingMode>().unwrap(), ScalingMode::Fit);
        assert!("stretch".parse::<ScalingMode>().is_err());
    }

    #[test]
    fn format_parsing_accepts_jpg_alias() {
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("webp".parse::<OutputFormat>().unwrap(), OutputFormat::Webp);
        assert!("bmp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn sniff_recognizes_accepted_types() {
        let gif = b"GIF89a\x01\x00\x01\x00\x80\x00\x00";
        assert_eq!(ImageType::sniff(gif), Some(ImageType::Gif));

        let png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";
        assert_eq!(ImageType::sniff(png), Some(ImageType::Png));

        let jpeg = b"\xff\xd8\xff\xe0\x00\x10JFIF";
        assert_eq!(ImageType::sniff(jpeg), Some(ImageType::Jpeg));

        assert_eq!(ImageType::sniff(b"<svg></svg>"), None);
        assert_eq!(ImageType::sniff(b""), None);
    }

    #[test]
    fn error_codes_map_to_statuses() {
        assert_eq!(ProxyError::Blacklisted.http_status(), 403);
        assert_eq!(ProxyError::PayloadTooLarge.http_status(), 413);
        assert_eq!(ProxyError::UploadNotFound.http_status(), 404);
        assert_eq!(ProxyError::InvalidImage.http_status(), 400);
        assert_eq!(ProxyError::InvalidMethod.http_status(), 405);
        assert_eq!(ProxyError::InvalidProxyUrl.code(), "invalid_proxy_url");
    }
}
