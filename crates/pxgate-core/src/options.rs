//! Decoding of the path-embedded target URL and validation of the
//! query parameters into [`TransformOptions`].

use std::collections::HashMap;

use pxgate_common::{OutputFormat, ProxyError, Result, ScalingMode, TransformOptions};
use url::Url;

/// Decodes the base58 path segment into an absolute http(s) URL.
pub fn decode_target(encoded: &str) -> Result<Url> {
    if encoded.is_empty() {
        return Err(ProxyError::MissingParam("url"));
    }
    let raw = bs58::decode(encoded)
        .into_vec()
        .map_err(|_| ProxyError::InvalidProxyUrl)?;
    let target = String::from_utf8(raw).map_err(|_| ProxyError::InvalidProxyUrl)?;
    let url = Url::parse(&target).map_err(|_| ProxyError::InvalidProxyUrl)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ProxyError::InvalidProxyUrl),
    }
}

/// Validates the query parameters. Absent values take their defaults
/// (`fit`, `match`, unconstrained dimensions); present but malformed
/// values are rejected.
pub fn parse_options(params: &HashMap<String, String>) -> Result<TransformOptions> {
    let width = parse_dimension(params, "width")?;
    let height = parse_dimension(params, "height")?;

    let mode = match params.get("mode").map(String::as_str) {
        None | Some("") => ScalingMode::default(),
        Some(s) => s.parse()?,
    };
    let format = match params.get("format").map(String::as_str) {
        None | Some("") => OutputFormat::default(),
        Some(s) => s.parse()?,
    };

    Ok(TransformOptions { width, height, mode, format })
}

fn parse_dimension(params: &HashMap<String, String>, name: &str) -> Result<Option<u32>> {
    match params.get(name).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ProxyError::InvalidParam(format!("invalid {name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn decode_round_trips_a_url() {
        let url = "https://example.com/cat.jpg?v=2";
        let encoded = bs58::encode(url.as_bytes()).into_string();
        assert_eq!(decode_target(&encoded).unwrap().as_str(), url);
    }

    #[test]
    fn decode_rejects_garbage_and_non_http() {
        assert!(matches!(decode_target(""), Err(ProxyError::MissingParam(_))));
        // '0' is outside the bitcoin base58 alphabet
        assert!(matches!(decode_target("0OIl"), Err(ProxyError::InvalidProxyUrl)));
        // decodes, but not a URL
        let not_a_url = bs58::encode(b"not a url").into_string();
        assert!(matches!(decode_target(&not_a_url), Err(ProxyError::InvalidProxyUrl)));
        let ftp = bs58::encode(b"ftp://example.com/a").into_string();
        assert!(matches!(decode_target(&ftp), Err(ProxyError::InvalidProxyUrl)));
    }

    #[test]
    fn defaults_are_fit_match_unconstrained() {
        let opts = parse_options(&params(&[])).unwrap();
        assert_eq!(opts.mode, ScalingMode::Fit);
        assert_eq!(opts.format, OutputFormat::Match);
        assert_eq!(opts.width, None);
        assert_eq!(opts.height, None);
    }

    #[test]
    fn dimensions_parse_or_reject() {
        let opts = parse_options(&params(&[("width", "120"), ("height", "80")])).unwrap();
        assert_eq!(opts.width, Some(120));
        assert_eq!(opts.height, Some(80));

        // empty values are treated as absent, not as errors
        let opts = parse_options(&params(&[("width", "")])).unwrap();
        assert_eq!(opts.width, None);

        assert!(parse_options(&params(&[("width", "abc")])).is_err());
        assert!(parse_options(&params(&[("height", "-1")])).is_err());
        assert!(parse_options(&params(&[("width", "1.5")])).is_err());
    }

    #[test]
    fn unknown_mode_or_format_is_rejected() {
        assert!(parse_options(&params(&[("mode", "stretch")])).is_err());
        assert!(parse_options(&params(&[("format", "tiff")])).is_err());
        let opts = parse_options(&params(&[("mode", "cover"), ("format", "jpg")])).unwrap();
        assert_eq!(opts.mode, ScalingMode::Cover);
        assert_eq!(opts.format, OutputFormat::Jpeg);
    }
}
