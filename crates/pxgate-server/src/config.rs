//! Process configuration, read once at startup from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use url::Url;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";
const DEFAULT_MAX_IMAGE_SIZE: u64 = 25 * 1024 * 1024;
const DEFAULT_UPLOADS_DIR: &str = "data/uploads";
const DEFAULT_PROXIED_DIR: &str = "data/proxied";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// This service's own origin, used to recognize upload URLs.
    pub service_url: Url,
    /// Byte ceiling on fetched upstream bodies.
    pub max_image_size: u64,
    pub uploads_dir: PathBuf,
    pub proxied_dir: PathBuf,
    /// Optional newline-separated deny-list of upstream URLs.
    pub blacklist_file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from `PXGATE_*` environment variables.
    /// A malformed value refuses startup rather than falling back.
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = env_or("PXGATE_LISTEN_ADDR", DEFAULT_LISTEN_ADDR)
            .parse()
            .context("PXGATE_LISTEN_ADDR is not a valid socket address")?;

        let service_url = Url::parse(&env_or("PXGATE_SERVICE_URL", DEFAULT_SERVICE_URL))
            .context("PXGATE_SERVICE_URL is not a valid URL")?;

        let max_image_size = match std::env::var("PXGATE_MAX_IMAGE_SIZE") {
            Ok(raw) => raw
                .parse()
                .context("PXGATE_MAX_IMAGE_SIZE is not a valid byte count")?,
            Err(_) => DEFAULT_MAX_IMAGE_SIZE,
        };

        Ok(Self {
            listen_addr,
            service_url,
            max_image_size,
            uploads_dir: PathBuf::from(env_or("PXGATE_UPLOADS_DIR", DEFAULT_UPLOADS_DIR)),
            proxied_dir: PathBuf::from(env_or("PXGATE_PROXIED_DIR", DEFAULT_PROXIED_DIR)),
            blacklist_file: std::env::var("PXGATE_BLACKLIST_FILE").ok().map(PathBuf::from),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
