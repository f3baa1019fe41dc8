//! Request-handling pipeline of the pxgate image proxy.
//!
//! Control flow: option parsing -> key derivation -> cache resolution ->
//! (hit: serve) / (miss: origin fetch or original read) -> transform
//! dispatch -> persistence -> response. Key derivation is the part that
//! must stay bit-exact across deployments: the derived strings address
//! the long-term caches.

pub mod blacklist;
pub mod fetch;
pub mod keys;
pub mod options;
pub mod pipeline;
pub mod transform;

pub use blacklist::Blacklist;
pub use fetch::{FetchResult, OriginFetcher};
pub use pipeline::{Pipeline, PipelineConfig, ProxyBody, ProxyResponse, ServedFrom};
