//! Deny-list of forbidden upstream URLs. Membership only; checked
//! before any store or network access.

use std::collections::HashSet;
use std::path::Path;

use pxgate_common::StoreError;
use url::Url;

#[derive(Debug, Default)]
pub struct Blacklist {
    entries: HashSet<String>,
}

impl Blacklist {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty() && !s.starts_with('#'))
                .collect(),
        }
    }

    /// Loads a newline-separated list; blank lines and `#` comments are
    /// skipped.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(Self::from_entries(contents.lines()))
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.entries.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
