//! Release data and the sources it is fetched from.
//!
//! [`ReleaseSource`] is the network-facing seam (implemented by
//! [`GitHubProvider`]); [`ReleaseRepository`] layers the TTL cache on top.

mod github;
mod repository;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::http::FetchError;

pub use github::GitHubProvider;
pub use repository::{ALL_RELEASES_KEY, MAX_PER_PAGE, RELEASES_KEY, ReleaseRepository, TAGS_KEY};

/// Repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            anyhow::bail!("Invalid repository format. Expected 'owner/repo'.")
        } else {
            Ok(RepoId {
                owner: parts[0].to_string(),
                repo: parts[1].to_string(),
            })
        }
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
    pub size: u64,
}

/// A tagged release, normalized from the API response.
///
/// `name` is never blank once a release leaves this module: it falls back to
/// `tag_name`. `download_urls` is only filled when assets were requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Release {
    pub name: String,
    pub tag_name: String,
    pub published_at: Option<String>,
    pub url: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub download_urls: Vec<String>,
}

impl Release {
    /// Fills a blank `name` from `tag_name`.
    pub fn with_name_backfilled(mut self) -> Self {
        if self.name.trim().is_empty() {
            self.name = self.tag_name.clone();
        }
        self
    }

    /// Drops assets and the derived URL list.
    pub fn without_assets(mut self) -> Self {
        self.assets.clear();
        self.download_urls.clear();
        self
    }
}

/// A git tag, which may or may not carry a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// Where releases come from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// The most recent releases, one page of at most `per_page`, without assets.
    async fn releases(&self, repo: &RepoId, per_page: usize) -> Result<Vec<Release>, FetchError>;

    /// Every release across all pages, with assets and download URLs.
    async fn all_releases(&self, repo: &RepoId) -> Result<Vec<Release>, FetchError>;

    /// A single release by tag. A missing tag is `Ok(None)`.
    async fn release_by_tag(
        &self,
        repo: &RepoId,
        tag: &str,
    ) -> Result<Option<Release>, FetchError>;

    /// Every tag across all pages, in server order.
    async fn tags(&self, repo: &RepoId) -> Result<Vec<Tag>, FetchError>;

    /// Raw text of a downloadable file, e.g. a checksum list.
    async fn download_text(&self, url: &str) -> Result<String, FetchError>;
}
