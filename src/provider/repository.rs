//! Cache-or-fetch access to a single repository's releases.

use log::{debug, info};

use crate::cache::FileCache;
use crate::http::FetchError;
use crate::runtime::Runtime;

use super::{Release, ReleaseAsset, ReleaseSource, RepoId, Tag};

/// Cache entry for [`ReleaseRepository::list_releases`].
pub const RELEASES_KEY: &str = "releases.json";

/// Cache entry for [`ReleaseRepository::list_all_releases`].
pub const ALL_RELEASES_KEY: &str = "release_artefacts.json";

/// Cache entry for [`ReleaseRepository::list_tags`].
pub const TAGS_KEY: &str = "tags.json";

/// Page-size ceiling of the releases endpoint.
pub const MAX_PER_PAGE: usize = 100;

fn tag_key(tag: &str) -> String {
    format!("release_artefacts_{}.json", tag)
}

/// Releases of one repository, read through a [`FileCache`].
///
/// Cache failures never surface; transport errors from the source are
/// returned unchanged.
pub struct ReleaseRepository<S: ReleaseSource, R: Runtime> {
    source: S,
    repo: RepoId,
    cache: FileCache<R>,
}

impl<S: ReleaseSource, R: Runtime> ReleaseRepository<S, R> {
    pub fn new(source: S, repo: RepoId, cache: FileCache<R>) -> Self {
        Self {
            source,
            repo,
            cache,
        }
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &FileCache<R> {
        &self.cache
    }

    /// Up to `count` most recent releases, without assets.
    ///
    /// The cache entry is shared across counts; a cached list is cut to `count`.
    pub async fn list_releases(&self, count: usize) -> Result<Vec<Release>, FetchError> {
        let per_page = count.clamp(1, MAX_PER_PAGE);
        let mut releases = self
            .cache
            .get_or_fetch(RELEASES_KEY, || {
                info!("Fetching latest {} releases of {}", per_page, self.repo);
                self.source.releases(&self.repo, per_page)
            })
            .await?;
        releases.truncate(count);
        Ok(releases)
    }

    /// Every release with assets and download URLs.
    pub async fn list_all_releases(&self) -> Result<Vec<Release>, FetchError> {
        let releases = self
            .cache
            .get_or_fetch(ALL_RELEASES_KEY, || {
                info!("Fetching all releases of {}", self.repo);
                self.source.all_releases(&self.repo)
            })
            .await?;
        debug!("{} releases known for {}", releases.len(), self.repo);
        Ok(releases)
    }

    /// Every tag of the repository.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, FetchError> {
        let tags = self
            .cache
            .get_or_fetch(TAGS_KEY, || {
                info!("Fetching tags of {}", self.repo);
                self.source.tags(&self.repo)
            })
            .await?;
        debug!("{} tags known for {}", tags.len(), self.repo);
        Ok(tags)
    }

    /// The release tagged `tag`, or `None` if the tag does not exist.
    ///
    /// Only found releases are cached.
    pub async fn release_by_tag(&self, tag: &str) -> Result<Option<Release>, FetchError> {
        let key = tag_key(tag);
        if let Some(cached) = self.cache.get::<Release>(&key) {
            return Ok(Some(cached));
        }

        let release = self.source.release_by_tag(&self.repo, tag).await?;
        if let Some(release) = &release {
            self.cache.put(&key, release);
        }
        Ok(release)
    }

    /// Assets of the release tagged `tag`.
    pub async fn release_assets(&self, tag: &str) -> Result<Option<Vec<ReleaseAsset>>, FetchError> {
        Ok(self.release_by_tag(tag).await?.map(|r| r.assets))
    }
}
