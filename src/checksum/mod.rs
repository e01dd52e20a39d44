//! Checksum discovery, extraction and verification.
//!
//! A release's checksum file is located among its assets, downloaded once and
//! cached as an array of non-blank lines, then searched for the line naming
//! the wanted artifact.

mod hash;

use log::{debug, info, warn};
use regex::Regex;
use thiserror::Error;

use crate::http::FetchError;
use crate::provider::{ReleaseAsset, ReleaseRepository, ReleaseSource};
use crate::runtime::Runtime;

pub use hash::{BLOCK_SIZE, HashAlgorithm, compute_local_hash, verify};

/// Substrings that mark an asset as a checksum file.
pub const CHECKSUM_KEYWORDS: [&str; 4] = ["sha256", "sha512", "checksum", "sum"];

#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("No release found for version {0}")]
    ReleaseNotFound(String),

    #[error("Release {0} has no checksum file")]
    NoChecksumAsset(String),

    #[error("No single checksum for {artifact} in {file}")]
    NoMatch { artifact: String, file: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A digest resolved from a release's checksum file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChecksum {
    pub tag: String,
    pub file: ReleaseAsset,
    pub algorithm: HashAlgorithm,
    pub digest: String,
}

pub fn is_checksum_asset(name: &str) -> bool {
    let name = name.to_lowercase();
    CHECKSUM_KEYWORDS.iter().any(|kw| name.contains(kw))
}

/// The first asset whose name looks like a checksum file.
pub fn find_checksum_asset(assets: &[ReleaseAsset]) -> Option<&ReleaseAsset> {
    assets.iter().find(|a| is_checksum_asset(&a.name))
}

/// Non-blank lines of a checksum file, trimmed.
pub fn checksum_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Matches `parts` as literal substrings, in order, with anything between.
fn ordered_pattern(parts: &[&str]) -> Option<Regex> {
    let pattern = parts
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&pattern).ok()
}

/// The hash for the artifact named by `repo`, `system` and `arch`.
///
/// Exactly one matching line yields its first token. A file holding a single
/// line and no match is taken as a bare digest. Anything else is `None`.
pub fn resolve_checksum(lines: &[String], repo: &str, system: &str, arch: &str) -> Option<String> {
    let pattern = ordered_pattern(&[repo, system, arch])?;
    let matches: Vec<&String> = lines.iter().filter(|l| pattern.is_match(l)).collect();

    let line = match matches.as_slice() {
        [line] => *line,
        [] if lines.len() == 1 => &lines[0],
        [] => return None,
        many => {
            warn!(
                "{} checksum lines match {}/{}/{}, refusing to guess",
                many.len(),
                repo,
                system,
                arch
            );
            return None;
        }
    };

    line.split_whitespace().next().map(String::from)
}

/// The first URL naming `version`, `system` and `arch` in that order.
pub fn select_download_url<'a>(
    urls: &'a [String],
    version: &str,
    system: &str,
    arch: &str,
) -> Option<&'a str> {
    let pattern = ordered_pattern(&[version, system, arch])?;
    urls.iter()
        .map(String::as_str)
        .find(|url| pattern.is_match(url))
}

/// Resolves checksums for the releases of one repository.
pub struct ChecksumResolver<'a, S: ReleaseSource, R: Runtime> {
    repository: &'a ReleaseRepository<S, R>,
}

impl<'a, S: ReleaseSource, R: Runtime> ChecksumResolver<'a, S, R> {
    pub fn new(repository: &'a ReleaseRepository<S, R>) -> Self {
        Self { repository }
    }

    /// The checksum asset of the release tagged `tag`.
    ///
    /// `Ok(None)` covers both a missing tag and a release without one.
    pub async fn find_checksum_asset(&self, tag: &str) -> Result<Option<ReleaseAsset>, FetchError> {
        let assets = self.repository.release_assets(tag).await?;
        Ok(assets.and_then(|assets| find_checksum_asset(&assets).cloned()))
    }

    /// Downloads `url` and caches its non-blank lines under `key`.
    #[tracing::instrument(skip(self))]
    pub async fn download_checksum_file(
        &self,
        url: &str,
        key: &str,
    ) -> Result<Vec<String>, FetchError> {
        self.repository
            .cache()
            .get_or_fetch(key, || async {
                info!("Downloading checksum file {}", url);
                let text = self.repository.source().download_text(url).await?;
                Ok(checksum_lines(&text))
            })
            .await
    }

    /// Full lookup: release, checksum asset, file, and the artifact's line.
    pub async fn resolve(
        &self,
        tag: &str,
        system: &str,
        arch: &str,
    ) -> Result<ResolvedChecksum, ChecksumError> {
        let release = self
            .repository
            .release_by_tag(tag)
            .await?
            .ok_or_else(|| ChecksumError::ReleaseNotFound(tag.to_string()))?;

        let file = find_checksum_asset(&release.assets)
            .cloned()
            .ok_or_else(|| ChecksumError::NoChecksumAsset(release.tag_name.clone()))?;
        debug!("Using {} as checksum file for {}", file.name, release.tag_name);

        let key = format!("{}_{}", release.tag_name, file.name);
        let lines = self.download_checksum_file(&file.download_url, &key).await?;

        let repo = &self.repository.repo().repo;
        let system = system.to_lowercase();
        let digest = resolve_checksum(&lines, repo, &system, arch).ok_or_else(|| {
            ChecksumError::NoMatch {
                artifact: format!("{}-{}-{}", repo, system, arch),
                file: file.name.clone(),
            }
        })?;

        let algorithm = if is_checksum_name_specific(&file.name) {
            HashAlgorithm::from_checksum_name(&file.name)
        } else {
            HashAlgorithm::from_digest(&digest)
        };

        Ok(ResolvedChecksum {
            tag: release.tag_name,
            file,
            algorithm,
            digest,
        })
    }
}

/// Whether the file name itself says which algorithm it holds.
fn is_checksum_name_specific(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("sha256") || name.contains("sha512")
}
