use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;

use crate::{
    checksum::{ChecksumResolver, ResolvedChecksum, compute_local_hash, select_download_url, verify},
    finder::{find_exact, strip_version_prefix},
    provider::{ReleaseRepository, ReleaseSource},
    runtime::Runtime,
};

use super::config::Config;
use super::parse_repo;

/// Print the published checksum of one artifact
#[tracing::instrument(skip(config))]
pub async fn checksum<R: Runtime>(
    config: Config<R>,
    repo_str: &str,
    version: &str,
    system: &str,
    arch: &str,
    with_url: bool,
) -> Result<()> {
    let repository = config.into_repository(parse_repo(repo_str)?)?;
    let resolved = resolve(&repository, version, system, arch).await?;

    if with_url {
        let url = artifact_url(&repository, &resolved.tag, system, arch).await?;
        println!("{}  {}", resolved.digest, url);
    } else {
        println!("{}", resolved.digest);
    }
    Ok(())
}

/// Hash a local file and compare it with the published checksum
#[tracing::instrument(skip(config))]
pub async fn verify_file<R: Runtime>(
    config: Config<R>,
    repo_str: &str,
    version: &str,
    system: &str,
    arch: &str,
    file: &Path,
) -> Result<()> {
    let repository = config.into_repository(parse_repo(repo_str)?)?;
    let resolved = resolve(&repository, version, system, arch).await?;

    let runtime = repository.cache().runtime();
    if !runtime.exists(file) {
        anyhow::bail!("File {} does not exist.", file.display());
    }
    let actual = compute_local_hash(runtime, file, resolved.algorithm)?;

    if !verify(&resolved.digest, &actual) {
        anyhow::bail!(
            "Checksum mismatch for {}\n  expected: {}\n  got:      {}",
            file.display(),
            resolved.digest.to_lowercase(),
            actual
        );
    }

    println!("{}: OK ({})", file.display(), resolved.algorithm);
    Ok(())
}

/// Maps a user-supplied version to an existing tag, then resolves its checksum.
async fn resolve<S: ReleaseSource, R: Runtime>(
    repository: &ReleaseRepository<S, R>,
    version: &str,
    system: &str,
    arch: &str,
) -> Result<ResolvedChecksum> {
    let tag = resolve_tag(repository, version).await?;
    let resolved = ChecksumResolver::new(repository)
        .resolve(&tag, system, arch)
        .await?;
    info!(
        "{} checksum for {} {}/{} from {}",
        resolved.algorithm, resolved.tag, system, arch, resolved.file.name
    );
    Ok(resolved)
}

/// The tag for `version`, trying it verbatim before a prefix-tolerant search.
async fn resolve_tag<S: ReleaseSource, R: Runtime>(
    repository: &ReleaseRepository<S, R>,
    version: &str,
) -> Result<String> {
    if repository.release_by_tag(version).await?.is_some() {
        return Ok(version.to_string());
    }

    debug!("Tag {} not found, searching all releases", version);
    let releases = repository.list_all_releases().await?;
    find_exact(&releases, version)
        .map(|r| r.tag_name.clone())
        .with_context(|| format!("No release found for version {}", version))
}

async fn artifact_url<S: ReleaseSource, R: Runtime>(
    repository: &ReleaseRepository<S, R>,
    tag: &str,
    system: &str,
    arch: &str,
) -> Result<String> {
    let release = repository
        .release_by_tag(tag)
        .await?
        .with_context(|| format!("No release found for version {}", tag))?;

    select_download_url(
        &release.download_urls,
        strip_version_prefix(tag),
        &system.to_lowercase(),
        arch,
    )
    .map(String::from)
    .with_context(|| format!("No download for {}/{} in release {}", system, arch, tag))
}
