use anyhow::Result;
use log::debug;

use crate::{provider::Release, runtime::Runtime};

use super::config::Config;
use super::parse_repo;

/// List releases of a repository, newest first as the API returns them
#[tracing::instrument(skip(config))]
pub async fn releases<R: Runtime>(
    config: Config<R>,
    repo_str: &str,
    count: usize,
    all: bool,
) -> Result<()> {
    let repo = parse_repo(repo_str)?;
    let repository = config.into_repository(repo)?;

    let releases = if all {
        repository.list_all_releases().await?
    } else {
        repository.list_releases(count).await?
    };
    debug!("Listing {} releases", releases.len());

    if releases.is_empty() {
        println!("No releases found for {}.", repository.repo());
        return Ok(());
    }

    for line in format_releases(&releases, all) {
        println!("{}", line);
    }
    Ok(())
}

/// One tab-separated line per release: tag, publication date, name.
///
/// With `with_assets`, every download URL follows on its own indented line.
pub(crate) fn format_releases(releases: &[Release], with_assets: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for release in releases {
        lines.push(format!(
            "{}\t{}\t{}",
            release.tag_name,
            release.published_at.as_deref().unwrap_or("-"),
            release.name
        ));
        if with_assets {
            lines.extend(release.download_urls.iter().map(|url| format!("  {}", url)));
        }
    }
    lines
}
