use anyhow::Result;
use log::info;

use crate::{
    finder::{ReleaseFinder, SelectionMode, strip_version_prefix},
    runtime::Runtime,
};

use super::config::Config;
use super::parse_repo;

/// Print the latest release under the given selection mode.
///
/// With `tags`, git tags are ranked by version instead and `mode` is ignored.
#[tracing::instrument(skip(config))]
pub async fn latest<R: Runtime>(
    config: Config<R>,
    repo_str: &str,
    mode: SelectionMode,
    tags: bool,
    exclude: &[String],
    only_version: bool,
) -> Result<()> {
    let repo = parse_repo(repo_str)?;
    let repository = config.into_repository(repo)?;
    let finder = ReleaseFinder::with_exclusions(exclude);

    if tags {
        let tags = repository.list_tags().await?;
        let Some(latest) = finder.find_latest_tag(&tags) else {
            anyhow::bail!(
                "No tag of {} matches ({} tags checked).",
                repository.repo(),
                tags.len()
            );
        };
        info!("Latest tag of {} is {}", repository.repo(), latest.name);
        println!("{}", display_tag(&latest.name, only_version));
        return Ok(());
    }

    let releases = repository.list_all_releases().await?;
    let Some(latest) = finder.find_latest(&releases, mode) else {
        anyhow::bail!(
            "No release of {} matches ({} mode, {} releases checked).",
            repository.repo(),
            mode,
            releases.len()
        );
    };

    info!(
        "Latest release of {} is {} ({})",
        repository.repo(),
        latest.tag_name,
        latest.published_at.as_deref().unwrap_or("unpublished")
    );
    println!("{}", display_tag(&latest.tag_name, only_version));
    Ok(())
}

fn display_tag(tag: &str, only_version: bool) -> &str {
    if only_version {
        strip_version_prefix(tag)
    } else {
        tag
    }
}
