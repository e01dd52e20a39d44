use anyhow::{Context, Result};

use crate::provider::RepoId;

mod checksum;
pub mod config;
mod latest;
mod releases;

pub use checksum::{checksum, verify_file};
pub use latest::latest;
pub use releases::releases;

fn parse_repo(repo_str: &str) -> Result<RepoId> {
    repo_str
        .parse::<RepoId>()
        .with_context(|| format!("Invalid repository '{}'", repo_str))
}
