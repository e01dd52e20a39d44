use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::{
    cache::{DEFAULT_TTL_MINUTES, FileCache},
    http::{DEFAULT_API_URL, HttpClient},
    provider::{GitHubProvider, ReleaseRepository, RepoId},
    runtime::Runtime,
};

/// Command-line settings shared by every command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub cache_minutes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: None,
            token: None,
            cache_dir: None,
            cache_minutes: DEFAULT_TTL_MINUTES,
        }
    }
}

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub http_client: HttpClient,
    pub api_url: String,
    pub cache_root: Option<PathBuf>,
    pub cache_minutes: u64,
}

impl<R: Runtime> Config<R> {
    /// Builds the HTTP client. Without `--token`, `GITHUB_TOKEN` is consulted.
    pub fn new(runtime: R, settings: Settings) -> Result<Self> {
        let token = settings
            .token
            .or_else(|| runtime.env_var("GITHUB_TOKEN").ok())
            .filter(|t| !t.trim().is_empty());
        if token.is_none() {
            debug!("No GitHub token configured, requests are unauthenticated");
        }

        let http_client = HttpClient::with_token(token.as_deref())?;

        Ok(Self {
            runtime,
            http_client,
            api_url: settings
                .api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            cache_root: settings.cache_dir,
            cache_minutes: settings.cache_minutes,
        })
    }

    /// `<root>/<owner>/<repo>`, where root defaults to the user cache directory.
    pub fn cache_dir(&self, repo: &RepoId) -> Result<PathBuf> {
        let root = match &self.cache_root {
            Some(root) => root.clone(),
            None => self
                .runtime
                .cache_dir()
                .map(|dir| dir.join("ghsum"))
                .context("Could not determine a cache directory, pass --cache-dir")?,
        };
        Ok(root.join(&repo.owner).join(&repo.repo))
    }

    pub fn into_repository(self, repo: RepoId) -> Result<ReleaseRepository<GitHubProvider, R>> {
        let dir = self.cache_dir(&repo)?;
        debug!("Caching {} under {:?}", repo, dir);

        let cache = FileCache::new(self.runtime, dir, self.cache_minutes);
        let provider = GitHubProvider::new(self.http_client, &self.api_url);
        Ok(ReleaseRepository::new(provider, repo, cache))
    }
}
