use anyhow::Result;
use clap::Parser;
use ghsum::{
    commands::{self, config::Config, config::Settings},
    finder::SelectionMode,
    platform::Platform,
};
use std::path::PathBuf;

/// ghsum - GitHub release checksums
///
/// Find the latest release of a repository and look up or verify the
/// published checksum of a release artifact.
///
/// If the GITHUB_TOKEN environment variable is set, it will be used for authentication.
/// This is useful for accessing private repositories or avoiding rate limits.
///
/// Examples:
///   ghsum latest owner/repo --mode version
///   ghsum checksum owner/repo --version v1.2.3
///   ghsum verify owner/repo --version v1.2.3 --file ./tool.tar.gz
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// API token (falls back to GITHUB_TOKEN)
    #[arg(long, value_name = "TOKEN", global = true)]
    pub token: Option<String>,

    /// Cache directory (also via GHSUM_CACHE_DIR)
    #[arg(long = "cache-dir", env = "GHSUM_CACHE_DIR", value_name = "PATH", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Minutes before cached API responses are refreshed
    #[arg(long = "cache-minutes", value_name = "MINUTES", default_value_t = 60, global = true)]
    pub cache_minutes: u64,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List releases of a repository
    Releases(ReleasesArgs),

    /// Show the latest release
    Latest(LatestArgs),

    /// Print the published checksum of a release artifact
    Checksum(ChecksumArgs),

    /// Verify a downloaded artifact against the published checksum
    Verify(VerifyArgs),
}

#[derive(clap::Args, Debug)]
pub struct ReleasesArgs {
    /// The GitHub repository in the format "owner/repo"
    #[arg(value_name = "OWNER/REPO")]
    pub repo: String,

    /// Number of most recent releases to list
    #[arg(long, short = 'n', default_value_t = 10)]
    pub count: usize,

    /// List every release, including download URLs
    #[arg(long)]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct LatestArgs {
    /// The GitHub repository in the format "owner/repo"
    #[arg(value_name = "OWNER/REPO")]
    pub repo: String,

    /// Ranking: published, version or security
    #[arg(long, default_value = "published")]
    pub mode: SelectionMode,

    /// Rank git tags by version instead of releases
    #[arg(long, conflicts_with = "mode")]
    pub tags: bool,

    /// Skip releases whose name or tag contains this keyword (repeatable)
    #[arg(long = "exclude", value_name = "KEYWORD")]
    pub exclude: Vec<String>,

    /// Print the version without a leading "v"
    #[arg(long = "only-version")]
    pub only_version: bool,
}

#[derive(clap::Args, Debug)]
pub struct TargetArgs {
    /// The GitHub repository in the format "owner/repo"
    #[arg(value_name = "OWNER/REPO")]
    pub repo: String,

    /// Release tag or version, e.g. v1.2.3 or 1.2.3
    #[arg(long, value_name = "TAG")]
    pub version: String,

    /// Operating system as named in release files (defaults to this host)
    #[arg(long, value_name = "OS")]
    pub system: Option<String>,

    /// Architecture as named in release files (defaults to this host)
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,
}

impl TargetArgs {
    fn platform(&self) -> (String, String) {
        let host = Platform::detect();
        (
            self.system.clone().unwrap_or_else(|| host.release_os()),
            self.arch.clone().unwrap_or_else(|| host.release_arch()),
        )
    }
}

#[derive(clap::Args, Debug)]
pub struct ChecksumArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Also print the matching download URL
    #[arg(long)]
    pub url: bool,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Downloaded artifact to check
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = ghsum::runtime::RealRuntime;

    let settings = Settings {
        api_url: cli.api_url,
        token: cli.token,
        cache_dir: cli.cache_dir,
        cache_minutes: cli.cache_minutes,
    };
    let config = Config::new(runtime, settings)?;

    match cli.command {
        Commands::Releases(args) => {
            commands::releases(config, &args.repo, args.count, args.all).await?
        }
        Commands::Latest(args) => {
            commands::latest(
                config,
                &args.repo,
                args.mode,
                args.tags,
                &args.exclude,
                args.only_version,
            )
            .await?
        }
        Commands::Checksum(args) => {
            let (system, arch) = args.target.platform();
            commands::checksum(
                config,
                &args.target.repo,
                &args.target.version,
                &system,
                &arch,
                args.url,
            )
            .await?
        }
        Commands::Verify(args) => {
            let (system, arch) = args.target.platform();
            commands::verify_file(
                config,
                &args.target.repo,
                &args.target.version,
                &system,
                &arch,
                &args.file,
            )
            .await?
        }
    }
    Ok(())
}
