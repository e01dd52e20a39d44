//! Picking "the latest" release.
//!
//! All functions here are pure: they rank a slice of already fetched releases
//! and never touch the network or the cache.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::provider::{Release, Tag};

/// Marker that identifies a security release.
pub const SECURITY_MARKER: &str = "+security";

static NAME_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/\s*(\d{4}-\d{2}-\d{2})").ok());

/// How [`ReleaseFinder::find_latest`] ranks candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Latest publication date; version only breaks ties.
    #[default]
    Published,
    /// Highest version, dates ignored.
    Version,
    /// Highest version among `+security` releases.
    Security,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Published => write!(f, "published"),
            SelectionMode::Version => write!(f, "version"),
            SelectionMode::Security => write!(f, "security"),
        }
    }
}

impl FromStr for SelectionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "published" => Ok(SelectionMode::Published),
            "version" => Ok(SelectionMode::Version),
            "security" => Ok(SelectionMode::Security),
            _ => anyhow::bail!(
                "Unknown selection mode: {}. Expected published, version, or security.",
                s
            ),
        }
    }
}

/// Ranking data derived from one release.
struct Candidate<'a> {
    date: Option<DateTime<Utc>>,
    version: Version,
    release: &'a Release,
}

/// Selects releases, honoring a replaceable set of exclusion keywords.
#[derive(Debug, Clone, Default)]
pub struct ReleaseFinder {
    exclusions: Vec<String>,
}

impl ReleaseFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exclusions<I, K>(keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut finder = Self::new();
        finder.set_exclusion_keywords(keywords);
        finder
    }

    /// Replaces the exclusion keywords. Blank keywords are ignored.
    pub fn set_exclusion_keywords<I, K>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.exclusions = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
    }

    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    /// Case-insensitive substring match of any keyword against name or tag.
    pub fn is_excluded(&self, release: &Release) -> bool {
        self.mentions_exclusion(&[release.name.as_str(), release.tag_name.as_str()])
    }

    fn mentions_exclusion(&self, fields: &[&str]) -> bool {
        if self.exclusions.is_empty() {
            return false;
        }
        fields.iter().any(|field| {
            let field = field.to_lowercase();
            self.exclusions.iter().any(|k| field.contains(k.as_str()))
        })
    }

    /// The latest release under `mode`, or `None` if nothing qualifies.
    ///
    /// Ties keep the release encountered first.
    pub fn find_latest(&self, releases: &[Release], mode: SelectionMode) -> Option<Release> {
        let candidates = releases
            .iter()
            .filter(|r| !self.is_excluded(r))
            .filter(|r| mode != SelectionMode::Security || is_security_release(r))
            .map(|r| Candidate {
                date: release_date(r),
                version: parse_version(&r.tag_name),
                release: r,
            })
            .filter(|c| mode != SelectionMode::Published || c.date.is_some());

        let best = candidates.reduce(|best, candidate| {
            if rank(mode, &candidate, &best) == Ordering::Greater {
                candidate
            } else {
                best
            }
        })?;

        log::debug!(
            "Selected {} ({} mode) from {} releases",
            best.release.tag_name,
            mode,
            releases.len()
        );
        Some(best.release.clone().with_name_backfilled())
    }

    /// The tag with the highest version after exclusions. Ties keep the first.
    pub fn find_latest_tag(&self, tags: &[Tag]) -> Option<Tag> {
        let best = tags
            .iter()
            .filter(|t| !t.name.trim().is_empty())
            .filter(|t| !self.mentions_exclusion(&[t.name.as_str()]))
            .map(|t| (parse_version(&t.name), t))
            .reduce(|best, candidate| {
                if candidate.0 > best.0 {
                    candidate
                } else {
                    best
                }
            })?;

        log::debug!("Selected tag {} from {} tags", best.1.name, tags.len());
        Some(best.1.clone())
    }
}

fn rank(mode: SelectionMode, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    match mode {
        SelectionMode::Published => (a.date, &a.version).cmp(&(b.date, &b.version)),
        SelectionMode::Version | SelectionMode::Security => a.version.cmp(&b.version),
    }
}

pub fn is_security_release(release: &Release) -> bool {
    release.tag_name.contains(SECURITY_MARKER) || release.name.contains(SECURITY_MARKER)
}

/// Publication time, or failing that a `/ YYYY-MM-DD` date in the name.
pub fn release_date(release: &Release) -> Option<DateTime<Utc>> {
    let published = release.published_at.as_deref().and_then(parse_timestamp);

    published.or_else(|| {
        let caps = NAME_DATE.as_ref()?.captures(&release.name)?;
        parse_timestamp(&caps[1])
    })
}

/// ISO 8601 timestamp. A missing offset means UTC, a bare date means midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Parses a tag as semver; anything unparsable ranks as `0.0.0`.
///
/// A leading `v`/`V` is ignored and short versions like `1.2` are padded.
pub fn parse_version(tag: &str) -> Version {
    let raw = strip_version_prefix(tag.trim());
    Version::parse(raw)
        .ok()
        .or_else(|| parse_padded(raw))
        .unwrap_or_else(|| Version::new(0, 0, 0))
}

fn parse_padded(raw: &str) -> Option<Version> {
    let split = raw.find(['-', '+']).unwrap_or(raw.len());
    let (core, rest) = raw.split_at(split);

    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&format!("{}{}", parts.join("."), rest)).ok()
}

/// Removes one leading `v` or `V`.
pub fn strip_version_prefix(tag: &str) -> &str {
    tag.strip_prefix(['v', 'V']).unwrap_or(tag)
}

/// Whether two tags name the same version, ignoring a leading `v`/`V`.
pub fn versions_match(a: &str, b: &str) -> bool {
    strip_version_prefix(a.trim()) == strip_version_prefix(b.trim())
}

/// The release whose tag matches `version` exactly (prefix-tolerant).
pub fn find_exact<'a>(releases: &'a [Release], version: &str) -> Option<&'a Release> {
    releases
        .iter()
        .find(|r| versions_match(&r.tag_name, version))
}
