//! A fully read HTTP response and its classification.

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;

use super::error::FetchError;

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

static NEXT_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"<([^>]+)>;\s*rel="next""#).ok());

/// Status, headers and body of one attempt.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    /// Turns rate limits and non-success statuses into errors.
    pub fn into_result(self, url: &str) -> Result<Self, FetchError> {
        if self.status == StatusCode::FORBIDDEN {
            if let Some(retry_after) = rate_limit_wait(&self.headers, SystemTime::now()) {
                return Err(FetchError::RateLimited { retry_after });
            }
        }

        if !self.status.is_success() {
            return Err(FetchError::Http {
                status: self.status.as_u16(),
                url: url.to_string(),
                body: self.body,
            });
        }

        Ok(self)
    }

    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        serde_json::from_str(&self.body).map_err(|e| FetchError::decode(url, e))
    }

    /// The `rel="next"` target of the `Link` header, if any.
    pub fn next_link(&self) -> Option<String> {
        let header = self.headers.get(reqwest::header::LINK)?.to_str().ok()?;
        next_link(header)
    }
}

pub(crate) fn next_link(header: &str) -> Option<String> {
    NEXT_LINK
        .as_ref()?
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Wait time for an exhausted rate limit, floored at one second.
///
/// `None` unless `X-RateLimit-Remaining` is exactly `0`.
pub(crate) fn rate_limit_wait(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let remaining = headers.get(RATE_LIMIT_REMAINING)?.to_str().ok()?.trim();
    if remaining != "0" {
        return None;
    }

    let now_secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let reset = headers
        .get(RATE_LIMIT_RESET)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(now_secs);

    Some(Duration::from_secs(reset.saturating_sub(now_secs).max(1)))
}
