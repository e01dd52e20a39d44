//! Structured failures returned by the transport layer.

use std::time::Duration;
use thiserror::Error;

/// Every way a request can fail once it leaves the transport.
///
/// Callers inspect the variant instead of parsing messages: a rate limit
/// carries its wait hint, an HTTP failure carries status and body.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout and similar.
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// HTTP 403 with `X-RateLimit-Remaining: 0`.
    #[error(
        "Rate limit exceeded, retry in {} seconds. Try again later or set GITHUB_TOKEN environment variable.",
        .retry_after.as_secs()
    )]
    RateLimited { retry_after: Duration },

    /// Non-success status after retries were exhausted or not applicable.
    #[error("HTTP {status} from {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// Body could not be decoded into the expected shape.
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    pub(crate) fn transport(url: &str, error: &reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            format!("timed out ({})", error)
        } else {
            error.to_string()
        };
        FetchError::Transport {
            url: url.to_string(),
            message,
        }
    }

    pub(crate) fn decode(url: &str, error: impl std::fmt::Display) -> Self {
        FetchError::Decode {
            url: url.to_string(),
            message: error.to_string(),
        }
    }

    /// HTTP status associated with the failure, if any.
    ///
    /// A rate limit reports `429 Too Many Requests` regardless of the
    /// status the server actually sent.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            FetchError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Wait hint for rate-limited calls.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
