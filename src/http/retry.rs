//! Retry policy for transient HTTP failures.

use log::{debug, warn};
use reqwest::{Method, StatusCode};
use std::future::Future;
use std::time::Duration;

use super::error::FetchError;
use super::response::HttpResponse;

/// Total attempts per request, including the first one.
pub const MAX_ATTEMPTS: usize = 3;

/// Base of the exponential backoff between attempts.
pub const BACKOFF_FACTOR: Duration = Duration::from_secs(1);

/// Statuses worth another attempt.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Which requests are retried, how often, and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff_factor: Duration,
    pub allowed_methods: Vec<Method>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff_factor: BACKOFF_FACTOR,
            allowed_methods: vec![Method::GET],
        }
    }
}

impl RetryPolicy {
    /// Policy that also retries POST, PATCH and DELETE.
    pub fn write_capable() -> Self {
        Self {
            allowed_methods: vec![Method::GET, Method::POST, Method::PATCH, Method::DELETE],
            ..Self::default()
        }
    }

    pub fn with_backoff_factor(mut self, factor: Duration) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.allowed_methods.contains(method)
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRY_STATUSES.contains(&status.as_u16())
    }

    /// Delay after the given (1-based) failed attempt: `factor * 2^(attempt-1)`.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.backoff_factor.saturating_mul(1u32 << exponent)
    }
}

/// Runs `operation` until it yields a non-retryable outcome or the budget is spent.
///
/// The final outcome is returned as is: a retryable status that survives the
/// last attempt comes back as `Ok` and is classified by the caller.
pub async fn with_retry<F, Fut>(
    policy: &RetryPolicy,
    method: &Method,
    url: &str,
    operation: F,
) -> Result<HttpResponse, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<HttpResponse, FetchError>>,
{
    let retry_allowed = policy.allows(method);
    let mut attempt = 1;

    loop {
        let outcome = operation().await;

        let reason = match &outcome {
            Ok(response) if RetryPolicy::is_retryable_status(response.status) => {
                Some(format!("HTTP {}", response.status.as_u16()))
            }
            Err(e @ FetchError::Transport { .. }) => Some(e.to_string()),
            _ => None,
        };

        let Some(reason) = reason else {
            return outcome;
        };

        if !retry_allowed {
            debug!("{} {}: {} ({} is not retried)", method, url, reason, method);
            return outcome;
        }

        if attempt >= policy.max_attempts {
            warn!(
                "{} {}: giving up after {} attempts ({})",
                method, url, attempt, reason
            );
            return outcome;
        }

        let delay = policy.backoff(attempt);
        warn!(
            "{} {}: attempt {}/{} failed ({}), retrying in {}ms...",
            method,
            url,
            attempt,
            policy.max_attempts,
            reason,
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default().with_backoff_factor(Duration::from_millis(1))
    }

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: String::new(),
        }
    }

    /// Replays `statuses` in order, one per attempt, counting calls.
    async fn run_script(
        policy: &RetryPolicy,
        method: Method,
        statuses: &[u16],
    ) -> (Result<HttpResponse, FetchError>, usize) {
        let calls = Arc::new(AtomicUsize::new(0));
        let statuses = statuses.to_vec();
        let result = with_retry(policy, &method, "http://test", || {
            let calls = Arc::clone(&calls);
            let statuses = statuses.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok(response(statuses[n.min(statuses.len() - 1)]))
            }
        })
        .await;
        (result, calls.load(Ordering::SeqCst))
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_factor, Duration::from_secs(1));
        assert!(policy.allows(&Method::GET));
        assert!(!policy.allows(&Method::POST));
    }

    #[test]
    fn test_write_capable_policy() {
        let policy = RetryPolicy::write_capable();
        for method in [Method::GET, Method::POST, Method::PATCH, Method::DELETE] {
            assert!(policy.allows(&method));
        }
        assert!(!policy.allows(&Method::PUT));
    }

    #[test]
    fn test_backoff_is_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn test_retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            assert!(RetryPolicy::is_retryable_status(
                StatusCode::from_u16(status).unwrap()
            ));
        }
        for status in [200, 400, 401, 403, 404, 501] {
            assert!(!RetryPolicy::is_retryable_status(
                StatusCode::from_u16(status).unwrap()
            ));
        }
    }

    #[tokio::test]
    async fn test_with_retry_recovers_after_two_failures() {
        let (result, calls) = run_script(&fast_policy(), Method::GET, &[500, 500, 200]).await;
        assert_eq!(result.unwrap().status, StatusCode::OK);
        assert_eq!(calls, 3);
    }

    #[test_log::test(tokio::test)]
    async fn test_with_retry_stops_after_three_attempts() {
        let (result, calls) =
            run_script(&fast_policy(), Method::GET, &[500, 500, 500, 500]).await;
        assert_eq!(result.unwrap().status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls, MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_with_retry_returns_non_retryable_status_immediately() {
        let (result, calls) = run_script(&fast_policy(), Method::GET, &[404, 200]).await;
        assert_eq!(result.unwrap().status, StatusCode::NOT_FOUND);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_with_retry_skips_methods_outside_allow_list() {
        let (result, calls) = run_script(&fast_policy(), Method::POST, &[503, 200]).await;
        assert_eq!(result.unwrap().status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(calls, 1);

        let policy = RetryPolicy::write_capable().with_backoff_factor(Duration::from_millis(1));
        let (result, calls) = run_script(&policy, Method::POST, &[503, 200]).await;
        assert_eq!(result.unwrap().status, StatusCode::OK);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_with_retry_retries_transport_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = with_retry(&fast_policy(), &Method::GET, "http://test", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<HttpResponse, _>(FetchError::Transport {
                    url: "http://test".into(),
                    message: "connection reset".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(FetchError::Transport { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_decode_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = with_retry(&fast_policy(), &Method::GET, "http://test", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<HttpResponse, _>(FetchError::decode("http://test", "bad body"))
            }
        })
        .await;

        assert!(matches!(result, Err(FetchError::Decode { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
