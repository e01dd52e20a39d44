//! HTTP client with built-in retry logic and error handling.

use anyhow::Result;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::error::FetchError;
use super::response::HttpResponse;
use super::retry::{RetryPolicy, with_retry};

/// Default REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Per-attempt request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github.v3+json";

/// HTTP client with built-in retry logic for network operations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    /// Builds a client that sends the API `Accept` header and, when a token is
    /// given, `Authorization: token <token>`.
    pub fn with_token(token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));

        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut auth_value = HeaderValue::from_str(&format!("token {}", token))?;
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
            debug!("Using token for authentication: {}", mask_token(token));
        }

        let client = Client::builder()
            .user_agent(concat!("ghsum/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self::new(client))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Issues a request, retrying transient failures per the policy.
    ///
    /// Rate limits, non-success statuses and transport errors come back as
    /// [`FetchError`]; nothing panics past this point.
    #[tracing::instrument(skip(self, query, body))]
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        query: Option<&[(String, String)]>,
        body: Option<&Value>,
    ) -> Result<HttpResponse, FetchError> {
        debug!("{} {} (query: {:?})...", method, url, query);

        let response = with_retry(&self.policy, &method, url, || {
            self.send_once(method.clone(), url, query, body)
        })
        .await?;

        response.into_result(url)
    }

    /// Single attempt without retry.
    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: Option<&[(String, String)]>,
        body: Option<&Value>,
    ) -> Result<HttpResponse, FetchError> {
        let mut request = self.client.request(method, url);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::transport(url, &e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::transport(url, &e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn get(
        &self,
        url: &str,
        query: Option<&[(String, String)]>,
    ) -> Result<HttpResponse, FetchError> {
        self.request(Method::GET, url, query, None).await
    }

    /// Performs a GET request and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: Option<&[(String, String)]>,
    ) -> Result<T, FetchError> {
        self.get(url, query).await?.json(url)
    }

    /// Performs a GET request and returns the raw body.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.get(url, None).await?.body)
    }

    /// POST/PATCH/DELETE with an optional JSON body.
    ///
    /// An empty response body decodes to `Value::Null`.
    pub async fn send_json(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, FetchError> {
        let response = self.request(method, url, None, body).await?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        response.json(url)
    }
}

/// Shows only the first and last characters of a secret.
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
