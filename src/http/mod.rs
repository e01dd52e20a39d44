//! HTTP client module with retry logic, pagination and error handling.

mod client;
mod error;
mod paginate;
mod response;
mod retry;

pub use client::{DEFAULT_API_URL, HttpClient, REQUEST_TIMEOUT};
pub use error::FetchError;
pub use response::HttpResponse;
pub use retry::{BACKOFF_FACTOR, MAX_ATTEMPTS, RETRY_STATUSES, RetryPolicy, with_retry};
