//! Walks `Link: <...>; rel="next"` cursors.

use log::{debug, warn};
use serde_json::Value;

use super::client::HttpClient;
use super::error::FetchError;

impl HttpClient {
    /// Collects every item of a paginated endpoint, in server order.
    ///
    /// `params` are sent with the first request only; later requests use the
    /// cursor URL verbatim. A non-array page contributes itself as one item.
    #[tracing::instrument(skip(self, params))]
    pub async fn paginate(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Value>, FetchError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        let mut query = Some(params);
        let mut page = 1;

        while let Some(current) = next {
            debug!("Fetching page {} from {}...", page, current);

            let response = self.get(&current, query.take()).await?;
            match response.json::<Value>(&current)? {
                Value::Array(list) => items.extend(list),
                other => items.push(other),
            }

            next = response.next_link();
            if next.as_deref() == Some(current.as_str()) {
                warn!("Pagination cursor points back to {}, stopping", current);
                break;
            }
            page += 1;
        }

        debug!("Collected {} items over {} pages", items.len(), page);
        Ok(items)
    }
}
