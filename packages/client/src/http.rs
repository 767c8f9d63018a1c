//! `reqwest`-backed [`PageFetcher`].
//!
//! Issues `GET {base_url}{endpoint}?page=N&size=M` and decodes the body as
//! JSON. One [`reqwest::Client`] is built up front and shared by every
//! request, so concurrent page fetches reuse its connection pool.

use std::collections::BTreeMap;
use std::time::Duration;

use data_flux_schema_models::Endpoint;

use crate::{FetchError, PageFetcher, PageQuery};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Configuration for an [`HttpPageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API root, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Additional HTTP headers to include in requests.
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout. A timed-out request is a failed page.
    pub timeout: Duration,
}

impl HttpConfig {
    /// Creates a new `HttpConfig` with JSON headers and the default timeout.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Accept".to_owned(), "application/json".to_owned());
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            headers,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fetches pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPageFetcher {
    /// Builds the shared [`reqwest::Client`] for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidHeader`] for an unusable header and
    /// [`FetchError::Http`] if the client cannot be constructed.
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let mut header_map = reqwest::header::HeaderMap::new();
        for (key, value) in &config.headers {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| FetchError::InvalidHeader(format!("name '{key}': {e}")))?;
            let val = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| FetchError::InvalidHeader(format!("value '{value}': {e}")))?;
            header_map.insert(name, val);
        }

        let client = reqwest::Client::builder()
            .user_agent("data-flux/0.1")
            .default_headers(header_map)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
        })
    }

    /// Returns the full URL for `endpoint`, without query parameters.
    #[must_use]
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    async fn send(&self, url: &str, query: PageQuery) -> Result<serde_json::Value, FetchError> {
        let response = self.client.get(url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            let preview = if text.len() > BODY_PREVIEW_LEN {
                format!("{}...", text.chars().take(BODY_PREVIEW_LEN).collect::<String>())
            } else {
                text.clone()
            };
            log::debug!("Undecodable body from {url} ({} bytes): {preview}", text.len());
            FetchError::MalformedBody {
                url: url.to_owned(),
                message: e.to_string(),
            }
        })
    }
}

impl PageFetcher for HttpPageFetcher {
    async fn fetch(
        &self,
        endpoint: Endpoint,
        query: PageQuery,
    ) -> Result<serde_json::Value, FetchError> {
        let url = self.endpoint_url(endpoint);
        log::debug!("Fetching {url} ({query})");

        let result = self.send(&url, query).await;
        if let Err(e) = &result {
            log::error!("Error making request to {url} with {query}: {e}");
        }
        result
    }
}
