#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Paginated HTTP transport for the data-flux ingestion pipeline.
//!
//! Provides the [`PageFetcher`] trait the ingest executor fans out over,
//! and [`http::HttpPageFetcher`], its `reqwest` implementation. A fetch
//! either yields the decoded JSON body or a [`FetchError`]; failures never
//! escape as panics and are never retried here.

pub mod http;
pub mod progress;

use std::fmt;

use data_flux_schema_models::Endpoint;
use serde::Serialize;

/// Errors that can occur while fetching a page.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent or timed out.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// The requested URL.
        url: String,
        /// The response status code.
        status: u16,
    },

    /// The response body was not valid JSON.
    #[error("Malformed response from {url}: {message}")]
    MalformedBody {
        /// The requested URL.
        url: String,
        /// Description of the decode failure.
        message: String,
    },

    /// A configured header name or value is not valid HTTP.
    #[error("Invalid header {0}")]
    InvalidHeader(String),
}

/// Query parameters for one page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: u64,
    /// Records per page.
    pub size: u64,
}

impl fmt::Display for PageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page={}, size={}", self.page, self.size)
    }
}

/// Fetches single pages from a paginated API.
///
/// Implementations must map every transport error, non-success status, and
/// undecodable body to a [`FetchError`].
pub trait PageFetcher: Send + Sync {
    /// Fetches one page of `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails, the server responds with
    /// a non-success status, or the body is not JSON.
    fn fetch(
        &self,
        endpoint: Endpoint,
        query: PageQuery,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, FetchError>> + Send;
}
