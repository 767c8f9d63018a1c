#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion settings, page statistics, and run summary types.

use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use data_flux_schema_models::Endpoint;
use serde::{Deserialize, Serialize};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default page size.
pub const DEFAULT_REQUEST_SIZE: u64 = 100;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration values consumed by the ingest manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// API root, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Pipeline revision stamped on every persisted record.
    pub version_id: NonZeroU64,
    /// Which endpoint to page through.
    pub endpoint: Endpoint,
    /// Records requested per page.
    pub request_size: u64,
    /// Maximum in-flight page requests. `None` fans out every page at once.
    pub max_concurrency: Option<usize>,
    /// Caps ingestion below the total the source reports.
    pub total: Option<u64>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Directory persisted records are written to.
    pub output_dir: PathBuf,
    /// Whether validated records are handed to the sink.
    pub persist: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            version_id: NonZeroU64::MIN,
            endpoint: Endpoint::ListenHistory,
            request_size: DEFAULT_REQUEST_SIZE,
            max_concurrency: None,
            total: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output_dir: PathBuf::from("data"),
            persist: true,
        }
    }
}

/// Per-page outcome counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStats {
    /// Page requests issued.
    pub requested: u64,
    /// Pages that fetched and validated.
    pub succeeded: u64,
    /// Pages whose fetch failed.
    pub failed: u64,
    /// Pages that fetched but failed validation.
    pub invalid: u64,
    /// Records accumulated from succeeded pages.
    pub records: u64,
}

/// Result of a completed ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// The endpoint that was ingested.
    pub endpoint: Endpoint,
    /// The pipeline revision records were stamped with.
    pub version_id: NonZeroU64,
    /// Records requested per page.
    pub page_size: u64,
    /// Pages the run was configured for.
    pub page_count: u64,
    /// Per-page outcome counts.
    pub pages: PageStats,
    /// Records handed to the sink. Zero when persistence was not requested.
    pub records_persisted: u64,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall time spent fetching and validating.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Page requests per second over the fetch and validate phase.
    #[must_use]
    pub fn requests_per_second(&self) -> f64 {
        rate(self.pages.requested, self.elapsed)
    }

    /// Validated records per second over the fetch and validate phase.
    #[must_use]
    pub fn records_per_second(&self) -> f64 {
        rate(self.pages.records, self.elapsed)
    }
}

#[allow(clippy::cast_precision_loss)]
fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}
