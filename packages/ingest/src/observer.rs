//! Event sink for ingestion runs.
//!
//! Components receive an [`IngestObserver`] at construction instead of
//! logging through a process-wide handle, so callers decide where events
//! go. [`LogObserver`] forwards everything to the `log` facade.

use std::sync::Arc;

use data_flux_client::FetchError;
use data_flux_ingest_models::RunSummary;
use data_flux_schema::ValidationFailure;
use data_flux_schema_models::{Endpoint, PageEnvelope};

/// Receives the notable events of a configure/run cycle.
pub trait IngestObserver: Send + Sync {
    /// The probe request could not be completed.
    fn probe_failed(&self, endpoint: Endpoint, error: &FetchError);

    /// The probe response did not match the page schema.
    fn probe_invalid(&self, endpoint: Endpoint, failure: &ValidationFailure);

    /// The manager computed its page count.
    fn configured(&self, endpoint: Endpoint, total_records: u64, page_count: u64);

    /// A page fetched and validated.
    fn page_validated(&self, page: u64, envelope: &PageEnvelope);

    /// A page fetch failed. The page contributes no records.
    fn page_fetch_failed(&self, page: u64, error: &FetchError);

    /// A fetched page failed validation. The page contributes no records.
    fn page_invalid(&self, page: u64, failure: &ValidationFailure);

    /// Fetching and validation finished.
    fn run_complete(&self, summary: &RunSummary);

    /// Records were handed to the sink.
    fn persisted(&self, endpoint: Endpoint, count: u64);
}

/// Forwards observer events to the `log` facade.
pub struct LogObserver;

impl IngestObserver for LogObserver {
    fn probe_failed(&self, endpoint: Endpoint, error: &FetchError) {
        log::error!("Probe request to {endpoint} failed: {error}");
    }

    fn probe_invalid(&self, endpoint: Endpoint, failure: &ValidationFailure) {
        log::error!("Probe response from {endpoint} is malformed: {failure}");
    }

    fn configured(&self, endpoint: Endpoint, total_records: u64, page_count: u64) {
        log::info!("{endpoint}: {total_records} records across {page_count} page(s)");
    }

    fn page_validated(&self, page: u64, envelope: &PageEnvelope) {
        log::debug!(
            "Page {page}: total={}, page={}, size={}, pages={}, items={}",
            envelope.total,
            envelope.page,
            envelope.size,
            envelope.pages,
            envelope.items.len()
        );
    }

    fn page_fetch_failed(&self, page: u64, error: &FetchError) {
        log::warn!("Page {page} skipped, fetch failed: {error}");
    }

    fn page_invalid(&self, page: u64, failure: &ValidationFailure) {
        log::error!("Page {page} skipped, validation failed: {failure}");
    }

    fn run_complete(&self, summary: &RunSummary) {
        log::info!(
            "{}: {} records from {}/{} page(s) ({} failed, {} invalid) in {:.2}s \
             ({:.1} requests/s, {:.1} records/s)",
            summary.endpoint,
            summary.pages.records,
            summary.pages.succeeded,
            summary.pages.requested,
            summary.pages.failed,
            summary.pages.invalid,
            summary.elapsed.as_secs_f64(),
            summary.requests_per_second(),
            summary.records_per_second(),
        );
    }

    fn persisted(&self, endpoint: Endpoint, count: u64) {
        log::info!("{endpoint}: persisted {count} records");
    }
}

/// Returns a shared [`LogObserver`].
#[must_use]
pub fn log_observer() -> Arc<dyn IngestObserver> {
    Arc::new(LogObserver)
}
