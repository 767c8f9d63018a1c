//! Concurrent page fan-out and per-page validation.
//!
//! [`IngestExecutor::execute`] issues one request per page and keeps one
//! [`PageFetch`] slot per page, in page order, whatever order the requests
//! complete in. [`IngestExecutor::validate_all`] then walks those slots
//! sequentially, so the accumulated state is never touched while requests
//! are in flight.

use std::sync::Arc;

use data_flux_client::progress::{ProgressCallback, null_progress};
use data_flux_client::{FetchError, PageFetcher, PageQuery};
use data_flux_ingest_models::PageStats;
use data_flux_schema::Validator;
use data_flux_schema_models::{Endpoint, Record};
use futures::stream::{self, StreamExt as _};

use crate::observer::{IngestObserver, log_observer};

/// The outcome of fetching one page.
#[derive(Debug)]
pub struct PageFetch {
    /// 1-based page number.
    pub page: u64,
    /// The decoded body, or why it could not be fetched.
    pub result: Result<serde_json::Value, FetchError>,
}

/// Fetches and validates a fixed number of pages.
pub struct IngestExecutor<F> {
    client: Arc<F>,
    validator: Validator,
    page_count: u64,
    max_concurrency: Option<usize>,
    observer: Arc<dyn IngestObserver>,
    progress: Arc<dyn ProgressCallback>,
    raw_results: Vec<PageFetch>,
    validated_records: Vec<Record>,
    stats: PageStats,
}

impl<F: PageFetcher> IngestExecutor<F> {
    /// Creates an executor for `page_count` pages with unbounded fan-out,
    /// logging events and reporting no progress.
    #[must_use]
    pub fn new(client: Arc<F>, validator: Validator, page_count: u64) -> Self {
        Self {
            client,
            validator,
            page_count,
            max_concurrency: None,
            observer: log_observer(),
            progress: null_progress(),
            raw_results: Vec::new(),
            validated_records: Vec::new(),
            stats: PageStats::default(),
        }
    }

    /// Caps the number of in-flight requests. `None` launches every page at
    /// once.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the progress reporter. It receives one increment per completed
    /// request.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Fetches pages `start_page..=page_count` of `endpoint` concurrently
    /// and stores one slot per page, ordered by page number.
    ///
    /// A failed request fills its slot with the error; the batch never
    /// aborts early. A `start_page` of 0 is treated as 1.
    pub async fn execute(
        &mut self,
        endpoint: Endpoint,
        page_size: u64,
        start_page: u64,
    ) -> &[PageFetch] {
        let pages: Vec<u64> = (start_page.max(1)..=self.page_count).collect();
        let limit = self.max_concurrency.unwrap_or(pages.len()).max(1);

        log::info!(
            "Requesting {} page(s) of {endpoint} (size={page_size}, concurrency={limit})",
            pages.len()
        );
        self.progress.set_total(pages.len() as u64);

        let client = &self.client;
        let progress = &self.progress;
        self.raw_results = stream::iter(pages)
            .map(|page| async move {
                let result = client
                    .fetch(
                        endpoint,
                        PageQuery {
                            page,
                            size: page_size,
                        },
                    )
                    .await;
                progress.inc(1);
                PageFetch { page, result }
            })
            .buffered(limit)
            .collect()
            .await;

        self.progress
            .finish(format!("{endpoint}: {} page(s) fetched", self.raw_results.len()));
        &self.raw_results
    }

    /// Validates every stored page in page order and accumulates the
    /// records of the pages that pass.
    ///
    /// Failed fetches and invalid pages are reported to the observer and
    /// skipped; they only reduce the yield.
    pub fn validate_all(&mut self) {
        self.validated_records.clear();
        let mut stats = PageStats {
            requested: self.raw_results.len() as u64,
            ..PageStats::default()
        };

        for fetch in &self.raw_results {
            let raw = match &fetch.result {
                Ok(raw) => raw,
                Err(e) => {
                    stats.failed += 1;
                    self.observer.page_fetch_failed(fetch.page, e);
                    continue;
                }
            };

            match self.validator.validate(raw) {
                Ok(envelope) => {
                    self.observer.page_validated(fetch.page, &envelope);
                    stats.succeeded += 1;
                    stats.records += envelope.items.len() as u64;
                    self.validated_records.extend(envelope.items);
                }
                Err(failure) => {
                    stats.invalid += 1;
                    self.observer.page_invalid(fetch.page, &failure);
                }
            }
        }

        self.stats = stats;
    }

    /// The number of pages this executor was built for.
    #[must_use]
    pub const fn page_count(&self) -> u64 {
        self.page_count
    }

    /// The stored page slots, in page order.
    #[must_use]
    pub fn raw_results(&self) -> &[PageFetch] {
        &self.raw_results
    }

    /// Records from every page that fetched and validated, in page order.
    #[must_use]
    pub fn validated_records(&self) -> &[Record] {
        &self.validated_records
    }

    /// Outcome counts from the last [`validate_all`](Self::validate_all).
    #[must_use]
    pub const fn stats(&self) -> PageStats {
        self.stats
    }
}
