//! Drives one ingestion run end to end.
//!
//! An [`IngestManager`] moves through `Unconfigured → Configured →
//! Complete` exactly once. [`configure`](IngestManager::configure) probes
//! page 1 to learn the record count and build the executor;
//! [`run`](IngestManager::run) fans out, validates, reports throughput and
//! optionally persists.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use data_flux_client::progress::{ProgressCallback, null_progress};
use data_flux_client::{PageFetcher, PageQuery};
use data_flux_ingest_models::RunSummary;
use data_flux_schema::{Validator, map_all};
use data_flux_schema_models::{Endpoint, Record};
use data_flux_store::RecordSink;

use crate::IngestError;
use crate::executor::IngestExecutor;
use crate::observer::{IngestObserver, log_observer};

/// What the probe request learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    /// The record count the source reported.
    pub reported_total: u64,
    /// The record count the run will cover.
    pub total_records: u64,
    /// Pages needed to cover `total_records`.
    pub page_count: u64,
}

enum ManagerState<F> {
    Unconfigured,
    Configured {
        executor: IngestExecutor<F>,
        page_size: u64,
    },
    Complete {
        executor: IngestExecutor<F>,
        summary: RunSummary,
    },
}

impl<F> ManagerState<F> {
    const fn name(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured { .. } => "configured",
            Self::Complete { .. } => "complete",
        }
    }
}

/// Orchestrates probe, fan-out, validation, mapping and persistence for one
/// endpoint.
pub struct IngestManager<F> {
    client: Arc<F>,
    endpoint: Endpoint,
    version_id: NonZeroU64,
    sink: Arc<dyn RecordSink>,
    max_concurrency: Option<usize>,
    observer: Arc<dyn IngestObserver>,
    progress: Arc<dyn ProgressCallback>,
    state: ManagerState<F>,
}

impl<F: PageFetcher> IngestManager<F> {
    /// Creates an unconfigured manager.
    #[must_use]
    pub fn new(
        client: Arc<F>,
        endpoint: Endpoint,
        version_id: NonZeroU64,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            client,
            endpoint,
            version_id,
            sink,
            max_concurrency: None,
            observer: log_observer(),
            progress: null_progress(),
            state: ManagerState::Unconfigured,
        }
    }

    /// Caps in-flight page requests for the run.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Sets the event sink shared with the executor.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the progress reporter handed to the executor.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Probes page 1, computes the page count and builds the executor.
    ///
    /// `total` overrides the record count the source reports, letting the
    /// caller cap the run. A total of 0 yields a run with no requests.
    ///
    /// # Errors
    ///
    /// * [`IngestError::InvalidPageSize`] if `page_size` is 0
    /// * [`IngestError::InvalidState`] if the manager is already configured
    /// * [`IngestError::Connectivity`] if the probe request fails
    /// * [`IngestError::ProtocolValidation`] if the probe response is
    ///   malformed
    ///
    /// On error the manager stays unconfigured.
    pub async fn configure(
        &mut self,
        page_size: u64,
        total: Option<u64>,
    ) -> Result<ProbeReport, IngestError> {
        if !matches!(self.state, ManagerState::Unconfigured) {
            return Err(IngestError::InvalidState {
                action: "configure",
                state: self.state.name(),
            });
        }
        if page_size == 0 {
            return Err(IngestError::InvalidPageSize);
        }

        let endpoint = self.endpoint;
        let validator = Validator::for_kind(endpoint.record_kind());

        let raw = match self
            .client
            .fetch(
                endpoint,
                PageQuery {
                    page: 1,
                    size: page_size,
                },
            )
            .await
        {
            Ok(raw) => raw,
            Err(source) => {
                self.observer.probe_failed(endpoint, &source);
                return Err(IngestError::Connectivity { endpoint, source });
            }
        };

        let probe = match validator.validate(&raw) {
            Ok(probe) => probe,
            Err(source) => {
                self.observer.probe_invalid(endpoint, &source);
                return Err(IngestError::ProtocolValidation { endpoint, source });
            }
        };

        let total_records = total.unwrap_or(probe.total);
        let page_count = total_records.div_ceil(page_size);
        self.observer.configured(endpoint, total_records, page_count);

        let executor = IngestExecutor::new(Arc::clone(&self.client), validator, page_count)
            .with_max_concurrency(self.max_concurrency)
            .with_observer(Arc::clone(&self.observer))
            .with_progress(Arc::clone(&self.progress));
        self.state = ManagerState::Configured {
            executor,
            page_size,
        };

        Ok(ProbeReport {
            reported_total: probe.total,
            total_records,
            page_count,
        })
    }

    /// Fetches and validates every configured page, reports throughput and,
    /// if `persist` is set, maps the validated records and hands them to
    /// the sink.
    ///
    /// Per-page failures never surface here; they only reduce the yield.
    /// The manager is complete afterwards, even if persisting failed.
    ///
    /// # Errors
    ///
    /// * [`IngestError::InvalidState`] if the manager is not configured
    /// * [`IngestError::Store`] if the sink rejects the records
    pub async fn run(&mut self, persist: bool) -> Result<RunSummary, IngestError> {
        let (mut executor, page_size) =
            match std::mem::replace(&mut self.state, ManagerState::Unconfigured) {
                ManagerState::Configured {
                    executor,
                    page_size,
                } => (executor, page_size),
                other => {
                    let state = other.name();
                    self.state = other;
                    return Err(IngestError::InvalidState {
                        action: "run",
                        state,
                    });
                }
            };

        let started_at = Utc::now();
        let start = Instant::now();
        executor.execute(self.endpoint, page_size, 1).await;
        executor.validate_all();
        let elapsed = start.elapsed();

        let mut summary = RunSummary {
            endpoint: self.endpoint,
            version_id: self.version_id,
            page_size,
            page_count: executor.page_count(),
            pages: executor.stats(),
            records_persisted: 0,
            started_at,
            elapsed,
        };
        self.observer.run_complete(&summary);

        let persisted = if persist {
            self.persist(executor.validated_records()).await
        } else {
            Ok(0)
        };
        summary.records_persisted = persisted.as_ref().map_or(0, |count| *count);

        self.state = ManagerState::Complete {
            executor,
            summary: summary.clone(),
        };
        persisted?;

        Ok(summary)
    }

    async fn persist(&self, records: &[Record]) -> Result<u64, IngestError> {
        if records.is_empty() {
            log::info!("{}: no validated records to persist", self.endpoint);
            return Ok(0);
        }

        let persisted = map_all(records, self.version_id);
        let count = self.sink.persist(self.endpoint, &persisted).await?;
        self.observer.persisted(self.endpoint, count);
        Ok(count)
    }

    /// Whether [`configure`](Self::configure) has succeeded.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        !matches!(self.state, ManagerState::Unconfigured)
    }

    /// The executor, once configured.
    #[must_use]
    pub const fn executor(&self) -> Option<&IngestExecutor<F>> {
        match &self.state {
            ManagerState::Unconfigured => None,
            ManagerState::Configured { executor, .. } | ManagerState::Complete { executor, .. } => {
                Some(executor)
            }
        }
    }

    /// The summary of the completed run.
    #[must_use]
    pub const fn summary(&self) -> Option<&RunSummary> {
        match &self.state {
            ManagerState::Complete { summary, .. } => Some(summary),
            _ => None,
        }
    }
}
