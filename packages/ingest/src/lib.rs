#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for ingesting paginated API data into versioned records.
//!
//! The [`IngestManager`](manager::IngestManager) probes an endpoint to learn
//! how many pages it holds, hands the page range to an
//! [`IngestExecutor`](executor::IngestExecutor) for concurrent fetching and
//! validation, then maps the surviving records and persists them.

pub mod config;
pub mod executor;
pub mod manager;
pub mod observer;

#[cfg(test)]
mod test_support;

use data_flux_client::FetchError;
use data_flux_schema::ValidationFailure;
use data_flux_schema_models::Endpoint;
use data_flux_store::StoreError;

pub use executor::{IngestExecutor, PageFetch};
pub use manager::{IngestManager, ProbeReport};
pub use observer::{IngestObserver, LogObserver, log_observer};

/// Errors that abort an ingestion run.
///
/// Failures of individual pages are not represented here; they are reported
/// to the [`IngestObserver`] and reduce the run's yield.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The probe request could not be completed.
    #[error("failed to reach {endpoint}: {source}")]
    Connectivity {
        /// The endpoint being probed.
        endpoint: Endpoint,
        /// Underlying transport failure.
        source: FetchError,
    },
    /// The probe response did not match the expected envelope.
    #[error("{endpoint} returned an unexpected response: {source}")]
    ProtocolValidation {
        /// The endpoint being probed.
        endpoint: Endpoint,
        /// Every violation found in the probe response.
        source: ValidationFailure,
    },
    /// Requested page size was zero.
    #[error("page size must be greater than 0")]
    InvalidPageSize,
    /// An operation was called out of order.
    #[error("cannot {action} while {state}")]
    InvalidState {
        /// The rejected operation.
        action: &'static str,
        /// The manager's state at the time.
        state: &'static str,
    },
    /// The sink rejected the mapped records.
    #[error(transparent)]
    Store(#[from] StoreError),
}
