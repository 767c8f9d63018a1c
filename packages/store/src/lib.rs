#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sinks that receive persisted records at the end of an ingestion run.
//!
//! The ingest manager only depends on the [`RecordSink`] trait. Two
//! implementations are provided: [`JsonLinesSink`] appends one JSON object
//! per record to a file per endpoint, and [`MemorySink`] keeps records in
//! memory.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use data_flux_schema_models::{Endpoint, PersistedRecord};
use tokio::io::AsyncWriteExt as _;

/// Errors that can occur while persisting records.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for persisted records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Stores `records` in order and returns how many were written.
    ///
    /// An empty slice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the records cannot be written.
    async fn persist(
        &self,
        endpoint: Endpoint,
        records: &[PersistedRecord],
    ) -> Result<u64, StoreError>;
}

/// Appends records to `<dir>/<endpoint>.jsonl`, one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    dir: PathBuf,
}

impl JsonLinesSink {
    /// Creates a sink writing under `dir`. The directory is created on the
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the file `endpoint`'s records are appended to.
    #[must_use]
    pub fn path_for(&self, endpoint: Endpoint) -> PathBuf {
        self.dir.join(format!("{endpoint}.jsonl"))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn persist(
        &self,
        endpoint: Endpoint,
        records: &[PersistedRecord],
    ) -> Result<u64, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let path = self.path_for(endpoint);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        file.write_all(&buffer)
            .await
            .map_err(|e| io_error(&path, e))?;
        file.flush().await.map_err(|e| io_error(&path, e))?;

        log::debug!("Appended {} records to {}", records.len(), path.display());
        Ok(records.len() as u64)
    }
}

/// Keeps persisted records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Endpoint, PersistedRecord)>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything persisted so far, in order.
    #[must_use]
    pub fn records(&self) -> Vec<(Endpoint, PersistedRecord)> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn persist(
        &self,
        endpoint: Endpoint,
        records: &[PersistedRecord],
    ) -> Result<u64, StoreError> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend(records.iter().cloned().map(|record| (endpoint, record)));
        Ok(records.len() as u64)
    }
}
