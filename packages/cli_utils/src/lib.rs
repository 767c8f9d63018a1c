#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the data-flux toolchain.
//!
//! Provides an `indicatif`-backed progress bar behind the
//! [`ProgressCallback`] trait, plus [`init_logger`] which sets up
//! `indicatif-log-bridge` so that `log::info!` and friends are suspended
//! while progress bars redraw, and mirrors records into a rotated log file.

pub mod file_log;

use std::sync::Arc;
use std::time::Duration;

use data_flux_client::progress::ProgressCallback;
use file_log::{DEFAULT_LOG_FILE, DEFAULT_MAX_BYTES, RotatingFileLogger};
use indicatif::{ProgressBar, ProgressStyle};
use log::{LevelFilter, Log, Metadata, Record};

pub use indicatif::MultiProgress;

/// Environment variable that switches the default log level to `debug`.
pub const DEV_MODE_VAR: &str = "DEV_MODE";

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once `set_total()` provides a known length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Creates a page progress bar that starts as a spinner while the
    /// endpoint is probed and becomes a full bar once
    /// [`ProgressCallback::set_total()`] reports the page count.
    #[must_use]
    pub fn pages_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} pages {per_sec} [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, bar_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Whether `DEV_MODE=true` is set in the environment.
#[must_use]
pub fn dev_mode() -> bool {
    is_truthy(std::env::var(DEV_MODE_VAR).ok().as_deref())
}

fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Console filter used when `RUST_LOG` is unset: this workspace at `debug`,
/// everything else at `info`.
const DEFAULT_CONSOLE_FILTER: &str = "info,data_flux=debug";

/// The log file records `debug` in dev mode and `info` otherwise.
const fn file_level(dev_mode: bool) -> LevelFilter {
    if dev_mode {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Sends every record to the console logger and, if open, the log file.
struct TeeLogger<C> {
    console: C,
    file: Option<RotatingFileLogger>,
}

impl<C: Log> Log for TeeLogger<C> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.console.enabled(metadata)
            || self.file.as_ref().is_some_and(|file| file.enabled(metadata))
    }

    fn log(&self, record: &Record<'_>) {
        self.console.log(record);
        if let Some(file) = &self.file {
            file.log(record);
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(file) = &self.file {
            file.flush();
        }
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Console output honours `RUST_LOG`, defaulting to `debug` for this
/// workspace. Records are also appended to `logs/ingest_module.log`, which
/// rotates into a zip archive at 1 MB; the file takes `debug` records only
/// when `DEV_MODE=true`.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.trim().is_empty() => builder.parse_filters(&filter),
        _ => builder.parse_filters(DEFAULT_CONSOLE_FILTER),
    };
    let console = builder.build();
    let console_level = console.filter();

    let file_level = file_level(dev_mode());
    let (file, file_error) =
        match RotatingFileLogger::open(DEFAULT_LOG_FILE, DEFAULT_MAX_BYTES, file_level) {
            Ok(file) => (Some(file), None),
            Err(e) => (None, Some(e)),
        };
    let level = file
        .as_ref()
        .map_or(console_level, |file| console_level.max(file.level()));

    indicatif_log_bridge::LogWrapper::new(multi.clone(), TeeLogger { console, file })
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    if let Some(e) = file_error {
        log::warn!("Logging to console only, cannot open {DEFAULT_LOG_FILE}: {e}");
    }

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_mode_requires_literal_true() {
        assert!(is_truthy(Some("true")));
        assert!(is_truthy(Some(" TRUE ")));
        assert!(!is_truthy(Some("1")));
        assert!(!is_truthy(Some("false")));
        assert!(!is_truthy(None));
    }

    #[test]
    fn file_level_follows_dev_mode() {
        assert_eq!(file_level(true), LevelFilter::Debug);
        assert_eq!(file_level(false), LevelFilter::Info);
    }

    #[test]
    fn tee_writes_file_even_when_console_is_silent() {
        let dir = std::env::temp_dir().join(format!("data_flux_tee_{}", uuid::Uuid::new_v4()));
        let path = dir.join("ingest_module.log");
        let file = RotatingFileLogger::open(&path, DEFAULT_MAX_BYTES, LevelFilter::Info).unwrap();
        let tee = TeeLogger {
            console: SilentLogger,
            file: Some(file),
        };

        let metadata = Metadata::builder()
            .level(log::Level::Info)
            .target("data_flux_ingest")
            .build();
        assert!(tee.enabled(&metadata));
        tee.log(
            &Record::builder()
                .metadata(metadata)
                .args(format_args!("users: persisted 10 records"))
                .build(),
        );
        tee.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("INFO users: persisted 10 records"));
        std::fs::remove_dir_all(&dir).ok();
    }

    struct SilentLogger;

    impl Log for SilentLogger {
        fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
            false
        }

        fn log(&self, _record: &Record<'_>) {}

        fn flush(&self) {}
    }

    #[test]
    fn pages_bar_tracks_progress() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let progress = IndicatifProgress::pages_bar(&multi, "users");
        progress.set_total(3);
        progress.inc(1);
        progress.inc(1);
        progress.finish("done".to_string());
    }
}
