//! Size-rotated log file.
//!
//! Lines are appended as `{time} {level} {message}`. Once a write would
//! push the file past its size limit, the current file is compressed into
//! `<stem>.<timestamp>.log.zip` next to it and a fresh file is started.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};

/// Where [`crate::init_logger`] writes its log file.
pub const DEFAULT_LOG_FILE: &str = "logs/ingest_module.log";

/// Size at which the log file is rotated.
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

/// Target prefix of this workspace's crates. Debug and trace records from
/// other targets (HTTP internals) are kept out of the file.
const WORKSPACE_TARGET: &str = "data_flux";

struct Current {
    file: File,
    written: u64,
}

/// A [`Log`] implementation appending to a size-rotated file.
pub struct RotatingFileLogger {
    path: PathBuf,
    max_bytes: u64,
    level: LevelFilter,
    current: Mutex<Current>,
}

impl RotatingFileLogger {
    /// Opens (or creates) `path` for appending, creating parent directories.
    ///
    /// # Errors
    ///
    /// * If the directory or file cannot be created
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, level: LevelFilter) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let current = open_append(&path)?;
        Ok(Self {
            path,
            max_bytes,
            level,
            current: Mutex::new(current),
        })
    }

    /// The most verbose level written to the file.
    #[must_use]
    pub const fn level(&self) -> LevelFilter {
        self.level
    }

    /// The active log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line, rotating first if it would exceed the size limit.
    ///
    /// # Errors
    ///
    /// * If writing, compressing or reopening the file fails
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;

        let len = line.len() as u64 + 1;
        if current.written > 0 && current.written + len > self.max_bytes {
            current.file.flush()?;
            self.archive()?;
            *current = open_append(&self.path)?;
        }

        writeln!(current.file, "{line}")?;
        current.written += len;
        Ok(())
    }

    /// Compresses the active file into a timestamped archive and removes it.
    fn archive(&self) -> io::Result<()> {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("log");
        let entry = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("log");
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S_%6f");
        let archive_path = self.path.with_file_name(format!("{stem}.{stamp}.log.zip"));

        let contents = std::fs::read(&self.path)?;
        let mut zip_writer = zip::ZipWriter::new(File::create(&archive_path)?);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        zip_writer.start_file(entry, options).map_err(io::Error::other)?;
        zip_writer.write_all(&contents)?;
        zip_writer.finish().map_err(io::Error::other)?;

        std::fs::remove_file(&self.path)
    }
}

fn open_append(path: &Path) -> io::Result<Current> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let written = file.metadata()?.len();
    Ok(Current { file, written })
}

impl Log for RotatingFileLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
            && (metadata.level() <= log::Level::Info
                || metadata.target().starts_with(WORKSPACE_TARGET))
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} {} {}",
            Local::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false),
            record.level(),
            record.args()
        );
        // Nowhere left to report a failing log sink.
        self.write_line(&line).ok();
    }

    fn flush(&self) {
        if let Ok(mut current) = self.current.lock() {
            current.file.flush().ok();
        }
    }
}
