//! Layered loading of [`IngestSettings`].
//!
//! Settings start from their defaults, are overridden by an optional TOML
//! file, then by `DATA_FLUX_*` environment variables. Command-line flags
//! are applied last by the binary.

use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use data_flux_ingest_models::IngestSettings;
use data_flux_schema_models::Endpoint;

pub const ENV_BASE_URL: &str = "DATA_FLUX_BASE_URL";
pub const ENV_VERSION_ID: &str = "DATA_FLUX_VERSION_ID";
pub const ENV_ENDPOINT: &str = "DATA_FLUX_ENDPOINT";
pub const ENV_REQUEST_SIZE: &str = "DATA_FLUX_REQUEST_SIZE";
pub const ENV_MAX_CONCURRENCY: &str = "DATA_FLUX_MAX_CONCURRENCY";
pub const ENV_TOTAL: &str = "DATA_FLUX_TOTAL";
pub const ENV_TIMEOUT_SECS: &str = "DATA_FLUX_TIMEOUT_SECS";
pub const ENV_OUTPUT_DIR: &str = "DATA_FLUX_OUTPUT_DIR";

/// Errors that can occur while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`IngestSettings`].
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A setting holds a value it cannot take.
    #[error("Invalid value {value:?} for {key}: {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

/// Builds settings from defaults, an optional TOML file and the process
/// environment.
///
/// # Errors
///
/// * If the file cannot be read or parsed
/// * If an environment variable holds an invalid value
pub fn load(path: Option<&Path>) -> Result<IngestSettings, ConfigError> {
    let mut settings = match path {
        Some(path) => load_file(path)?,
        None => IngestSettings::default(),
    };
    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

/// Reads settings from a TOML file. Missing keys keep their defaults.
///
/// # Errors
///
/// * If the file cannot be read or parsed
pub fn load_file(path: &Path) -> Result<IngestSettings, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = parse(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Parses settings from TOML text.
///
/// # Errors
///
/// * If the text is not valid TOML or holds values of the wrong type
pub fn parse(contents: &str) -> Result<IngestSettings, toml::de::Error> {
    toml::from_str(contents)
}

/// Overrides `settings` with any `DATA_FLUX_*` variables `lookup` returns.
///
/// Empty values are ignored.
///
/// # Errors
///
/// * If a variable cannot be parsed into its setting
pub fn apply_env(
    settings: &mut IngestSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = get(ENV_BASE_URL) {
        settings.base_url = value;
    }
    if let Some(value) = get(ENV_VERSION_ID) {
        settings.version_id = parse_value::<NonZeroU64>(ENV_VERSION_ID, &value)?;
    }
    if let Some(value) = get(ENV_ENDPOINT) {
        settings.endpoint = parse_value::<Endpoint>(ENV_ENDPOINT, &value)?;
    }
    if let Some(value) = get(ENV_REQUEST_SIZE) {
        settings.request_size = positive(ENV_REQUEST_SIZE, &value)?;
    }
    if let Some(value) = get(ENV_MAX_CONCURRENCY) {
        settings.max_concurrency = Some(parse_value::<usize>(ENV_MAX_CONCURRENCY, &value)?);
    }
    if let Some(value) = get(ENV_TOTAL) {
        settings.total = Some(parse_value::<u64>(ENV_TOTAL, &value)?);
    }
    if let Some(value) = get(ENV_TIMEOUT_SECS) {
        settings.timeout_secs = positive(ENV_TIMEOUT_SECS, &value)?;
    }
    if let Some(value) = get(ENV_OUTPUT_DIR) {
        settings.output_dir = PathBuf::from(value);
    }

    Ok(())
}

/// Checks values that parsing alone cannot rule out.
///
/// # Errors
///
/// * If `request_size` or `timeout_secs` is 0
pub fn validate(settings: &IngestSettings) -> Result<(), ConfigError> {
    if settings.request_size == 0 {
        return Err(ConfigError::InvalidValue {
            key: "request_size".to_string(),
            value: "0".to_string(),
            message: "must be greater than 0".to_string(),
        });
    }
    if settings.timeout_secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: "timeout_secs".to_string(),
            value: "0".to_string(),
            message: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            message: e.to_string(),
        })
}

fn positive(key: &str, value: &str) -> Result<u64, ConfigError> {
    parse_value::<NonZeroU64>(key, value).map(NonZeroU64::get)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let settings = parse(
            r#"
            base_url = "http://api.example.com/"
            endpoint = "tracks"
            request_size = 250
            max_concurrency = 4
            "#,
        )
        .unwrap();

        assert_eq!(settings.base_url, "http://api.example.com/");
        assert_eq!(settings.endpoint, Endpoint::Tracks);
        assert_eq!(settings.request_size, 250);
        assert_eq!(settings.max_concurrency, Some(4));
        assert_eq!(settings.version_id.get(), 1);
        assert_eq!(settings.timeout_secs, 30);
        assert!(settings.persist);
    }

    #[test]
    fn endpoint_path_is_accepted_in_file() {
        let settings = parse(r#"endpoint = "/users""#).unwrap();
        assert_eq!(settings.endpoint, Endpoint::Users);
    }

    #[test]
    fn zero_version_in_file_is_rejected() {
        assert!(parse("version_id = 0").is_err());
    }

    #[test]
    fn unknown_endpoint_in_file_is_rejected() {
        assert!(parse(r#"endpoint = "albums""#).is_err());
    }

    #[test]
    fn environment_overrides_settings() {
        let mut settings = IngestSettings::default();
        apply_env(
            &mut settings,
            env(&[
                (ENV_BASE_URL, "http://ingest:9000"),
                (ENV_VERSION_ID, "5"),
                (ENV_ENDPOINT, "/users"),
                (ENV_REQUEST_SIZE, "50"),
                (ENV_MAX_CONCURRENCY, "8"),
                (ENV_TOTAL, "1000"),
                (ENV_TIMEOUT_SECS, "10"),
                (ENV_OUTPUT_DIR, "/tmp/out"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.base_url, "http://ingest:9000");
        assert_eq!(settings.version_id.get(), 5);
        assert_eq!(settings.endpoint, Endpoint::Users);
        assert_eq!(settings.request_size, 50);
        assert_eq!(settings.max_concurrency, Some(8));
        assert_eq!(settings.total, Some(1000));
        assert_eq!(settings.timeout_secs, 10);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn empty_variables_are_ignored() {
        let mut settings = IngestSettings::default();
        apply_env(&mut settings, env(&[(ENV_ENDPOINT, "  ")])).unwrap();
        assert_eq!(settings, IngestSettings::default());
    }

    #[test]
    fn invalid_variable_names_the_key() {
        let mut settings = IngestSettings::default();
        let err = apply_env(&mut settings, env(&[(ENV_REQUEST_SIZE, "0")])).unwrap_err();
        let ConfigError::InvalidValue { key, value, .. } = &err else {
            panic!("expected invalid value, got {err:?}");
        };
        assert_eq!(key, ENV_REQUEST_SIZE);
        assert_eq!(value, "0");
        assert!(err.to_string().contains(ENV_REQUEST_SIZE));
    }

    #[test]
    fn validate_rejects_zero_request_size() {
        let settings = IngestSettings {
            request_size: 0,
            ..IngestSettings::default()
        };
        assert!(matches!(validate(&settings), Err(ConfigError::InvalidValue { .. })));
        assert!(validate(&IngestSettings::default()).is_ok());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = std::env::temp_dir().join(format!(
            "data_flux_missing_{}.toml",
            std::process::id()
        ));
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("data_flux_missing_"));
    }

    #[test]
    fn unknown_endpoint_variable_reports_parse_error() {
        let mut settings = IngestSettings::default();
        let err = apply_env(&mut settings, env(&[(ENV_ENDPOINT, "albums")])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(ENV_ENDPOINT));
        assert!(message.contains("albums"));
    }
}
