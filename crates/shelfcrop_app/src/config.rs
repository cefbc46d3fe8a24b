//! Run configuration, loaded from a RON file with every field defaulted.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shelfcrop_core::{AspectBounds, GeometricFilter, DEFAULT_CONTAINMENT_THRESHOLD};
use shelfcrop_engine::{FetchSettings, SearchSettings};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub query: String,
    pub output_dir: PathBuf,
    pub crop_dir: PathBuf,
    pub metadata_dir: PathBuf,
    pub batch_size: usize,
    pub aspect_low: f64,
    pub aspect_high: f64,
    pub containment_threshold: f64,
    pub fetch: FetchConfig,
    pub source: SourceConfig,
    pub oracle_endpoint: String,
    pub crop_extension: String,
    pub discard_empty_sources: bool,
    pub persist_fingerprints: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let aspect = AspectBounds::default();
        Self {
            query: String::new(),
            output_dir: PathBuf::from("harvest/images"),
            crop_dir: PathBuf::from("harvest/crops"),
            metadata_dir: PathBuf::from("harvest/metadata"),
            batch_size: 16,
            aspect_low: aspect.low,
            aspect_high: aspect.high,
            containment_threshold: DEFAULT_CONTAINMENT_THRESHOLD,
            fetch: FetchConfig::default(),
            source: SourceConfig::default(),
            oracle_endpoint: "http://127.0.0.1:8000/generate".to_string(),
            crop_extension: "jpg".to_string(),
            discard_empty_sources: true,
            persist_fingerprints: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let settings = FetchSettings::default();
        Self {
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            redirect_limit: settings.redirect_limit,
            max_bytes: settings.max_bytes,
            allowed_content_types: settings.allowed_content_types,
        }
    }
}

/// Search result pages walked when no URL list is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url_template: String,
    pub first_page: usize,
    pub max_pages: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let settings = SearchSettings::default();
        Self {
            url_template: settings.url_template,
            first_page: settings.first_page,
            max_pages: settings.max_pages,
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if !(self.aspect_low > 0.0 && self.aspect_low < self.aspect_high) {
            return Err(ConfigError::Invalid(format!(
                "aspect bounds must satisfy 0 < low < high (got {} and {})",
                self.aspect_low, self.aspect_high
            )));
        }
        if !(self.containment_threshold > 0.0 && self.containment_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "containment_threshold must be in (0, 1] (got {})",
                self.containment_threshold
            )));
        }
        Ok(())
    }

    pub fn geometric_filter(&self) -> GeometricFilter {
        GeometricFilter::new(
            AspectBounds {
                low: self.aspect_low,
                high: self.aspect_high,
            },
            self.containment_threshold,
        )
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_bytes,
            allowed_content_types: self.fetch.allowed_content_types.clone(),
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            url_template: self.source.url_template.clone(),
            first_page: self.source.first_page,
            max_pages: self.source.max_pages,
        }
    }
}

/// Defaults when `path` is `None`.
pub fn load(path: Option<&Path>) -> Result<HarvestConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(HarvestConfig::default());
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{load, HarvestConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_path_gives_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config, HarvestConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.geometric_filter(), shelfcrop_core::GeometricFilter::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("run.ron");
        std::fs::write(
            &path,
            r#"(query: "olive oil bottles", batch_size: 4, fetch: (request_timeout_secs: 5))"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.query, "olive oil bottles");
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.fetch.request_timeout_secs, 5);
        assert_eq!(config.fetch.connect_timeout_secs, 10);
        assert_eq!(config.aspect_high, 5.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = HarvestConfig {
            batch_size: 0,
            ..HarvestConfig::default()
        };
        assert!(config.validate().is_err());

        config.batch_size = 1;
        config.aspect_low = 6.0;
        assert!(config.validate().is_err());

        config.aspect_low = 1.5;
        config.containment_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unreadable_and_malformed_files_error() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(load(Some(&temp.path().join("absent.ron"))).is_err());

        let path = temp.path().join("bad.ron");
        std::fs::write(&path, "(batch_size: \"many\")").unwrap();
        assert!(load(Some(&path)).is_err());
    }
}
