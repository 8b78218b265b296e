//! Configuration management for mzatlas.
//!
//! Settings come from a TOML file, then environment variables, then CLI
//! flags (applied by the command layer). Every section is optional.
//!
//! ```toml
//! [vision]
//! model = "claude-sonnet-4-20250514"
//! timeout_secs = 120
//!
//! [harvest]
//! dpi = 300
//! confidence_threshold = 70.0
//!
//! [store]
//! path = "maldi_database.csv"
//!
//! [batch]
//! max_concurrency = 2
//! checkpoint_every = 10
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::annotate::DEFAULT_THRESHOLD;
use crate::harvest::DEFAULT_DPI;
use crate::pipeline::BatchOptions;
use crate::store::DEFAULT_STORE_FILENAME;
use crate::vision::VisionConfig;

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILENAME: &str = "mzatlas.toml";

/// Errors loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Figure harvesting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestSettings {
    /// Full-page render resolution
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Minimum classifier confidence to accept a figure
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
}

fn default_dpi() -> u32 {
    DEFAULT_DPI
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            confidence_threshold: default_threshold(),
        }
    }
}

/// Annotation store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// CSV file holding the annotation table
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_FILENAME)
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Batch run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Items processed concurrently
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
    /// Save every N items (0 = only at the end)
    #[serde(default)]
    pub checkpoint_every: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_concurrency(),
            checkpoint_every: 0,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub harvest: HarvestSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub batch: BatchSettings,
}

impl Config {
    /// Load configuration from `explicit`, or from the first discovered
    /// config file, or defaults. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => discover_config_file(),
        };

        let config = match path {
            Some(ref p) => {
                debug!("Loading config from {}", p.display());
                Self::from_file(p)?
            }
            None => Self::default(),
        };

        Ok(config.with_env_overrides())
    }

    /// Parse a config file without applying env overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn with_env_overrides(mut self) -> Self {
        self.vision = self.vision.with_env_overrides();
        self
    }

    /// Batch options derived from this config.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            confidence_threshold: self.harvest.confidence_threshold,
            max_concurrency: self.batch.max_concurrency,
            checkpoint_every: self.batch.checkpoint_every,
            save_figures_to: None,
        }
    }
}

/// Candidate config paths in priority order.
fn candidate_config_paths() -> Vec<PathBuf> {
    [
        Some(PathBuf::from(LOCAL_CONFIG_FILENAME)),
        dirs::config_dir().map(|d| d.join("mzatlas").join("config.toml")),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn discover_config_file() -> Option<PathBuf> {
    candidate_config_paths().into_iter().find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.harvest.dpi, 300);
        assert_eq!(config.harvest.confidence_threshold, 70.0);
        assert_eq!(config.store.path, PathBuf::from("maldi_database.csv"));
        assert_eq!(config.batch.max_concurrency, 1);
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mzatlas.toml");
        std::fs::write(
            &path,
            r#"
[vision]
model = "claude-test"

[harvest]
confidence_threshold = 80.0

[batch]
max_concurrency = 4
checkpoint_every = 5
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.vision.model, "claude-test");
        assert_eq!(config.harvest.confidence_threshold, 80.0);
        assert_eq!(config.harvest.dpi, 300);

        let options = config.batch_options();
        assert_eq!(options.max_concurrency, 4);
        assert_eq!(options.checkpoint_every, 5);
        assert_eq!(options.confidence_threshold, 80.0);
        assert!(options.save_figures_to.is_none());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[harvest]\ndpi = \"high\"").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Toml { .. })
        ));
        assert!(matches!(
            Config::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
