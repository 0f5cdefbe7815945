use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::defaults::{clamp_reference_limit, default_bind_addr, default_reference_limit};
use super::map_app_dir_error;
use crate::app_dirs;
use crate::estimator::{AuditPolicy, EstimatorSettings};

/// Settings loaded from `config.toml`.
///
/// Config tables: `server`, `store`, `dataset`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub dataset: DatasetSettings,
}

/// HTTP listener settings.
///
/// Config keys: `bind_addr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Row store and estimator settings.
///
/// Config keys: `database_path`, `reference_limit`, `audit_failure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// SQLite file; defaults to `cropyield.db` in the app root.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Reference rows read per prediction, clamped to `1..=200`.
    #[serde(default = "default_reference_limit")]
    pub reference_limit: usize,
    /// Behavior when the audit row cannot be written.
    #[serde(default)]
    pub audit_failure: AuditPolicy,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            reference_limit: default_reference_limit(),
            audit_failure: AuditPolicy::default(),
        }
    }
}

/// Static dataset files served for display.
///
/// Config keys: `dir`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSettings {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl AppConfig {
    pub(super) fn normalized(mut self) -> Self {
        self.store.reference_limit = clamp_reference_limit(self.store.reference_limit);
        self
    }

    /// Resolve the database path, falling back to the app root default.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.store.database_path {
            Some(path) => Ok(path.clone()),
            None => app_dirs::default_database_path().map_err(map_app_dir_error),
        }
    }

    /// Estimator settings derived from the `store` table.
    pub fn estimator_settings(&self) -> EstimatorSettings {
        EstimatorSettings {
            reference_limit: clamp_reference_limit(self.store.reference_limit),
            audit_policy: self.store.audit_failure,
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// No platform config directory could be resolved.
    #[error("No suitable config directory available")]
    NoConfigDir,
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config file is not valid TOML for these settings.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
}
