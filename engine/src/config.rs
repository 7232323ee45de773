use std::fs;

use serde::{Deserialize, Serialize};

use crate::{errors::EngineError, operators::DEFAULT_ACCURACY};

/// Concurrency strategy for the engine runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Concurrency {
    /// Single-threaded deterministic execution.
    Single,
    /// Rayon work-stealing pool with the specified number of workers.
    Rayon { workers: usize },
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::Rayon {
            workers: num_cpus::get().max(1),
        }
    }
}

/// Stencil construction defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StencilConfig {
    #[serde(default = "default_accuracy")]
    pub default_accuracy: usize,
    /// Share built stencil sets across requests.
    #[serde(default = "default_cache")]
    pub cache: bool,
}

const fn default_accuracy() -> usize {
    DEFAULT_ACCURACY
}

const fn default_cache() -> bool {
    true
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            default_accuracy: default_accuracy(),
            cache: default_cache(),
        }
    }
}

/// Input/output options for loading batches and writing reports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct IoConfig {
    pub batch: Option<String>,
    pub outputs: Option<String>,
}

/// Engine configuration loaded from TOML/YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub concurrency: Concurrency,
    #[serde(default)]
    pub stencil: StencilConfig,
    #[serde(default)]
    pub io: IoConfig,
}

impl EngineConfig {
    /// Load a configuration from a TOML file on disk.
    pub fn from_toml_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, EngineError> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&raw)?;
        Ok(cfg)
    }

    /// Load a configuration from a YAML file on disk.
    pub fn from_yaml_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, EngineError> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = serde_yaml::from_str(&raw)?;
        Ok(cfg)
    }

    /// Pick the loader from the file extension, defaulting to TOML.
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, EngineError> {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_path(path),
            _ => Self::from_toml_path(path),
        }
    }
}
