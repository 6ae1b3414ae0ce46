//! Service configuration.
//!
//! Values come from defaults, then an optional TOML file, then the
//! environment (`HOST`, `PORT`, `MODELS_DIR`), then command-line flags.

use crate::artifacts::ArtifactPaths;
use crate::predictor::ModelLabels;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Interface to bind
    pub host: String,

    /// TCP port to listen on
    pub port: u16,

    /// Directory holding the trained artifacts
    pub models_dir: PathBuf,

    /// `model_used` override for the price model
    pub regression_model_label: Option<String>,

    /// `model_used` override for the condition model
    pub classification_model_label: Option<String>,

    /// Default log filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            models_dir: PathBuf::from("models"),
            regression_model_label: None,
            classification_model_label: None,
            log_filter: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Read a TOML config file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Apply `HOST`, `PORT` and `MODELS_DIR` from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides from an arbitrary lookup.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("invalid PORT value '{port}'"))?;
        }
        if let Some(dir) = lookup("MODELS_DIR") {
            self.models_dir = PathBuf::from(dir);
        }
        Ok(self)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.models_dir)
    }

    pub fn model_labels(&self) -> ModelLabels {
        ModelLabels {
            regression: self.regression_model_label.clone(),
            classification: self.classification_model_label.clone(),
        }
    }
}
