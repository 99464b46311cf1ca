//! Classifier configuration.
//!
//! Every field is defaulted, so an empty JSON object is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::DispatchConfig;
use crate::diversity::DiversityPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub dispatch: DispatchConfig,
    pub diversity: DiversityPolicy,
    /// Per-call model deadline.
    pub model_timeout_secs: u64,
    /// OpenRouter model ids; one model source each.
    pub models: Vec<String>,
    /// Subjects in flight at once during a batch.
    pub concurrency: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            diversity: DiversityPolicy::default(),
            model_timeout_secs: 20,
            models: Vec::new(),
            concurrency: 4,
        }
    }
}

impl ClassifierConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let weight_ok = |w: f64| w.is_finite() && (0.0..=1.0).contains(&w);
        if !weight_ok(self.dispatch.full_heuristic_weight) {
            return Err(ConfigError::Invalid(format!(
                "dispatch.full_heuristic_weight must be in [0, 1], got {}",
                self.dispatch.full_heuristic_weight
            )));
        }
        if !weight_ok(self.dispatch.hybrid_heuristic_weight) {
            return Err(ConfigError::Invalid(format!(
                "dispatch.hybrid_heuristic_weight must be in [0, 1], got {}",
                self.dispatch.hybrid_heuristic_weight
            )));
        }
        if !(0.0..=100.0).contains(&self.dispatch.uncertainty_threshold) {
            return Err(ConfigError::Invalid(
                "dispatch.uncertainty_threshold must be in [0, 100]".to_string(),
            ));
        }
        if self.dispatch.breaker_threshold == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.breaker_threshold must be at least 1".to_string(),
            ));
        }
        if !(self.diversity.ceiling > 0.0 && self.diversity.ceiling <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "diversity.ceiling must be in (0, 1], got {}",
                self.diversity.ceiling
            )));
        }
        if self.model_timeout_secs == 0 {
            return Err(ConfigError::Invalid("model_timeout_secs must be positive".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.models.iter().any(|m| m.trim().is_empty()) {
            return Err(ConfigError::Invalid("models must not contain blank ids".to_string()));
        }
        Ok(())
    }
}
