//! Run configuration.
//!
//! Defaults reproduce the batch tool's fixed parameters; a TOML file and
//! command-line flags may override them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BatchError, BatchResult};

/// Parameters shared by every row of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Flat, continuously compounded risk-free rate (0.01 = 1%).
    pub risk_free_rate: f64,

    /// Days per year when converting day counts to year fractions.
    pub day_count_basis: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.01,
            day_count_basis: 365.0,
        }
    }
}

impl BatchConfig {
    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> BatchResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| BatchError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> BatchResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| BatchError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    pub fn validate(&self) -> BatchResult<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(BatchError::config(format!(
                "risk_free_rate must be finite, got {}",
                self.risk_free_rate
            )));
        }
        if !(self.day_count_basis.is_finite() && self.day_count_basis > 0.0) {
            return Err(BatchError::config(format!(
                "day_count_basis must be positive, got {}",
                self.day_count_basis
            )));
        }
        Ok(())
    }
}
