//! Run configuration.
//!
//! All fields are optional in the TOML document; `effective_*()` accessors
//! supply defaults so hosts only write the keys they care about.

mod regression_config;
mod run_config;
mod stats_config;

pub use regression_config::RegressionConfig;
pub use run_config::RunConfig;
pub use stats_config::StatsConfig;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// The full configuration document (`gauntlet.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GauntletConfig {
    pub run: RunConfig,
    pub stats: StatsConfig,
    pub regression: RegressionConfig,
}

impl GauntletConfig {
    /// Load a configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&raw)
    }

    /// Parse a configuration document from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(raw).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field validation. Statistical parameters must be probabilities;
    /// the regression selection cap cannot exceed the whole suite.
    pub fn validate(&self) -> Result<(), String> {
        let p = self.stats.effective_min_reliability();
        if !(0.0..=1.0).contains(&p) {
            return Err(format!("stats.min_reliability must be in [0, 1], got {p}"));
        }
        let s = self.stats.effective_significance();
        if !(0.0..=1.0).contains(&s) {
            return Err(format!("stats.significance must be in [0, 1], got {s}"));
        }
        let m = self.stats.effective_margin();
        if !(0.0..1.0).contains(&m) {
            return Err(format!("stats.margin must be in [0, 1), got {m}"));
        }
        let pct = self.regression.effective_max_test_percentage();
        if !(0.0..=1.0).contains(&pct) {
            return Err(format!(
                "regression.max_test_percentage must be in [0, 1], got {pct}"
            ));
        }
        Ok(())
    }
}
