//! Regression-selection configuration.

use serde::{Deserialize, Serialize};

/// Configuration for co-occurrence based regression test selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RegressionConfig {
    /// Fraction of the stable suite selectable by score, in [0, 1].
    /// Default: 0.2.
    pub max_test_percentage: Option<f64>,
    /// Co-occurrence frontier expansion depth. Default: 2.
    pub max_hops: Option<u32>,
    /// Score multiplier per hop away from the changed files. Default: 0.5.
    pub decay_per_hop: Option<f64>,
    /// Half-life in days for commit recency weighting. Default: 180.
    pub recency_half_life_days: Option<f64>,
    /// Minimum selection size before falling back to the full stable
    /// suite. Default: 3.
    pub min_tests: Option<usize>,
    /// File extensions considered source code when seeding the frontier.
    pub source_extensions: Vec<String>,
}

impl RegressionConfig {
    pub fn effective_max_test_percentage(&self) -> f64 {
        self.max_test_percentage.unwrap_or(0.2)
    }

    pub fn effective_max_hops(&self) -> u32 {
        self.max_hops.unwrap_or(2)
    }

    pub fn effective_decay_per_hop(&self) -> f64 {
        self.decay_per_hop.unwrap_or(0.5)
    }

    pub fn effective_recency_half_life_days(&self) -> f64 {
        self.recency_half_life_days.unwrap_or(180.0)
    }

    pub fn effective_min_tests(&self) -> usize {
        self.min_tests.unwrap_or(3)
    }

    /// Effective source extensions; defaults cover the languages the
    /// orchestrated build systems typically host.
    pub fn effective_source_extensions(&self) -> Vec<String> {
        if self.source_extensions.is_empty() {
            ["c", "cc", "cpp", "h", "hpp", "rs", "go", "py", "java", "ts", "js"]
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        } else {
            self.source_extensions.clone()
        }
    }
}
