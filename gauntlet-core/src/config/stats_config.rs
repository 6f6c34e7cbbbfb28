//! Statistical parameters for SPRT, burn-in, and verdicts.

use serde::{Deserialize, Serialize};

/// Statistical configuration shared by the SPRT, the lifecycle engine,
/// the burn-in sweep, and the verdict layer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StatsConfig {
    /// Reliability threshold p0 for H0: p >= p0. Default: 0.99.
    pub min_reliability: Option<f64>,
    /// Symmetric SPRT confidence; error rates are 1 - significance.
    /// Default: 0.95.
    pub significance: Option<f64>,
    /// Indifference margin separating H0 from H1: p <= p0 - margin.
    /// Default: 0.10.
    pub margin: Option<f64>,
    /// Days a test may stay flaky before auto-disable. Negative disables
    /// the check. Default: -1 (disabled).
    pub flaky_deadline_days: Option<f64>,
    /// Iteration cap for the burn-in sweep. Default: 50.
    pub max_sweep_iterations: Option<u32>,
    /// Aggregate Type I budget for the RED verdict. Default: 0.05.
    pub verdict_alpha: Option<f64>,
    /// Aggregate Type II budget for the GREEN verdict. Default: 0.05.
    pub verdict_beta: Option<f64>,
}

impl StatsConfig {
    pub fn effective_min_reliability(&self) -> f64 {
        self.min_reliability.unwrap_or(0.99)
    }

    pub fn effective_significance(&self) -> f64 {
        self.significance.unwrap_or(0.95)
    }

    pub fn effective_margin(&self) -> f64 {
        self.margin.unwrap_or(0.10)
    }

    pub fn effective_flaky_deadline_days(&self) -> f64 {
        self.flaky_deadline_days.unwrap_or(-1.0)
    }

    pub fn effective_max_sweep_iterations(&self) -> u32 {
        self.max_sweep_iterations.unwrap_or(50)
    }

    pub fn effective_verdict_alpha(&self) -> f64 {
        self.verdict_alpha.unwrap_or(0.05)
    }

    pub fn effective_verdict_beta(&self) -> f64 {
        self.verdict_beta.unwrap_or(0.05)
    }
}
