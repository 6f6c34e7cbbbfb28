//! Execution-surface configuration.

use serde::{Deserialize, Serialize};

use crate::types::status::{EffortMode, ExecutionMode};

/// Configuration for a single orchestrated run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Traversal and gating policy: "diagnostic" or "detection".
    /// Default: diagnostic.
    pub mode: Option<ExecutionMode>,
    /// Effort mode: "none", "regression", "converge", "max". Default: none.
    pub effort: Option<EffortMode>,
    /// Per-test rerun budget for effort loops. Default: 10.
    pub max_reruns: Option<u32>,
    /// Stop dispatching after this many failures. 0 = unlimited. Default: 0.
    pub max_failures: Option<u32>,
    /// Sliding-window width for parallel execution. 1 = sequential.
    /// Default: 1.
    pub max_parallel: Option<usize>,
    /// Per-test execution timeout in seconds. Default: 300.
    pub timeout_seconds: Option<u64>,
    /// Skip stable/flaky tests whose target hash is unchanged. Default: false.
    pub skip_unchanged: Option<bool>,
    /// Path to the persistent status file. None disables lifecycle tracking.
    pub status_file: Option<String>,
    /// Commit identifier recorded with evidence entries.
    pub commit: Option<String>,
    /// Changed source files for regression selection.
    pub changed_files: Vec<String>,
}

impl RunConfig {
    pub fn effective_mode(&self) -> ExecutionMode {
        self.mode.unwrap_or(ExecutionMode::Diagnostic)
    }

    pub fn effective_effort(&self) -> EffortMode {
        self.effort.unwrap_or(EffortMode::None)
    }

    pub fn effective_max_reruns(&self) -> u32 {
        self.max_reruns.unwrap_or(10)
    }

    pub fn effective_max_failures(&self) -> u32 {
        self.max_failures.unwrap_or(0)
    }

    pub fn effective_max_parallel(&self) -> usize {
        self.max_parallel.unwrap_or(1).max(1)
    }

    pub fn effective_timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(300)
    }

    pub fn effective_skip_unchanged(&self) -> bool {
        self.skip_unchanged.unwrap_or(false)
    }
}
