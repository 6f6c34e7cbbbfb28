//! Test execution engine.
//!
//! Two strategies share one result model: a sequential runner that walks
//! the chosen traversal order, and a bounded sliding-window runner that
//! dispatches onto worker threads. Subprocess I/O is isolated in the
//! workers; the scheduler never blocks on a pipe.

pub mod parallel;
pub mod sequential;
pub mod subprocess;

use std::time::Duration;

use gauntlet_core::errors::ExecError;
use gauntlet_core::traits::CancellationToken;
use gauntlet_core::types::status::ExecutionMode;
use gauntlet_core::types::test_result::TestResult;

use crate::dag::{TestDag, TestNode};

/// Configuration shared by both runners.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    pub mode: ExecutionMode,
    /// Stop dispatching after this many failed executions. 0 = unlimited.
    pub max_failures: u32,
    /// Sliding-window width. 1 selects the sequential runner.
    pub max_parallel: usize,
    /// Per-test execution timeout.
    pub timeout: Duration,
    pub cancellation: CancellationToken,
}

impl ExecConfig {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            max_failures: 0,
            max_parallel: 1,
            timeout: Duration::from_secs(300),
            cancellation: CancellationToken::new(),
        }
    }

    pub(crate) fn failure_budget_reached(&self, failures: u32) -> bool {
        self.max_failures > 0 && failures >= self.max_failures
    }
}

/// Runs a graph of tests under the configured mode and window.
#[derive(Debug, Clone)]
pub struct Executor {
    config: ExecConfig,
}

impl Executor {
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Execute every test in the graph, honoring dependency gating,
    /// max_failures, and cancellation. Results are in traversal order
    /// (sequential) or completion order (parallel).
    pub fn run(&self, dag: &TestDag) -> Result<Vec<TestResult>, ExecError> {
        if self.config.max_parallel <= 1 {
            Ok(sequential::run(dag, &self.config))
        } else {
            parallel::run(dag, &self.config)
        }
    }

    /// Execute one test outside any traversal (effort rerun loops).
    pub fn run_single(&self, node: &TestNode) -> TestResult {
        subprocess::run_test(&node.id, &node.executable, self.config.timeout)
    }
}
