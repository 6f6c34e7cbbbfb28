//! Result of one test execution.

use std::time::Duration;

use super::ids::TestId;
use super::status::Status;

/// One execution of one test's executable.
///
/// Owned by whoever produced it (an executor) and moved into the report;
/// captured output is never streamed to the caller's stdout.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub id: TestId,
    pub status: Status,
    /// Wall-clock execution time. Zero for gated (`DependenciesFailed`) tests.
    pub duration: Duration,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code of the subprocess. `None` when the process was killed by a
    /// signal, timed out, or was never spawned.
    pub exit_code: Option<i32>,
    /// RFC 3339 UTC timestamps. Equal for gated tests.
    pub started_at: String,
    pub finished_at: String,
}

impl TestResult {
    /// A synthetic result for a test that was gated off because an ancestor
    /// failed. No subprocess was spawned.
    pub fn dependencies_failed(id: TestId, timestamp: String) -> Self {
        Self {
            id,
            status: Status::DependenciesFailed,
            duration: Duration::ZERO,
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            started_at: timestamp.clone(),
            finished_at: timestamp,
        }
    }

    /// Captured stdout, lossily decoded for reporting.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Captured stderr, lossily decoded for reporting.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}
