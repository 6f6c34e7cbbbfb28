//! Closed enums for execution status, lifecycle state, classification,
//! verdicts, and run modes.
//!
//! Every variant set here is deliberately closed: these values are persisted
//! in the status file and the report, so adding a variant is a format change.

use serde::{Deserialize, Serialize};

/// Outcome of a single test execution.
///
/// The two `*WithDepsFailed` variants arise only under parallel execution,
/// when a dependency fails while this test is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed,
    DependenciesFailed,
    PassedWithDepsFailed,
    FailedWithDepsFailed,
}

impl Status {
    /// Stable string form used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::DependenciesFailed => "dependencies_failed",
            Self::PassedWithDepsFailed => "passed_with_deps_failed",
            Self::FailedWithDepsFailed => "failed_with_deps_failed",
        }
    }

    /// The test's own executable observably passed.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Passed | Self::PassedWithDepsFailed)
    }

    /// Any failed flavor, including dependency-tainted ones.
    /// Used by diagnostic-mode gating: a dependent of a test in any of
    /// these states is not executed.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed | Self::FailedWithDepsFailed | Self::DependenciesFailed
        )
    }
}

/// Maturity lifecycle of a test, persisted in the status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    New,
    BurningIn,
    Stable,
    Flaky,
    Disabled,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::BurningIn => "burning_in",
            Self::Stable => "stable",
            Self::Flaky => "flaky",
            Self::Disabled => "disabled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "burning_in" => Some(Self::BurningIn),
            "stable" => Some(Self::Stable),
            "flaky" => Some(Self::Flaky),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// Per-test outcome of an effort phase (converge / max / mini-converge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    TruePass,
    TrueFail,
    Flake,
    Undecided,
    NotEvaluated,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TruePass => "true_pass",
            Self::TrueFail => "true_fail",
            Self::Flake => "flake",
            Self::Undecided => "undecided",
            Self::NotEvaluated => "not_evaluated",
        }
    }
}

/// Aggregate test-set verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictResult {
    Green,
    Red,
    Undecided,
}

impl VerdictResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Red => "RED",
            Self::Undecided => "UNDECIDED",
        }
    }
}

/// DAG traversal and dependency-gating policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Leaves-first topological order; dependents of failed tests are
    /// gated off as `DependenciesFailed`.
    Diagnostic,
    /// Roots-first BFS; no gating, optional early stop on max_failures.
    Detection,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagnostic => "diagnostic",
            Self::Detection => "detection",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "diagnostic" => Some(Self::Diagnostic),
            "detection" => Some(Self::Detection),
            _ => None,
        }
    }
}

/// Execution thoroughness selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortMode {
    None,
    Regression,
    Converge,
    Max,
}

impl EffortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Regression => "regression",
            Self::Converge => "converge",
            Self::Max => "max",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "regression" => Some(Self::Regression),
            "converge" => Some(Self::Converge),
            "max" => Some(Self::Max),
            _ => None,
        }
    }
}
