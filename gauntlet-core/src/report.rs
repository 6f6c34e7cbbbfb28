//! Run report model.
//!
//! The core emits this structure; rendering (HTML, terminal) is a
//! downstream concern. Maps use `BTreeMap` so serialized output is
//! deterministic.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::events::LifecycleEvent;
use crate::types::ids::TestId;
use crate::types::status::{Classification, Lifecycle, Status, VerdictResult};

/// Aggregate counts over the session's results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub dependencies_failed: usize,
    pub total_duration_seconds: f64,
}

/// Per-test entry in the report tree.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub id: TestId,
    pub assertion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<Lifecycle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

/// The test-set tree mirroring the manifest.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSetReport {
    pub name: String,
    pub assertion: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subsets: Vec<String>,
    pub tests: Vec<TestReport>,
}

/// Hash-filter phase counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HashFilterReport {
    pub changed: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

/// Regression-selection outcome.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegressionReport {
    pub selected: Vec<TestId>,
    pub candidate_count: usize,
    pub fallback_used: bool,
}

/// Effort-phase outcome.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EffortReport {
    pub classifications: BTreeMap<TestId, Classification>,
    pub total_reruns: u32,
}

/// Burn-in sweep outcome.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub decided: BTreeMap<TestId, Lifecycle>,
    pub undecided: Vec<TestId>,
}

/// Per-test verdict evidence.
#[derive(Debug, Clone, Serialize)]
pub struct VerdictPerTest {
    pub log_ratio: f64,
    pub s_value: f64,
    pub e_value: f64,
}

/// Aggregate verdict.
#[derive(Debug, Clone, Serialize)]
pub struct VerdictReport {
    pub result: VerdictResult,
    /// Mean E-value over the tested set.
    pub e_set: f64,
    /// Minimum S-value over the tested set.
    pub min_s: f64,
    pub n_tests: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weakest_test: Option<TestId>,
    pub per_test: BTreeMap<TestId, VerdictPerTest>,
}

/// The full run report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_environment: Option<String>,
    pub engine_version: String,
    pub mode: String,
    pub effort: String,
    pub summary: Summary,
    pub test_set: TestSetReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_filter: Option<HashFilterReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regression_selection: Option<RegressionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort_phase: Option<EffortReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burn_in_sweep: Option<SweepReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictReport>,
    pub events: Vec<LifecycleEvent>,
    pub exit_code: i32,
}

impl Report {
    /// Serialize as the `{ "report": { ... } }` document hosts consume.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct Document<'a> {
            report: &'a Report,
        }
        serde_json::to_string_pretty(&Document { report: self })
    }
}
