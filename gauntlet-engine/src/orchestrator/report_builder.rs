//! Report assembly from phase outputs.

use std::collections::BTreeMap;

use gauntlet_core::ci;
use gauntlet_core::manifest::Manifest;
use gauntlet_core::report::{
    Report, Summary, TestReport, TestSetReport,
};
use gauntlet_core::types::collections::FxHashMap;
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::{Classification, EffortMode, ExecutionMode, Lifecycle, Status};
use gauntlet_core::types::test_result::TestResult;
use gauntlet_core::types::timestamp;

/// Build the base report skeleton; the orchestrator attaches optional
/// phase sections afterwards.
pub fn build(
    manifest: &Manifest,
    mode: ExecutionMode,
    effort: EffortMode,
    commit: Option<&str>,
    results: &[TestResult],
    classifications: &BTreeMap<TestId, Classification>,
    lifecycles: &FxHashMap<TestId, Lifecycle>,
) -> Report {
    let by_id: FxHashMap<&TestId, &TestResult> =
        results.iter().map(|r| (&r.id, r)).collect();

    let mut summary = Summary {
        total: results.len(),
        ..Summary::default()
    };
    for result in results {
        match result.status {
            Status::Passed | Status::PassedWithDepsFailed => summary.passed += 1,
            Status::Failed | Status::FailedWithDepsFailed => summary.failed += 1,
            Status::DependenciesFailed => summary.dependencies_failed += 1,
        }
        summary.total_duration_seconds += result.duration.as_secs_f64();
    }

    let tests = manifest
        .ordered_ids()
        .into_iter()
        .filter_map(|id| {
            let def = manifest.test_set_tests.get(&id)?;
            let result = by_id.get(&id);
            Some(TestReport {
                id: id.clone(),
                assertion: def.assertion.clone(),
                status: result.map(|r| r.status),
                duration_seconds: result.map(|r| r.duration.as_secs_f64()).unwrap_or(0.0),
                exit_code: result.and_then(|r| r.exit_code),
                classification: classifications.get(&id).copied(),
                lifecycle: lifecycles.get(&id).copied(),
                requirement_id: def.requirement_id.clone(),
                parameters: def
                    .parameters
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            })
        })
        .collect();

    Report {
        generated_at: timestamp::now_rfc3339(),
        commit: commit.map(str::to_string),
        ci_environment: ci::detect_ci_environment().map(|e| e.as_str().to_string()),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        mode: mode.as_str().to_string(),
        effort: effort.as_str().to_string(),
        summary,
        test_set: TestSetReport {
            name: manifest.test_set.name.clone(),
            assertion: manifest.test_set.assertion.clone(),
            subsets: manifest.test_set.subsets.clone(),
            tests,
        },
        hash_filter: None,
        regression_selection: None,
        effort_phase: None,
        burn_in_sweep: None,
        verdict: None,
        events: Vec::new(),
        exit_code: 0,
    }
}
