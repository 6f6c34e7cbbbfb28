//! Exit-code policy: the lifecycle × classification matrix.
//!
//! Only stable tests can fail a run, and what counts against them depends
//! on the gate: regression gates (PRs, merges) must not be held hostage
//! by known flakes, so a stable flake only warns there; converge and max
//! gates (post-merge, release) are where flakes become visible failures.
//! Flaky, burning-in, and new tests never contribute to the exit code.

use std::collections::BTreeMap;

use tracing::warn;

use gauntlet_core::types::collections::FxHashMap;
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::{Classification, EffortMode, Lifecycle, Status};
use gauntlet_core::types::test_result::TestResult;

/// One test's contribution to the exit code.
fn contributes(lifecycle: Lifecycle, classification: Classification, effort: EffortMode) -> bool {
    if lifecycle != Lifecycle::Stable {
        return false;
    }
    match classification {
        Classification::TrueFail | Classification::Undecided => true,
        Classification::Flake => match effort {
            // Deliberate asymmetry: regression tolerates known flakes.
            EffortMode::Regression => false,
            _ => true,
        },
        Classification::TruePass | Classification::NotEvaluated => false,
    }
}

/// Classification fallback when no effort phase evaluated a test: the raw
/// execution status stands in (failed => true_fail, passed => true_pass).
fn default_classification(status: Status) -> Classification {
    match status {
        Status::Passed | Status::PassedWithDepsFailed => Classification::TruePass,
        Status::Failed | Status::FailedWithDepsFailed => Classification::TrueFail,
        Status::DependenciesFailed => Classification::NotEvaluated,
    }
}

/// Overall exit code: 1 iff at least one test contributes.
///
/// `lifecycles` is the snapshot taken before execution; a test absent
/// from it (or run without a store) counts as stable.
pub fn compute(
    results: &[TestResult],
    classifications: &BTreeMap<TestId, Classification>,
    lifecycles: &FxHashMap<TestId, Lifecycle>,
    effort: EffortMode,
) -> i32 {
    let mut exit = 0;
    for result in results {
        let lifecycle = lifecycles
            .get(&result.id)
            .copied()
            .unwrap_or(Lifecycle::Stable);
        let classification = classifications
            .get(&result.id)
            .copied()
            .unwrap_or_else(|| default_classification(result.status));

        if contributes(lifecycle, classification, effort) {
            exit = 1;
        } else if lifecycle == Lifecycle::Stable
            && classification == Classification::Flake
            && effort == EffortMode::Regression
        {
            warn!(test = %result.id, "stable test flaked; tolerated under the regression gate");
        }
    }
    exit
}
