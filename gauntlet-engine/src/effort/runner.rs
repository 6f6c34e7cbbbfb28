//! SPRT rerun loop.
//!
//! Round-robin over a target set: one rerun per round per still-undecided
//! test, so no test monopolizes the budget and a quick convergence frees
//! its slot. Every rerun is recorded and persisted before the next
//! evaluation — a crash mid-loop loses at most the in-flight run.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use gauntlet_core::types::collections::FxHashMap;
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::{Classification, EffortMode, Status};
use gauntlet_core::types::test_result::TestResult;
use gauntlet_store::EvidenceStore;

use crate::dag::TestDag;
use crate::exec::Executor;
use crate::stats::sprt::{self, SprtDecision, SprtParams};

/// Outcome of an effort phase.
#[derive(Debug, Clone, Default)]
pub struct EffortOutcome {
    pub classifications: BTreeMap<TestId, Classification>,
    pub total_reruns: u32,
}

/// One target's mutable loop state.
struct Target {
    id: TestId,
    initially_passed: bool,
    runs: u32,
    passes: u32,
    reruns_used: u32,
}

/// Drives converge / max / mini-converge rerun loops.
pub struct EffortRunner<'a> {
    dag: &'a TestDag,
    store: &'a mut EvidenceStore,
    executor: &'a Executor,
    params: SprtParams,
}

impl<'a> EffortRunner<'a> {
    pub fn new(
        dag: &'a TestDag,
        store: &'a mut EvidenceStore,
        executor: &'a Executor,
        params: SprtParams,
    ) -> Self {
        Self {
            dag,
            store,
            executor,
            params,
        }
    }

    /// Run the rerun loop.
    ///
    /// Converge targets the initially-failed tests; max targets the whole
    /// graph. Initially-passing tests outside the target set are
    /// classified `TruePass` without evaluation.
    pub fn run(
        &mut self,
        initial_results: &[TestResult],
        effort: EffortMode,
        max_reruns: u32,
        commit: Option<&str>,
        target_hashes: Option<&FxHashMap<TestId, String>>,
    ) -> EffortOutcome {
        let mut outcome = EffortOutcome::default();
        let initial_by_id: FxHashMap<&TestId, Status> = initial_results
            .iter()
            .map(|r| (&r.id, r.status))
            .collect();

        let mut targets: Vec<Target> = Vec::new();
        for id in self.dag.ids() {
            let status = initial_by_id.get(&id).copied();
            let own_failure = matches!(
                status,
                Some(Status::Failed) | Some(Status::FailedWithDepsFailed)
            );
            let targeted = match effort {
                EffortMode::Max => true,
                EffortMode::Converge => own_failure,
                // Other modes never reach the effort runner.
                _ => false,
            };

            if !targeted {
                if status.is_some_and(|s| s.is_pass()) {
                    outcome
                        .classifications
                        .insert(id.clone(), Classification::TruePass);
                }
                continue;
            }

            let Some(status) = status else {
                // Targeted (max mode) but never executed this session —
                // gated or cancelled. Nothing to converge on.
                continue;
            };
            if status == Status::DependenciesFailed {
                continue;
            }

            let hash = target_hashes.and_then(|m| m.get(&id)).map(String::as_str);
            let (runs, passes) = self.seed_counters(&id, hash, status.is_pass());
            targets.push(Target {
                id,
                initially_passed: status.is_pass(),
                runs,
                passes,
                reruns_used: 0,
            });
        }

        info!(
            effort = effort.as_str(),
            targets = targets.len(),
            max_reruns,
            "effort rerun loop starting"
        );

        // Pooled evidence may already be decisive — classify before
        // spending any budget.
        targets.retain(|t| {
            match sprt::evaluate(t.runs, t.passes, &self.params) {
                SprtDecision::Continue => true,
                decision => {
                    debug!(test = %t.id, "decided from pooled evidence alone");
                    outcome
                        .classifications
                        .insert(t.id.clone(), classify(t.initially_passed, decision));
                    false
                }
            }
        });

        // Round-robin: one rerun per undecided target per round.
        while !targets.is_empty() {
            let mut next_round: Vec<Target> = Vec::new();
            for mut target in targets {
                if target.reruns_used >= max_reruns {
                    outcome
                        .classifications
                        .insert(target.id.clone(), Classification::Undecided);
                    continue;
                }

                let Some(node) = self.dag.node(&target.id) else {
                    continue;
                };
                let hash = target_hashes
                    .and_then(|m| m.get(&target.id))
                    .map(String::as_str);
                let result = self.executor.run_single(node);
                let passed = result.status.is_pass();
                self.store.record_run(&target.id, passed, commit, hash);
                if let Err(e) = self.store.save() {
                    warn!(error = %e, "failed to persist store during effort loop");
                }

                target.runs += 1;
                if passed {
                    target.passes += 1;
                }
                target.reruns_used += 1;
                outcome.total_reruns += 1;

                match sprt::evaluate(target.runs, target.passes, &self.params) {
                    SprtDecision::Continue => next_round.push(target),
                    decision => {
                        outcome.classifications.insert(
                            target.id.clone(),
                            classify(target.initially_passed, decision),
                        );
                    }
                }
            }
            targets = next_round;
        }

        outcome
    }

    /// Starting counters: same-hash history when the stationarity token is
    /// known (cross-session pooling), otherwise just this session's
    /// initial result.
    fn seed_counters(&self, id: &TestId, hash: Option<&str>, initially_passed: bool) -> (u32, u32) {
        match hash {
            Some(h) => {
                let same = self.store.get_same_hash_history(id, h);
                let runs = same.len() as u32;
                let passes = same.iter().filter(|e| e.passed).count() as u32;
                (runs, passes)
            }
            None => (1, u32::from(initially_passed)),
        }
    }
}

/// The classification matrix over (initial outcome, SPRT verdict).
/// Budget exhaustion maps to `Undecided` at the call sites.
fn classify(initially_passed: bool, decision: SprtDecision) -> Classification {
    match (initially_passed, decision) {
        (false, SprtDecision::Accept) => Classification::Flake,
        (false, SprtDecision::Reject) => Classification::TrueFail,
        (true, SprtDecision::Accept) => Classification::TruePass,
        (true, SprtDecision::Reject) => Classification::Flake,
        (_, SprtDecision::Continue) => Classification::Undecided,
    }
}
