//! Aggregate test-set verdict from per-test E-values.
//!
//! Per test, the summed support log-ratio over (same-hash) history gives
//! S = exp(log_ratio) as evidence for reliability and E = 1/S as evidence
//! against. The set-level rules control aggregate error:
//!
//! - RED when the mean E-value exceeds 1/alpha_set (Markov's inequality
//!   on the mean of supermartingales bounds the false-alarm rate).
//! - GREEN when the minimum S-value exceeds N/beta_set (a union bound
//!   distributes the Type II budget across all N tests).
//! - UNDECIDED otherwise.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use gauntlet_core::report::{VerdictPerTest, VerdictReport};
use gauntlet_core::types::collections::FxHashMap;
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::VerdictResult;
use gauntlet_store::EvidenceStore;

use crate::dag::TestDag;
use crate::exec::Executor;
use crate::stats::sprt::{self, SprtParams};

/// Set-level error budgets.
#[derive(Debug, Clone, Copy)]
pub struct VerdictParams {
    pub alpha_set: f64,
    pub beta_set: f64,
}

/// Which evidence batches count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictScope {
    /// All (same-hash) history, grouped by commit.
    Quick,
    /// Only evidence recorded at the current commit.
    CurrentCommit,
}

/// Computes aggregate verdicts over a set of tests.
pub struct VerdictEvaluator<'a> {
    store: &'a mut EvidenceStore,
    sprt_params: SprtParams,
    params: VerdictParams,
}

impl<'a> VerdictEvaluator<'a> {
    pub fn new(
        store: &'a mut EvidenceStore,
        sprt_params: SprtParams,
        params: VerdictParams,
    ) -> Self {
        Self {
            store,
            sprt_params,
            params,
        }
    }

    /// One-shot verdict over the given tests.
    pub fn compute(
        &self,
        ids: &[TestId],
        target_hashes: Option<&FxHashMap<TestId, String>>,
        commit: Option<&str>,
        scope: VerdictScope,
    ) -> VerdictReport {
        let n = ids.len();
        let mut per_test: BTreeMap<TestId, VerdictPerTest> = BTreeMap::new();
        let mut e_sum = 0.0_f64;
        let mut min_s = f64::INFINITY;
        let mut weakest: Option<TestId> = None;

        for id in ids {
            let hash = target_hashes.and_then(|m| m.get(id)).map(String::as_str);
            let (runs, passes) = self.evidence_counts(id, hash, commit, scope);
            let log_ratio = sprt::support_log_ratio(runs, passes, &self.sprt_params);
            let s = log_ratio.exp();
            let e = (-log_ratio).exp();
            e_sum += e;
            if s < min_s {
                min_s = s;
                weakest = Some(id.clone());
            }
            per_test.insert(
                id.clone(),
                VerdictPerTest {
                    log_ratio,
                    s_value: s,
                    e_value: e,
                },
            );
        }

        let result = if n == 0 {
            // An empty tested set has nothing to indict.
            VerdictResult::Green
        } else {
            let e_mean = e_sum / n as f64;
            if e_mean > 1.0 / self.params.alpha_set {
                VerdictResult::Red
            } else if min_s > n as f64 / self.params.beta_set {
                VerdictResult::Green
            } else {
                VerdictResult::Undecided
            }
        };

        info!(
            result = result.as_str(),
            n_tests = n,
            min_s,
            "verdict computed"
        );
        VerdictReport {
            result,
            e_set: if n == 0 { 0.0 } else { e_sum / n as f64 },
            min_s: if min_s.is_finite() { min_s } else { 1.0 },
            n_tests: n,
            weakest_test: weakest,
            per_test,
        }
    }

    /// Rerun-until-decided loop: evaluate, and while undecided rerun each
    /// test once (recording at the current commit), then re-evaluate over
    /// current-commit evidence. Bounded by `max_reruns` rounds.
    pub fn compute_hifi(
        &mut self,
        dag: &TestDag,
        executor: &Executor,
        ids: &[TestId],
        target_hashes: Option<&FxHashMap<TestId, String>>,
        commit: Option<&str>,
        max_reruns: u32,
    ) -> VerdictReport {
        let mut report = self.compute(ids, target_hashes, commit, VerdictScope::CurrentCommit);
        let mut rounds = 0;
        while report.result == VerdictResult::Undecided && rounds < max_reruns {
            rounds += 1;
            debug!(round = rounds, "verdict undecided; rerunning the tested set");
            for id in ids {
                let Some(node) = dag.node(id) else { continue };
                let hash = target_hashes.and_then(|m| m.get(id)).map(String::as_str);
                let result = executor.run_single(node);
                self.store
                    .record_run(id, result.status.is_pass(), commit, hash);
            }
            if let Err(e) = self.store.save() {
                warn!(error = %e, "failed to persist store during verdict reruns");
            }
            report = self.compute(ids, target_hashes, commit, VerdictScope::CurrentCommit);
        }
        report
    }

    /// (runs, passes) within the requested scope, same-hash preferred.
    fn evidence_counts(
        &self,
        id: &TestId,
        hash: Option<&str>,
        commit: Option<&str>,
        scope: VerdictScope,
    ) -> (u32, u32) {
        let entries: Vec<_> = match hash {
            Some(h) => self.store.get_same_hash_history(id, h),
            None => self.store.get_history(id).to_vec(),
        };
        let filtered = entries.iter().filter(|e| match scope {
            VerdictScope::Quick => true,
            VerdictScope::CurrentCommit => e.commit.as_deref() == commit,
        });
        let mut runs = 0;
        let mut passes = 0;
        for entry in filtered {
            runs += 1;
            if entry.passed {
                passes += 1;
            }
        }
        (runs, passes)
    }
}
