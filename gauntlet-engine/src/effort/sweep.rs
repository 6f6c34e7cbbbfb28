//! Burn-in sweep: drive remaining burning-in tests to a terminal SPRT
//! decision after the effort phase.
//!
//! Evidence already in the store (this session's effort reruns, prior
//! same-hash sessions) is evaluated before any execution — a test whose
//! history is already decisive transitions immediately without running.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use gauntlet_core::types::collections::FxHashMap;
use gauntlet_core::types::events::{EventKind, LifecycleEvent};
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::Lifecycle;
use gauntlet_store::EvidenceStore;

use crate::dag::TestDag;
use crate::exec::Executor;
use crate::stats::sprt::{self, SprtDecision, SprtParams};

/// Outcome of the sweep: terminal states reached, plus the stragglers.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub decided: BTreeMap<TestId, Lifecycle>,
    pub undecided: Vec<TestId>,
    pub events: Vec<LifecycleEvent>,
}

/// Post-effort burn-in decision loop.
pub struct BurnInSweep<'a> {
    dag: &'a TestDag,
    store: &'a mut EvidenceStore,
    executor: &'a Executor,
    params: SprtParams,
}

impl<'a> BurnInSweep<'a> {
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

    /// Sweep every burning-in test in the graph until decided or the
    /// iteration cap is reached. Each executed rerun is recorded and
    /// persisted before re-evaluation (crash recovery mid-sweep).
    pub fn run(
        &mut self,
        max_iterations: u32,
        commit: Option<&str>,
        target_hashes: Option<&FxHashMap<TestId, String>>,
    ) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        let mut remaining: Vec<TestId> = self
            .dag
            .ids()
            .into_iter()
            .filter(|id| self.store.get_state(id) == Some(Lifecycle::BurningIn))
            .collect();

        info!(targets = remaining.len(), max_iterations, "burn-in sweep starting");

        let mut iteration = 0;
        while !remaining.is_empty() && iteration < max_iterations {
            iteration += 1;
            let mut still_undecided: Vec<TestId> = Vec::new();

            for id in remaining {
                let hash = target_hashes.and_then(|m| m.get(&id)).map(String::as_str);

                // Existing evidence first: prior phases and prior sessions
                // may already be decisive.
                if let Some(state) = self.try_decide(&id, hash, &mut outcome) {
                    debug!(test = %id, state = state.as_str(), "decided without execution");
                    continue;
                }

                let Some(node) = self.dag.node(&id) else { continue };
                let result = self.executor.run_single(node);
                self.store
                    .record_run(&id, result.status.is_pass(), commit, hash);
                if let Err(e) = self.store.save() {
                    warn!(error = %e, "failed to persist store during sweep");
                }

                if self.try_decide(&id, hash, &mut outcome).is_none() {
                    still_undecided.push(id);
                }
            }
            remaining = still_undecided;
        }

        outcome.undecided = remaining;
        if !outcome.undecided.is_empty() {
            info!(
                undecided = outcome.undecided.len(),
                "sweep iteration cap reached with tests still undecided"
            );
        }
        outcome
    }

    /// Evaluate current (same-hash preferred) evidence; on a decision,
    /// apply the transition and record it in the outcome.
    fn try_decide(
        &mut self,
        id: &TestId,
        hash: Option<&str>,
        outcome: &mut SweepOutcome,
    ) -> Option<Lifecycle> {
        let (runs, passes) = match hash {
            Some(h) => {
                let same = self.store.get_same_hash_history(id, h);
                (
                    same.len() as u32,
                    same.iter().filter(|e| e.passed).count() as u32,
                )
            }
            None => {
                let history = self.store.get_history(id);
                (
                    history.len() as u32,
                    history.iter().filter(|e| e.passed).count() as u32,
                )
            }
        };

        let (state, kind) = match sprt::evaluate(runs, passes, &self.params) {
            SprtDecision::Accept => (Lifecycle::Stable, EventKind::BurnInAccepted),
            SprtDecision::Reject => (Lifecycle::Flaky, EventKind::BurnInRejected),
            SprtDecision::Continue => return None,
        };

        self.store.set_state(id, state, false);
        if let Err(e) = self.store.save() {
            warn!(error = %e, "failed to persist store after sweep transition");
        }
        outcome.decided.insert(id.clone(), state);
        outcome.events.push(LifecycleEvent::new(
            kind,
            id.clone(),
            Some(Lifecycle::BurningIn),
            state,
        ));
        Some(state)
    }
}
