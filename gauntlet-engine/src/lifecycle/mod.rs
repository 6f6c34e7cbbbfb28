//! Lifecycle state machine: turns execution results into state
//! transitions using the SPRT and the evidence store.

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use gauntlet_core::types::collections::FxHashMap;
use gauntlet_core::types::events::{EventKind, LifecycleEvent};
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::{Lifecycle, Status};
use gauntlet_core::types::test_result::TestResult;
use gauntlet_core::types::timestamp;
use gauntlet_store::EvidenceStore;

use crate::dag::{TestDag, TestNode};
use crate::exec::Executor;
use crate::stats::sprt::{self, DemotionDecision, SprtDecision, SprtParams};

/// Drives lifecycle transitions over the evidence store.
///
/// The engine borrows the store exclusively: all lifecycle writes funnel
/// through here, and every mutation path ends in an explicit `save()` by
/// the caller or by the rerun loops themselves.
pub struct LifecycleEngine<'a> {
    store: &'a mut EvidenceStore,
    params: SprtParams,
}

impl<'a> LifecycleEngine<'a> {
    /// Build an engine over the store, using the store's attached
    /// statistical parameters and the given indifference margin.
    pub fn new(store: &'a mut EvidenceStore, margin: f64) -> Self {
        let params = SprtParams::new(store.min_reliability(), store.significance())
            .with_margin(margin);
        Self { store, params }
    }

    pub fn params(&self) -> &SprtParams {
        &self.params
    }

    pub fn store(&self) -> &EvidenceStore {
        self.store
    }

    pub fn store_mut(&mut self) -> &mut EvidenceStore {
        self.store
    }

    /// Record a batch of execution results and apply state transitions.
    ///
    /// Gated results (`DependenciesFailed`) carry no evidence about the
    /// test itself and are skipped entirely.
    pub fn process_results(
        &mut self,
        results: &[TestResult],
        commit: Option<&str>,
        target_hashes: Option<&FxHashMap<TestId, String>>,
    ) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        for result in results {
            if result.status == Status::DependenciesFailed {
                continue;
            }
            let hash = target_hashes
                .and_then(|m| m.get(&result.id))
                .map(String::as_str);
            let passed = result.status.is_pass();
            self.store.record_run(&result.id, passed, commit, hash);

            match self.store.get_state(&result.id).unwrap_or(Lifecycle::New) {
                Lifecycle::BurningIn => {
                    if let Some(event) = self.evaluate_burn_in(&result.id, hash) {
                        events.push(event);
                    }
                }
                Lifecycle::Stable if !passed => {
                    if let Some(event) = self.evaluate_stable_failure(&result.id, hash) {
                        events.push(event);
                    }
                }
                // Flaky, new, and disabled tests only accumulate evidence.
                _ => {}
            }
        }
        events
    }

    /// SPRT over the accumulated (same-hash preferred) evidence of a
    /// burning-in test.
    fn evaluate_burn_in(&mut self, id: &TestId, hash: Option<&str>) -> Option<LifecycleEvent> {
        let (runs, passes) = self.counts(id, hash);
        match sprt::evaluate(runs, passes, &self.params) {
            SprtDecision::Accept => {
                info!(test = %id, runs, passes, "burn-in accepted; promoting to stable");
                self.store.set_state(id, Lifecycle::Stable, false);
                Some(LifecycleEvent::new(
                    EventKind::BurnInAccepted,
                    id.clone(),
                    Some(Lifecycle::BurningIn),
                    Lifecycle::Stable,
                ))
            }
            SprtDecision::Reject => {
                info!(test = %id, runs, passes, "burn-in rejected; marking flaky");
                self.store.set_state(id, Lifecycle::Flaky, false);
                Some(LifecycleEvent::new(
                    EventKind::BurnInRejected,
                    id.clone(),
                    Some(Lifecycle::BurningIn),
                    Lifecycle::Flaky,
                ))
            }
            SprtDecision::Continue => None,
        }
    }

    /// Reverse-chronological demotion evaluation after a stable test
    /// failed this session.
    fn evaluate_stable_failure(
        &mut self,
        id: &TestId,
        hash: Option<&str>,
    ) -> Option<LifecycleEvent> {
        let flags = self.history_flags(id, hash);
        match sprt::demotion_evaluate(flags, &self.params) {
            DemotionDecision::Demote => {
                warn!(test = %id, "stable test demoted to flaky");
                self.store.set_state(id, Lifecycle::Flaky, false);
                Some(LifecycleEvent::new(
                    EventKind::Demoted,
                    id.clone(),
                    Some(Lifecycle::Stable),
                    Lifecycle::Flaky,
                ))
            }
            DemotionDecision::Inconclusive => {
                // Suspicious but unproven: back to burn-in with history
                // preserved so the next sessions settle it.
                info!(test = %id, "stable failure inconclusive; returning to burn-in");
                self.store.set_state(id, Lifecycle::BurningIn, false);
                Some(LifecycleEvent::new(
                    EventKind::DemotionInconclusive,
                    id.clone(),
                    Some(Lifecycle::Stable),
                    Lifecycle::BurningIn,
                ))
            }
            DemotionDecision::Retain => None,
        }
    }

    /// On-demand demotion with reruns: rerun up to `max_reruns` times,
    /// recording and persisting each outcome, re-evaluating after each.
    /// Returns the final decision and any applied transition.
    pub fn handle_stable_failure(
        &mut self,
        node: &TestNode,
        executor: &Executor,
        max_reruns: u32,
        commit: Option<&str>,
        hash: Option<&str>,
    ) -> (DemotionDecision, Vec<LifecycleEvent>) {
        let mut events = Vec::new();
        let mut decision =
            sprt::demotion_evaluate(self.history_flags(&node.id, hash), &self.params);

        let mut reruns = 0;
        while decision == DemotionDecision::Inconclusive && reruns < max_reruns {
            let result = executor.run_single(node);
            self.store
                .record_run(&node.id, result.status.is_pass(), commit, hash);
            if let Err(e) = self.store.save() {
                warn!(error = %e, "failed to persist store during demotion reruns");
            }
            reruns += 1;
            decision = sprt::demotion_evaluate(self.history_flags(&node.id, hash), &self.params);
        }

        match decision {
            DemotionDecision::Demote => {
                self.store.set_state(&node.id, Lifecycle::Flaky, false);
                events.push(LifecycleEvent::new(
                    EventKind::Demoted,
                    node.id.clone(),
                    Some(Lifecycle::Stable),
                    Lifecycle::Flaky,
                ));
            }
            DemotionDecision::Inconclusive => {
                self.store.set_state(&node.id, Lifecycle::BurningIn, false);
                events.push(LifecycleEvent::new(
                    EventKind::DemotionInconclusive,
                    node.id.clone(),
                    Some(Lifecycle::Stable),
                    Lifecycle::BurningIn,
                ));
            }
            DemotionDecision::Retain => {}
        }
        (decision, events)
    }

    /// Bridge between the manifest's mutable `disabled` flag and the
    /// persistent lifecycle. Idempotent for an unchanging manifest.
    pub fn sync_disabled(&mut self, dag: &TestDag) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        for node in dag.nodes() {
            let state = self.store.get_state(&node.id);
            if node.disabled && state != Some(Lifecycle::Disabled) {
                debug!(test = %node.id, "manifest disabled; syncing store");
                self.store.set_state(&node.id, Lifecycle::Disabled, true);
                events.push(LifecycleEvent::new(
                    EventKind::SyncDisabled,
                    node.id.clone(),
                    state,
                    Lifecycle::Disabled,
                ));
            } else if !node.disabled && state == Some(Lifecycle::Disabled) {
                debug!(test = %node.id, "manifest re-enabled; resetting to new");
                self.store.set_state(&node.id, Lifecycle::New, true);
                events.push(LifecycleEvent::new(
                    EventKind::SyncReenabled,
                    node.id.clone(),
                    state,
                    Lifecycle::New,
                ));
            }
        }
        events
    }

    /// Auto-disable tests that have sat flaky past the deadline. A
    /// negative deadline disables the check entirely.
    pub fn check_deadlines(&mut self, deadline_days: f64) -> Vec<LifecycleEvent> {
        if deadline_days < 0.0 {
            return Vec::new();
        }
        let now = OffsetDateTime::now_utc();
        let flaky: Vec<(TestId, String)> = self
            .store
            .ids()
            .filter(|id| self.store.get_state(id) == Some(Lifecycle::Flaky))
            .filter_map(|id| {
                self.store
                    .get_entry(id)
                    .map(|e| (id.clone(), e.last_updated.clone()))
            })
            .collect();

        let mut events = Vec::new();
        for (id, last_updated) in flaky {
            let Some(days) = timestamp::days_since(&last_updated, now) else {
                warn!(test = %id, last_updated, "unparseable last_updated; skipping deadline check");
                continue;
            };
            if days > deadline_days {
                warn!(
                    test = %id,
                    days_flaky = days,
                    deadline = deadline_days,
                    "flaky deadline exceeded; auto-disabling"
                );
                self.store.set_state(&id, Lifecycle::Disabled, false);
                events.push(LifecycleEvent::new(
                    EventKind::DeadlineDisabled,
                    id,
                    Some(Lifecycle::Flaky),
                    Lifecycle::Disabled,
                ));
            }
        }
        events
    }

    /// Ids in the graph whose lifecycle state is in `states`. Tests
    /// absent from the store count as stable.
    pub fn filter_by_state(&self, dag: &TestDag, states: &[Lifecycle]) -> Vec<TestId> {
        dag.ids()
            .into_iter()
            .filter(|id| {
                let state = self.store.get_state(id).unwrap_or(Lifecycle::Stable);
                states.contains(&state)
            })
            .collect()
    }

    /// (runs, passes) from same-hash history when a hash is known,
    /// otherwise from the full history.
    fn counts(&self, id: &TestId, hash: Option<&str>) -> (u32, u32) {
        match hash {
            Some(h) => {
                let same = self.store.get_same_hash_history(id, h);
                let runs = same.len() as u32;
                let passes = same.iter().filter(|e| e.passed).count() as u32;
                (runs, passes)
            }
            None => {
                let history = self.store.get_history(id);
                let runs = history.len() as u32;
                let passes = history.iter().filter(|e| e.passed).count() as u32;
                (runs, passes)
            }
        }
    }

    /// Newest-first pass/fail flags, same-hash preferred.
    fn history_flags(&self, id: &TestId, hash: Option<&str>) -> Vec<bool> {
        match hash {
            Some(h) => self
                .store
                .get_same_hash_history(id, h)
                .iter()
                .map(|e| e.passed)
                .collect(),
            None => self.store.get_history(id).iter().map(|e| e.passed).collect(),
        }
    }
}
