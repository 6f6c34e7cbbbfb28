//! Phase orchestrator: the only component that sees every subsystem.
//!
//! Owns the evidence store for the duration of a run (all writes are
//! serialized through it), drives the phases for the selected effort
//! mode, and is the sole authority on the exit code. Holds no state of
//! its own between runs.

pub mod exit_code;
pub mod hash_filter;
pub mod report_builder;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use gauntlet_core::config::GauntletConfig;
use gauntlet_core::errors::OrchestratorError;
use gauntlet_core::manifest::Manifest;
use gauntlet_core::report::{
    EffortReport, HashFilterReport, RegressionReport, Report, SweepReport,
};
use gauntlet_core::traits::{CancellationToken, CoOccurrenceProvider, HashProvider};
use gauntlet_core::types::collections::{FxHashMap, FxHashSet};
use gauntlet_core::types::events::LifecycleEvent;
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::{Classification, EffortMode, Lifecycle, Status};
use gauntlet_core::types::test_result::TestResult;
use gauntlet_store::{EvidenceStore, StoreLock};

use crate::dag::TestDag;
use crate::effort::{BurnInSweep, EffortRunner};
use crate::exec::{ExecConfig, Executor};
use crate::lifecycle::LifecycleEngine;
use crate::regression::{RegressionSelector, SelectionOutcome};
use crate::stats::sprt::SprtParams;
use crate::verdict::{VerdictEvaluator, VerdictParams, VerdictScope};

use hash_filter::HashFilter;

/// Mini-converge keeps the rerun budget tight: the regression gate wants
/// a fast answer, not a full burn-in.
const MINI_CONVERGE_BUDGET: u32 = 5;

/// Everything a run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub exit_code: i32,
    pub results: Vec<TestResult>,
}

/// Coordinates one run end to end.
pub struct Orchestrator<'a> {
    manifest: &'a Manifest,
    config: &'a GauntletConfig,
    hash_provider: Option<&'a dyn HashProvider>,
    co_occurrence: Option<&'a dyn CoOccurrenceProvider>,
    cancellation: CancellationToken,
}

impl<'a> Orchestrator<'a> {
    pub fn new(manifest: &'a Manifest, config: &'a GauntletConfig) -> Self {
        Self {
            manifest,
            config,
            hash_provider: None,
            co_occurrence: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_hash_provider(mut self, provider: &'a dyn HashProvider) -> Self {
        self.hash_provider = Some(provider);
        self
    }

    pub fn with_co_occurrence(mut self, provider: &'a dyn CoOccurrenceProvider) -> Self {
        self.co_occurrence = Some(provider);
        self
    }

    /// Token a host can clone to translate interrupts into cooperative
    /// cancellation.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Run all phases for the configured effort mode.
    pub fn run(&self) -> Result<RunOutcome, OrchestratorError> {
        self.config
            .validate()
            .map_err(|message| OrchestratorError::Config { message })?;

        let effort = self.config.run.effective_effort();
        match &self.config.run.status_file {
            Some(path_str) => {
                let path = Path::new(path_str);
                let mut lock = StoreLock::new(path)?;
                let _guard = lock.exclusive()?;
                let mut store = EvidenceStore::load(
                    path,
                    self.config.stats.effective_min_reliability(),
                    self.config.stats.effective_significance(),
                );
                self.run_phases(Some(&mut store))
            }
            None => {
                if matches!(effort, EffortMode::Converge | EffortMode::Max) {
                    return Err(OrchestratorError::MissingStore {
                        effort: effort.as_str().to_string(),
                    });
                }
                self.run_phases(None)
            }
        }
    }

    fn run_phases(
        &self,
        mut store: Option<&mut EvidenceStore>,
    ) -> Result<RunOutcome, OrchestratorError> {
        let mode = self.config.run.effective_mode();
        let effort = self.config.run.effective_effort();
        let commit = self.config.run.commit.as_deref();
        let margin = self.config.stats.effective_margin();
        let sprt_params = SprtParams::new(
            self.config.stats.effective_min_reliability(),
            self.config.stats.effective_significance(),
        )
        .with_margin(margin);

        info!(
            mode = mode.as_str(),
            effort = effort.as_str(),
            "run starting"
        );

        let full_dag = TestDag::build(self.manifest)?;
        let mut events: Vec<LifecycleEvent> = Vec::new();

        // Lifecycle setup: sync the manifest's disabled flags, enforce
        // flaky deadlines, and drop disabled tests from the graph.
        let mut dag = full_dag.clone();
        if let Some(store) = store.as_deref_mut() {
            let mut engine = LifecycleEngine::new(store, margin);
            events.extend(engine.sync_disabled(&dag));
            events.extend(
                engine.check_deadlines(self.config.stats.effective_flaky_deadline_days()),
            );
            let disabled: FxHashSet<TestId> = engine
                .filter_by_state(&dag, &[Lifecycle::Disabled])
                .into_iter()
                .collect();
            dag = dag.remove(&disabled);
            store.save()?;
        } else {
            let disabled: FxHashSet<TestId> =
                self.manifest.disabled_ids().into_iter().collect();
            dag = dag.remove(&disabled);
        }

        // Hash filter: invalidate evidence where the stationarity token
        // moved, and compute the skippable partition.
        let mut filter: Option<HashFilter> = None;
        if let (Some(store), Some(provider)) = (store.as_deref_mut(), self.hash_provider) {
            let applied = hash_filter::apply(&dag, store, provider);
            events.extend(applied.events.iter().cloned());
            store.save()?;
            filter = Some(applied);
        }
        let hashes = filter.as_ref().map(|f| &f.hashes);

        // Exit codes are judged against the lifecycle as it stood before
        // execution: a test demoted this session was stable when it ran.
        let lifecycle_snapshot: FxHashMap<TestId, Lifecycle> = match store.as_deref() {
            Some(store) => dag
                .ids()
                .into_iter()
                .map(|id| {
                    let state = store.get_state(&id).unwrap_or(Lifecycle::Stable);
                    (id, state)
                })
                .collect(),
            None => FxHashMap::default(),
        };

        let executor = Executor::new(ExecConfig {
            mode,
            max_failures: self.config.run.effective_max_failures(),
            max_parallel: self.config.run.effective_max_parallel(),
            timeout: Duration::from_secs(self.config.run.effective_timeout_seconds()),
            cancellation: self.cancellation.clone(),
        });

        let mut classifications: BTreeMap<TestId, Classification> = BTreeMap::new();
        let mut effort_section: Option<EffortReport> = None;
        let mut sweep_section: Option<SweepReport> = None;
        let mut verdict_section = None;
        let mut regression_section: Option<RegressionReport> = None;
        let mut skipped = 0usize;

        let results: Vec<TestResult> = match effort {
            EffortMode::None => {
                let results = executor.run(&dag)?;
                if let Some(store) = store.as_deref_mut() {
                    for result in &results {
                        if result.status == Status::DependenciesFailed {
                            continue;
                        }
                        let hash = hashes.and_then(|m| m.get(&result.id)).map(String::as_str);
                        store.record_run(&result.id, result.status.is_pass(), commit, hash);
                    }
                    store.save()?;
                }
                results
            }

            EffortMode::Regression => {
                let (selection, run_dag) =
                    self.select_regression(&dag, store.as_deref_mut(), margin, filter.as_ref());
                regression_section = Some(RegressionReport {
                    selected: selection.selected.clone(),
                    candidate_count: selection.candidate_count,
                    fallback_used: selection.fallback_used,
                });

                let results = executor.run(&run_dag)?;

                let own_failures = results.iter().any(|r| {
                    matches!(r.status, Status::Failed | Status::FailedWithDepsFailed)
                });
                if let Some(store) = store.as_deref_mut() {
                    if own_failures && commit.is_some() {
                        let mut runner =
                            EffortRunner::new(&run_dag, store, &executor, sprt_params);
                        let outcome = runner.run(
                            &results,
                            EffortMode::Converge,
                            self.config
                                .run
                                .effective_max_reruns()
                                .min(MINI_CONVERGE_BUDGET),
                            commit,
                            hashes,
                        );
                        classifications = outcome.classifications.clone();
                        effort_section = Some(EffortReport {
                            classifications: outcome.classifications,
                            total_reruns: outcome.total_reruns,
                        });
                    }
                    let mut engine = LifecycleEngine::new(store, margin);
                    events.extend(engine.process_results(&results, commit, hashes));
                    store.save()?;
                }
                results
            }

            EffortMode::Converge | EffortMode::Max => {
                let run_dag = match (&filter, self.config.run.effective_skip_unchanged()) {
                    (Some(f), true) => {
                        skipped = f.skippable.len();
                        dag.remove(&f.skippable)
                    }
                    _ => dag.clone(),
                };

                let results = executor.run(&run_dag)?;

                let Some(store) = store.as_deref_mut() else {
                    // Unreachable: run() rejects converge/max without a
                    // store before any phase starts.
                    return Err(OrchestratorError::MissingStore {
                        effort: effort.as_str().to_string(),
                    });
                };

                let mut runner = EffortRunner::new(&run_dag, store, &executor, sprt_params);
                let outcome = runner.run(
                    &results,
                    effort,
                    self.config.run.effective_max_reruns(),
                    commit,
                    hashes,
                );
                classifications = outcome.classifications.clone();
                effort_section = Some(EffortReport {
                    classifications: outcome.classifications,
                    total_reruns: outcome.total_reruns,
                });

                let mut sweep = BurnInSweep::new(&run_dag, store, &executor, sprt_params);
                let sweep_outcome = sweep.run(
                    self.config.stats.effective_max_sweep_iterations(),
                    commit,
                    hashes,
                );
                events.extend(sweep_outcome.events.iter().cloned());
                sweep_section = Some(SweepReport {
                    decided: sweep_outcome.decided,
                    undecided: sweep_outcome.undecided,
                });

                let mut engine = LifecycleEngine::new(store, margin);
                events.extend(engine.process_results(&results, commit, hashes));
                store.save()?;

                let verdict_params = VerdictParams {
                    alpha_set: self.config.stats.effective_verdict_alpha(),
                    beta_set: self.config.stats.effective_verdict_beta(),
                };
                let evaluator = VerdictEvaluator::new(store, sprt_params, verdict_params);
                verdict_section = Some(evaluator.compute(
                    &run_dag.ids(),
                    hashes,
                    commit,
                    VerdictScope::Quick,
                ));

                results
            }
        };

        let exit_code =
            exit_code::compute(&results, &classifications, &lifecycle_snapshot, effort);

        // The report shows where each test ended up, not where it started.
        let final_lifecycles: FxHashMap<TestId, Lifecycle> = match store.as_deref() {
            Some(store) => full_dag
                .ids()
                .into_iter()
                .filter_map(|id| store.get_state(&id).map(|s| (id, s)))
                .collect(),
            None => FxHashMap::default(),
        };

        let mut report = report_builder::build(
            self.manifest,
            mode,
            effort,
            commit,
            &results,
            &classifications,
            &final_lifecycles,
        );
        report.hash_filter = filter.as_ref().map(|f| HashFilterReport {
            changed: f.changed.len(),
            unchanged: f.unchanged.len(),
            skipped,
        });
        report.regression_selection = regression_section;
        report.effort_phase = effort_section;
        report.burn_in_sweep = sweep_section;
        report.verdict = verdict_section;
        report.events = events;
        report.exit_code = exit_code;

        info!(exit_code, tests = results.len(), "run finished");
        Ok(RunOutcome {
            report,
            exit_code,
            results,
        })
    }

    /// Regression selection: co-occurrence scoring, hash intersection,
    /// always-include new and burning-in tests, dependency closure.
    fn select_regression(
        &self,
        dag: &TestDag,
        store: Option<&mut EvidenceStore>,
        margin: f64,
        filter: Option<&HashFilter>,
    ) -> (SelectionOutcome, TestDag) {
        let stable: Vec<TestId> = match &store {
            Some(store) => {
                let engine_store: &EvidenceStore = store;
                dag.ids()
                    .into_iter()
                    .filter(|id| {
                        engine_store.get_state(id).unwrap_or(Lifecycle::Stable)
                            == Lifecycle::Stable
                    })
                    .collect()
            }
            // Without a store every test counts as stable.
            None => dag.ids(),
        };

        let selection = match self.co_occurrence {
            Some(provider) => {
                RegressionSelector::new(dag, provider, &self.config.regression)
                    .select(&self.config.run.changed_files, &stable)
            }
            None => {
                warn!("no co-occurrence history available; running the full stable suite");
                SelectionOutcome {
                    selected: stable.clone(),
                    candidate_count: 0,
                    fallback_used: true,
                }
            }
        };

        let mut chosen: FxHashSet<TestId> = selection.selected.iter().cloned().collect();

        // A stable test whose target hash did not change has no new
        // regression to catch.
        if let Some(filter) = filter {
            chosen.retain(|id| filter.changed.contains(id));
        }

        // Immature tests ride along regardless of hash state: they need
        // the evidence.
        if let Some(store) = store {
            let engine = LifecycleEngine::new(store, margin);
            chosen.extend(engine.filter_by_state(dag, &[Lifecycle::New, Lifecycle::BurningIn]));
        }

        let closed = dag.closure(&chosen);
        let run_dag = dag.retain(&closed);
        (selection, run_dag)
    }
}
