//! Co-occurrence regression selection.
//!
//! Scores tests by how often their files changed together with the
//! currently-changed source files in version-control history, with
//! per-hop decay and commit-recency weighting, then selects a capped,
//! dependency-closed subset. Falls back to the full stable suite when the
//! selection is too small to be trustworthy.

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use gauntlet_core::config::RegressionConfig;
use gauntlet_core::traits::CoOccurrenceProvider;
use gauntlet_core::types::collections::{FxHashMap, FxHashSet};
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::timestamp;

use crate::dag::TestDag;

/// Outcome of a selection pass.
#[derive(Debug, Clone, Default)]
pub struct SelectionOutcome {
    /// Selected ids including dependency closure, in descending score
    /// order (closure additions last).
    pub selected: Vec<TestId>,
    /// Distinct tests that received any score.
    pub candidate_count: usize,
    /// The scored selection was below `min_tests`; the full stable suite
    /// was returned instead.
    pub fallback_used: bool,
}

/// Selects a regression subset correlated with the changed files.
pub struct RegressionSelector<'a> {
    dag: &'a TestDag,
    provider: &'a dyn CoOccurrenceProvider,
    config: &'a RegressionConfig,
}

impl<'a> RegressionSelector<'a> {
    pub fn new(
        dag: &'a TestDag,
        provider: &'a dyn CoOccurrenceProvider,
        config: &'a RegressionConfig,
    ) -> Self {
        Self {
            dag,
            provider,
            config,
        }
    }

    /// Run the scoring walk and produce the selection.
    ///
    /// `stable_tests` sizes the selection cap and is the fallback set.
    pub fn select(&self, changed_files: &[String], stable_tests: &[TestId]) -> SelectionOutcome {
        let extensions = self.config.effective_source_extensions();
        let decay = self.config.effective_decay_per_hop();
        let half_life = self.config.effective_recency_half_life_days();
        let max_hops = self.config.effective_max_hops();
        let needed = self.selection_cap(stable_tests.len());
        let now = OffsetDateTime::now_utc();

        let mut frontier: Vec<String> = changed_files
            .iter()
            .filter(|f| has_source_extension(f, &extensions))
            .cloned()
            .collect();
        let mut visited: FxHashSet<String> = frontier.iter().cloned().collect();
        let mut scores: FxHashMap<TestId, f64> = FxHashMap::default();

        for hop in 0..=max_hops {
            if frontier.is_empty() || scores.len() >= needed.max(1) {
                break;
            }
            let hop_weight = decay.powi(hop as i32);
            let mut next_frontier: Vec<String> = Vec::new();

            for file in &frontier {
                for commit in self.provider.commits_touching(file) {
                    let Some(age_days) = timestamp::days_since(&commit.date, now) else {
                        warn!(sha = %commit.sha, date = %commit.date, "unparseable commit date; skipping");
                        continue;
                    };
                    let recency =
                        (-(std::f64::consts::LN_2) * age_days / half_life).exp();
                    let weight = hop_weight * recency;

                    for co_file in &commit.files {
                        if let Some(id) = self.map_to_test(co_file) {
                            *scores.entry(id).or_insert(0.0) += weight;
                        } else if has_source_extension(co_file, &extensions)
                            && visited.insert(co_file.clone())
                        {
                            next_frontier.push(co_file.clone());
                        }
                    }
                }
            }
            debug!(hop, scored = scores.len(), frontier = next_frontier.len(), "hop complete");
            frontier = next_frontier;
        }

        let candidate_count = scores.len();

        // Rank by score, ties by id for determinism.
        let mut ranked: Vec<(TestId, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut selected: Vec<TestId> = ranked
            .into_iter()
            .take(needed)
            .map(|(id, _)| id)
            .filter(|id| self.dag.contains(id))
            .collect();

        if selected.len() < self.config.effective_min_tests() {
            info!(
                selected = selected.len(),
                min = self.config.effective_min_tests(),
                "selection too small; falling back to the full stable suite"
            );
            return SelectionOutcome {
                selected: stable_tests.to_vec(),
                candidate_count,
                fallback_used: true,
            };
        }

        // Dependency closure so selected tests can actually run.
        let selected_set: FxHashSet<TestId> = selected.iter().cloned().collect();
        let closed = self.dag.closure(&selected_set);
        let mut closure_adds: Vec<TestId> = closed
            .into_iter()
            .filter(|id| !selected_set.contains(id))
            .collect();
        closure_adds.sort();
        selected.extend(closure_adds);

        info!(selected = selected.len(), candidates = candidate_count, "regression selection done");
        SelectionOutcome {
            selected,
            candidate_count,
            fallback_used: false,
        }
    }

    /// `ceil(max_test_percentage * stable_count)`.
    fn selection_cap(&self, stable_count: usize) -> usize {
        (self.config.effective_max_test_percentage() * stable_count as f64).ceil() as usize
    }

    /// Map a changed test-file path to a test id: exact executable-path
    /// match first, then the basename convention (file stem equals the
    /// test id).
    fn map_to_test(&self, file: &str) -> Option<TestId> {
        let path = std::path::Path::new(file);
        for node in self.dag.nodes() {
            if node.executable.as_path() == path {
                return Some(node.id.clone());
            }
            if let (Some(exec_name), Some(file_name)) =
                (node.executable.file_name(), path.file_name())
            {
                if exec_name == file_name {
                    return Some(node.id.clone());
                }
            }
        }
        let stem = path.file_stem()?.to_str()?;
        self.dag
            .nodes()
            .find(|n| n.id.as_str() == stem)
            .map(|n| n.id.clone())
    }
}

fn has_source_extension(file: &str, extensions: &[String]) -> bool {
    std::path::Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x == e))
}
