//! Target-hash filtering: regime-break detection and skip partitioning.
//!
//! The target hash is the stationarity token for evidence pooling. A
//! changed hash means the test's inputs changed — prior evidence no
//! longer describes its reliability and is invalidated. An unchanged hash
//! on a settled (stable or flaky) test means a run would produce no new
//! information, so the test is skippable when the host opts in.

use tracing::{debug, info, warn};

use gauntlet_core::traits::HashProvider;
use gauntlet_core::types::collections::{FxHashMap, FxHashSet};
use gauntlet_core::types::events::{EventKind, LifecycleEvent};
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::Lifecycle;
use gauntlet_store::EvidenceStore;

use crate::dag::TestDag;

/// Result of the hash-filter phase.
#[derive(Debug, Clone, Default)]
pub struct HashFilter {
    /// Current hashes by test (provider output).
    pub hashes: FxHashMap<TestId, String>,
    /// Tests whose hash changed (or was previously unknown).
    pub changed: FxHashSet<TestId>,
    /// Tests with an unchanged hash.
    pub unchanged: FxHashSet<TestId>,
    /// Unchanged AND settled (stable or flaky): safe to skip.
    pub skippable: FxHashSet<TestId>,
    pub events: Vec<LifecycleEvent>,
}

/// Compute hashes for every test in the graph, invalidate evidence where
/// the hash moved, and partition the graph into changed / unchanged /
/// skippable.
pub fn apply(dag: &TestDag, store: &mut EvidenceStore, provider: &dyn HashProvider) -> HashFilter {
    let ids = dag.ids();
    let hashes = provider.compute_hashes(&ids);
    if hashes.is_empty() && !ids.is_empty() {
        warn!("hash provider returned no hashes; treating every test as changed");
    }

    let mut filter = HashFilter {
        hashes,
        ..HashFilter::default()
    };

    for id in &ids {
        let current = filter.hashes.get(id).cloned();
        let stored = store.target_hash(id).map(str::to_string);

        match (current, stored) {
            (Some(current), Some(stored)) if current == stored => {
                filter.unchanged.insert(id.clone());
                let state = store.get_state(id).unwrap_or(Lifecycle::Stable);
                if matches!(state, Lifecycle::Stable | Lifecycle::Flaky) {
                    filter.skippable.insert(id.clone());
                }
            }
            (Some(current), stored) => {
                // New or moved hash: a regime break for any prior evidence.
                if stored.is_some() {
                    let from = store.get_state(id);
                    debug!(test = %id, "target hash changed; invalidating evidence");
                    store.invalidate_evidence(id);
                    filter.events.push(LifecycleEvent::new(
                        EventKind::EvidenceInvalidated,
                        id.clone(),
                        from,
                        Lifecycle::BurningIn,
                    ));
                }
                store.set_target_hash(id, &current);
                filter.changed.insert(id.clone());
            }
            (None, _) => {
                // No hash from the provider: treated as changed, no
                // invalidation (absence of knowledge is not a regime break).
                filter.changed.insert(id.clone());
            }
        }
    }

    info!(
        changed = filter.changed.len(),
        unchanged = filter.unchanged.len(),
        skippable = filter.skippable.len(),
        "hash filter applied"
    );
    filter
}
