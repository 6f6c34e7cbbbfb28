//! Target-hash provider interface.

use crate::types::collections::FxHashMap;
use crate::types::ids::TestId;

/// Computes content fingerprints ("target hashes") for tests.
///
/// Typically backed by the external build system's content-addressed
/// cache. The hash is the stationarity token for evidence pooling: equal
/// hashes across sessions mean identical experimental conditions.
///
/// An empty result map is tolerated by the core — every test is treated
/// as changed and a warning is logged.
pub trait HashProvider: Send + Sync {
    /// Compute hashes for the given tests. Tests absent from the returned
    /// map are treated as changed.
    fn compute_hashes(&self, ids: &[TestId]) -> FxHashMap<TestId, String>;
}

/// Static provider backed by a precomputed map. Useful for hosts that
/// compute hashes out-of-band, and for tests.
#[derive(Debug, Default, Clone)]
pub struct StaticHashProvider {
    hashes: FxHashMap<TestId, String>,
}

impl StaticHashProvider {
    pub fn new(hashes: FxHashMap<TestId, String>) -> Self {
        Self { hashes }
    }
}

impl HashProvider for StaticHashProvider {
    fn compute_hashes(&self, ids: &[TestId]) -> FxHashMap<TestId, String> {
        ids.iter()
            .filter_map(|id| self.hashes.get(id).map(|h| (id.clone(), h.clone())))
            .collect()
    }
}
