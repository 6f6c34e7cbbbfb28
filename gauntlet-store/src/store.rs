//! `EvidenceStore` — sole owner of durable per-test lifecycle state.
//!
//! One JSON document, read once at load and rewritten atomically
//! (write-to-temp + fsync + rename) on every `save()`. The file on disk is
//! always either the previous complete snapshot or the new complete
//! snapshot; a crash between mutations observes the last `save()`.
//!
//! All operations are synchronous and serialized; the store is not shared
//! across threads. Concurrent orchestrators are excluded by
//! [`crate::lock::StoreLock`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gauntlet_core::errors::StoreError;
use gauntlet_core::types::ids::TestId;
use gauntlet_core::types::status::Lifecycle;
use gauntlet_core::types::timestamp;

use crate::entry::{HistoryEntry, TestEntry};

/// Maximum history entries kept per test; overflow drops the oldest.
pub const HISTORY_CAP: usize = 200;

/// Top-level persisted document.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreDocument {
    tests: BTreeMap<TestId, TestEntry>,
}

/// Persistent per-test lifecycle state and evidence, keyed by test id.
#[derive(Debug)]
pub struct EvidenceStore {
    path: PathBuf,
    doc: StoreDocument,
    min_reliability: f64,
    significance: f64,
}

impl EvidenceStore {
    /// Load the store from `path`, attaching the statistical parameters
    /// used by downstream SPRT evaluation.
    ///
    /// A missing file starts empty; a malformed file is corruption — the
    /// store logs a warning and starts empty rather than aborting the run.
    pub fn load(path: &Path, min_reliability: f64, significance: f64) -> Self {
        let doc = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<StoreDocument>(&raw) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "status file is corrupt; starting with an empty store"
                    );
                    StoreDocument::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreDocument::default(),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "status file is unreadable; starting with an empty store"
                );
                StoreDocument::default()
            }
        };
        debug!(path = %path.display(), tests = doc.tests.len(), "evidence store loaded");
        Self {
            path: path.to_path_buf(),
            doc,
            min_reliability,
            significance,
        }
    }

    /// Atomic snapshot write: serialize to a temp file in the same
    /// directory, fsync, then rename over the final path.
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, &e))?;
            }
        }

        let json = serde_json::to_string_pretty(&self.doc).map_err(|e| StoreError::Serialize {
            message: e.to_string(),
        })?;

        let tmp_path = temp_path_for(&self.path);
        {
            let mut file = std::fs::File::create(&tmp_path)
                .map_err(|e| StoreError::io(&tmp_path, &e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| StoreError::io(&tmp_path, &e))?;
            // fsync where the filesystem supports it; a failure here does
            // not invalidate the temp+rename protocol.
            if let Err(e) = file.sync_all() {
                debug!(error = %e, "fsync not supported or failed; continuing");
            }
        }
        std::fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::io(&self.path, &e))
    }

    /// Lifecycle state for a test, or `None` if the store has no entry.
    /// Callers filtering by state treat absent tests as `Stable`.
    pub fn get_state(&self, id: &TestId) -> Option<Lifecycle> {
        self.doc.tests.get(id).map(|e| e.state)
    }

    /// Set a test's lifecycle state, creating the entry if absent.
    /// Preserves `target_hash`; optionally clears history.
    pub fn set_state(&mut self, id: &TestId, state: Lifecycle, clear_history: bool) {
        let entry = self
            .doc
            .tests
            .entry(id.clone())
            .or_insert_with(|| TestEntry::with_state(state));
        entry.state = state;
        if clear_history {
            entry.history.clear();
        }
        entry.last_updated = timestamp::now_rfc3339();
    }

    /// Prepend a run outcome to a test's history, creating the entry in
    /// state `New` if absent. History is capped at [`HISTORY_CAP`].
    pub fn record_run(
        &mut self,
        id: &TestId,
        passed: bool,
        commit: Option<&str>,
        target_hash: Option<&str>,
    ) {
        let entry = self
            .doc
            .tests
            .entry(id.clone())
            .or_insert_with(TestEntry::default);
        entry.history.insert(
            0,
            HistoryEntry {
                passed,
                commit: commit.map(str::to_string),
                target_hash: target_hash.map(str::to_string),
            },
        );
        entry.history.truncate(HISTORY_CAP);
        entry.last_updated = timestamp::now_rfc3339();
    }

    /// Full newest-first history for a test.
    pub fn get_history(&self, id: &TestId) -> &[HistoryEntry] {
        self.doc
            .tests
            .get(id)
            .map(|e| e.history.as_slice())
            .unwrap_or(&[])
    }

    /// Newest-first history filtered to entries recorded at `hash`.
    /// Entries lacking a hash are excluded: they predate hash tracking
    /// and cannot vouch for the current regime.
    pub fn get_same_hash_history(&self, id: &TestId, hash: &str) -> Vec<HistoryEntry> {
        self.get_history(id)
            .iter()
            .filter(|h| h.target_hash.as_deref() == Some(hash))
            .cloned()
            .collect()
    }

    /// Current target hash for a test.
    pub fn target_hash(&self, id: &TestId) -> Option<&str> {
        self.doc
            .tests
            .get(id)
            .and_then(|e| e.target_hash.as_deref())
    }

    /// Update a test's current target hash, creating the entry if absent.
    pub fn set_target_hash(&mut self, id: &TestId, hash: &str) {
        let entry = self
            .doc
            .tests
            .entry(id.clone())
            .or_insert_with(TestEntry::default);
        entry.target_hash = Some(hash.to_string());
    }

    /// Regime break: the test's inputs changed, so prior evidence no
    /// longer describes its reliability. Clears history and returns the
    /// test to burn-in. The stored `target_hash` is retained; callers
    /// usually overwrite it with the new hash immediately after.
    pub fn invalidate_evidence(&mut self, id: &TestId) {
        let entry = self
            .doc
            .tests
            .entry(id.clone())
            .or_insert_with(TestEntry::default);
        entry.history.clear();
        entry.state = Lifecycle::BurningIn;
        entry.last_updated = timestamp::now_rfc3339();
    }

    /// Full entry access (read-only).
    pub fn get_entry(&self, id: &TestId) -> Option<&TestEntry> {
        self.doc.tests.get(id)
    }

    /// Insert or replace a full entry. For hosts migrating data and for
    /// test setup.
    pub fn insert_entry(&mut self, id: TestId, entry: TestEntry) {
        self.doc.tests.insert(id, entry);
    }

    /// All test ids with entries, in stable (sorted) order.
    pub fn ids(&self) -> impl Iterator<Item = &TestId> {
        self.doc.tests.keys()
    }

    pub fn len(&self) -> usize {
        self.doc.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.tests.is_empty()
    }

    /// Entry counts per lifecycle state, for run summaries.
    pub fn state_counts(&self) -> BTreeMap<Lifecycle, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.doc.tests.values() {
            *counts.entry(entry.state).or_insert(0) += 1;
        }
        counts
    }

    pub fn min_reliability(&self) -> f64 {
        self.min_reliability
    }

    pub fn significance(&self) -> f64 {
        self.significance
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "status.json".to_string());
    name.push_str(".tmp");
    path.with_file_name(name)
}
