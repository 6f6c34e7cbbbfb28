//! Persisted per-test records.
//!
//! Compatibility: old documents may lack `target_hash` or `history`, or
//! carry legacy `runs`/`passes` scalars. Missing fields default; unknown
//! fields are ignored on load and therefore dropped on the next save.

use serde::{Deserialize, Serialize};

use gauntlet_core::types::status::Lifecycle;
use gauntlet_core::types::timestamp;

/// One run outcome that counts as evidence, newest first in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_hash: Option<String>,
}

/// Durable record for one test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestEntry {
    pub state: Lifecycle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_hash: Option<String>,
    pub history: Vec<HistoryEntry>,
    /// RFC 3339 UTC; updated on every state change or recorded run.
    pub last_updated: String,
}

impl Default for TestEntry {
    fn default() -> Self {
        Self {
            state: Lifecycle::New,
            target_hash: None,
            history: Vec::new(),
            last_updated: timestamp::now_rfc3339(),
        }
    }
}

impl TestEntry {
    /// Fresh entry in the given state.
    pub fn with_state(state: Lifecycle) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// (runs, passes) counters over the full history.
    pub fn counts(&self) -> (u32, u32) {
        let runs = self.history.len() as u32;
        let passes = self.history.iter().filter(|h| h.passed).count() as u32;
        (runs, passes)
    }
}
