//! Co-occurrence history interface for regression selection.

/// One commit from version-control history.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub sha: String,
    /// RFC 3339 commit date. Unparseable dates are skipped by consumers.
    pub date: String,
    /// Paths touched by the commit.
    pub files: Vec<String>,
}

/// Supplies which commits touched a given file.
///
/// The core does not mine version control itself; hosts back this with a
/// VCS query or a cached co-occurrence file. Mining strategy and on-disk
/// format are the host's concern.
pub trait CoOccurrenceProvider: Send + Sync {
    fn commits_touching(&self, file: &str) -> Vec<CommitInfo>;
}
