//! Lifecycle transition events.

use serde::Serialize;

use super::ids::TestId;
use super::status::Lifecycle;

/// What triggered a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// SPRT accepted during burn-in; test promoted to stable.
    BurnInAccepted,
    /// SPRT rejected during burn-in; test marked flaky.
    BurnInRejected,
    /// Demotion evaluation on a stable failure concluded demote.
    Demoted,
    /// Demotion evaluation was inconclusive; stable test returned to
    /// burn-in with history preserved.
    DemotionInconclusive,
    /// Manifest marked the test disabled; store synchronized.
    SyncDisabled,
    /// Manifest no longer marks the test disabled; store reset to new.
    SyncReenabled,
    /// Flaky deadline exceeded; test auto-disabled.
    DeadlineDisabled,
    /// Target hash changed; evidence invalidated, test back to burn-in.
    EvidenceInvalidated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BurnInAccepted => "burn_in_accepted",
            Self::BurnInRejected => "burn_in_rejected",
            Self::Demoted => "demoted",
            Self::DemotionInconclusive => "demotion_inconclusive",
            Self::SyncDisabled => "sync_disabled",
            Self::SyncReenabled => "sync_reenabled",
            Self::DeadlineDisabled => "deadline_disabled",
            Self::EvidenceInvalidated => "evidence_invalidated",
        }
    }
}

/// One lifecycle transition, reported in run order.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub id: TestId,
    pub from: Option<Lifecycle>,
    pub to: Lifecycle,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, id: TestId, from: Option<Lifecycle>, to: Lifecycle) -> Self {
        Self { kind, id, from, to }
    }
}
