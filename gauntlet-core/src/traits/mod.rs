//! Shared traits used across Gauntlet crates.

pub mod cancellation;
pub mod co_occurrence;
pub mod hash_provider;

pub use cancellation::CancellationToken;
pub use co_occurrence::{CommitInfo, CoOccurrenceProvider};
pub use hash_provider::HashProvider;
