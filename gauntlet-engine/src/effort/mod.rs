//! Effort phases: the SPRT rerun loop (mini-converge / converge / max)
//! and the post-effort burn-in sweep.

pub mod runner;
pub mod sweep;

pub use runner::{EffortOutcome, EffortRunner};
pub use sweep::{BurnInSweep, SweepOutcome};
