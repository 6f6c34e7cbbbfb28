//! Statistical decision functions. Pure: no I/O, no clocks.

pub mod sprt;

pub use sprt::{DemotionDecision, SprtDecision, SprtParams};
