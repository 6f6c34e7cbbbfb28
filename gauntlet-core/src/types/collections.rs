//! Fast hash collections used throughout the workspace.
//!
//! FxHash is a non-cryptographic hash that is significantly faster than
//! SipHash for the short string keys (test ids, file paths) we use.

pub use rustc_hash::{FxHashMap, FxHashSet};
