// src/scan/mod.rs

//! Candidate resolution and build-mode change scanning.

pub mod candidates;
pub mod poll;

pub use candidates::{CandidateSet, resolve_candidates};
pub use poll::scan_changes;
