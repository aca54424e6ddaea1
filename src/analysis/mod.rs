//! Analysis and result aggregation modules
//!
//! Turns feature evidence into final metrics:
//! - Confidence tiers and score gaps
//! - BPM candidate engine and reportable policy
//! - Key/mode candidate engine
//! - Result types

pub mod bpm;
pub mod confidence;
pub mod key_mode;
pub mod reportable;
pub mod result;

pub use bpm::{estimate_bpm, BpmEvidence};
pub use key_mode::{assemble_votes, estimate_key_mode};
