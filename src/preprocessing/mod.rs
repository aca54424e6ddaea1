//! Audio preprocessing modules
//!
//! Prepares PCM for onset extraction:
//! - Channel mixing (stereo to mono)
//! - One-pole band filters

pub mod channel_mixer;
pub mod filters;
