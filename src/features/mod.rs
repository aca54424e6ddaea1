//! Feature extraction modules
//!
//! This module contains the evidence extractors:
//! - Onset envelopes (band-split energy flux)
//! - Period estimation (windowed autocorrelation, candidate filtering)
//! - Key/mode vote parsing and aggregation

pub mod key;
pub mod onset;
pub mod period;
