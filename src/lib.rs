//! # BNK Analysis Engine
//!
//! A candidate-first tempo and key/mode analysis engine for short music clips.
//! Every metric is reported with ranked candidates, a three-level confidence
//! and an ordered trail of reason codes. When the evidence is weak the value
//! is omitted rather than guessed.
//!
//! ## Features
//!
//! - **BPM Detection**: Band-split onset envelopes, windowed autocorrelation,
//!   octave folding and a family-aware candidate set
//! - **Reportable Tempo**: A separate human-facing tempo with explicit
//!   half/double-time policy
//! - **Key/Mode**: Window vote aggregation that withholds the mode, or the
//!   whole key, when a runner-up is too close
//! - **Role Packaging**: Guest, free and pro views with a contract validator
//!
//! ## Quick Start
//!
//! ```no_run
//! use bnk_analysis_engine::{run_analysis, AnalysisInput, EngineConfig, NoopObserver, Role, RunOptions};
//!
//! let output = run_analysis(
//!     AnalysisInput::Path("clip.wav".into()),
//!     Role::Pro,
//!     &EngineConfig::default(),
//!     &NoopObserver,
//!     RunOptions::default(),
//! )?;
//!
//! println!("{}", output.to_json_pretty()?);
//! # Ok::<(), bnk_analysis_engine::EngineError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Input → Validate → Ingest → Preprocess → BPM / Key-Mode Engines → Packaging → Contract
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod packaging;
pub mod pipeline;
pub mod preprocessing;

// Re-export main types
pub use analysis::result::{BpmResult, Confidence, KeyModeResult, Timefeel};
pub use config::{EngineConfig, Tunables};
pub use error::{EngineError, Stage};
pub use io::{AnalysisHints, DecodedAudio, PcmAudio, TrackInfo};
pub use packaging::{package, validate_output, AnalysisReport, PackagedOutput, Role};
pub use pipeline::{
    analyze_report, run_analysis, AnalysisEvent, AnalysisInput, AnalysisObserver, LogObserver,
    NoopObserver, RecordingObserver, RunOptions,
};
