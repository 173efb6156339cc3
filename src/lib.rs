//! EEG Stress Agent - real-time stress/relaxation verdicts from a 16-channel headset.
//!
//! Raw notification payloads arrive on one timeline and are decoded into a
//! bounded window of frames. On a second, fixed-period timeline the newest
//! frames are classified, and the per-tick probability is smoothed, voted on
//! and gated for stability before a verdict is emitted.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      EEG Stress Agent                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Collector  │──▶│   Decode    │──▶│Frame Window │       │
//! │  │(BLE/replay) │   │  (24-bit)   │   │ (1000 max)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                              │ every 200ms  │
//! │                                              ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Emitter    │◀──│  Smoothing  │◀──│ Classifier  │       │
//! │  │ (verdicts)  │   │ vote + gate │   │  (softmax)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                                   │
//! │         ▼                                                   │
//! │  ┌─────────────┐                                            │
//! │  │Transparency │                                            │
//! │  │    Log      │                                            │
//! │  └─────────────┘                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use eeg_stress_agent::{ChannelEmitter, LinearClassifier, PipelineConfig, StressMonitor};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let classifier = LinearClassifier::new(Default::default())?;
//! let (emitter, events) = ChannelEmitter::new(64);
//! let mut monitor =
//!     StressMonitor::new(PipelineConfig::default(), Box::new(classifier), Arc::new(emitter))?;
//!
//! monitor.start()?;
//! monitor.ingest(&[0u8; 48])?;
//!
//! for event in events.try_iter() {
//!     println!("{} ({:.2})", event.label, event.probability);
//! }
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use collector::{Collector, CollectorError, PayloadSource, ReplaySource, SyntheticSource};
pub use config::{Config, ConfigError, PipelineConfig, SourceConfig, SourceKind};
pub use core::{
    decode_frame, ChannelEmitter, ClassScores, ClassificationEvent, Classifier, ClassifierError,
    ClassifierInput, DecodeError, EventEmitter, Frame, InputContract, Label, LinearClassifier,
    LinearClassifierConfig,
};
pub use pipeline::{InferenceScheduler, Pipeline, SchedulerError, StressMonitor, TickOutcome};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
