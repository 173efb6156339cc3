//! The streaming inference pipeline.
//!
//! ```text
//!  producer (transport callback)          consumer (fixed-period tick)
//!  ─────────────────────────────          ────────────────────────────
//!  bytes ─▶ decode ─▶ ┌──────────────┐
//!                     │ frame window │ ─▶ classifier ─▶ softmax
//!                     └──────────────┘          │
//!                      (shared, locked)         ▼
//!                                  smoother ─▶ voter ─▶ gate ─▶ emitter
//! ```
//!
//! The frame window is the only state the two timelines share. Everything
//! downstream of the classifier belongs to the consumer side and is reset
//! on every stop.

pub mod monitor;
pub mod scheduler;

pub use monitor::StressMonitor;
pub use scheduler::{InferenceScheduler, SchedulerError};

use crate::config::{ConfigError, PipelineConfig};
use crate::core::classifier::{Classifier, ClassifierError, ClassifierInput, InputContract};
use crate::core::event::{ClassificationEvent, EventEmitter, Label};
use crate::core::frame::{decode_frame, DecodeError, Frame};
use crate::core::smoothing::Smoother;
use crate::core::stability::{GateDecision, StabilityGate, StabilityState};
use crate::core::window::SharedFrameWindow;
use crate::transparency::{create_shared_log, SharedTransparencyLog};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Details of a tick that reached the stability gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Stress probability from this tick's classifier output
    pub raw_probability: f64,
    /// Mean over the probability window
    pub avg_probability: f64,
    pub majority_label: Label,
    pub confidence: f64,
    pub consecutive: u32,
    pub decision: GateDecision,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Pipeline is stopped; nothing touched
    Inactive,
    /// Not enough frames for the classifier's input contract
    Idle,
    /// Classifier failed; no window state changed
    Failed(ClassifierError),
    /// Gate held the verdict back
    Suppressed(TickReport),
    /// Verdict was emitted
    Emitted(TickReport),
}

impl TickOutcome {
    pub fn emitted(&self) -> bool {
        matches!(self, TickOutcome::Emitted(_))
    }

    pub fn report(&self) -> Option<&TickReport> {
        match self {
            TickOutcome::Suppressed(report) | TickOutcome::Emitted(report) => Some(report),
            _ => None,
        }
    }
}

/// Consumer-side state, only ever touched by one tick at a time.
struct InferenceEngine {
    classifier: Box<dyn Classifier>,
    smoother: Smoother,
    gate: StabilityGate,
    running: bool,
}

impl InferenceEngine {
    fn reset(&mut self) {
        self.smoother.clear();
        self.gate.reset();
    }
}

/// Owns every window, counter and the classifier for one agent.
pub struct Pipeline {
    config: PipelineConfig,
    frames: SharedFrameWindow,
    engine: Mutex<InferenceEngine>,
    emitter: Arc<dyn EventEmitter>,
    log: SharedTransparencyLog,
}

impl Pipeline {
    /// Build a stopped pipeline. Invalid configurations are rejected here,
    /// before anything can be started.
    pub fn new(
        config: PipelineConfig,
        classifier: Box<dyn Classifier>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        if let InputContract::FullWindow { frames } = classifier.input_contract() {
            if frames == 0 || frames > config.window_capacity {
                return Err(ConfigError::Invalid(format!(
                    "classifier wants {frames} frames but the window holds at most {}",
                    config.window_capacity
                )));
            }
        }

        let engine = InferenceEngine {
            classifier,
            smoother: Smoother::new(
                config.probability_window_size,
                config.prediction_window_size,
                config.decision_threshold,
            ),
            gate: StabilityGate::new(config.stability_threshold),
            running: false,
        };

        Ok(Self {
            frames: SharedFrameWindow::new(config.window_capacity),
            engine: Mutex::new(engine),
            emitter,
            log: create_shared_log(),
            config,
        })
    }

    /// Record statistics into an existing log instead of a private one.
    pub fn with_log(mut self, log: SharedTransparencyLog) -> Self {
        self.log = log;
        self
    }

    /// Decode a payload and append it to the frame window.
    ///
    /// Runs on the producer timeline and works whether or not inference is
    /// running. Undecodable payloads are counted and dropped.
    pub fn ingest(&self, payload: &[u8]) -> Result<Frame, DecodeError> {
        self.log.record_payload();

        match decode_frame(payload) {
            Ok(frame) => {
                self.frames.push(frame);
                Ok(frame)
            }
            Err(e) => {
                self.log.record_decode_failure();
                warn!("Dropping payload: {e}");
                Err(e)
            }
        }
    }

    /// Begin a session from cold smoothing state. Returns false if already running.
    pub fn start(&self) -> bool {
        let mut engine = self.engine.lock();
        if engine.running {
            return false;
        }
        engine.reset();
        engine.running = true;
        info!(
            "Inference started (C_p={}, C_d={}, stability={}, threshold={})",
            self.config.probability_window_size,
            self.config.prediction_window_size,
            self.config.stability_threshold,
            self.config.decision_threshold
        );
        true
    }

    /// End the session and clear smoothing, voting and stability state.
    ///
    /// The frame window is left alone. Returns false if already stopped.
    pub fn stop(&self) -> bool {
        let mut engine = self.engine.lock();
        if !engine.running {
            return false;
        }
        engine.running = false;
        engine.reset();
        info!("Inference stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.engine.lock().running
    }

    /// Run one classification step against the newest frames.
    pub fn tick(&self) -> TickOutcome {
        // Held for the whole tick so ticks, start and stop never interleave.
        let mut engine = self.engine.lock();
        if !engine.running {
            return TickOutcome::Inactive;
        }
        self.log.record_tick();

        let contract = engine.classifier.input_contract();
        let (frame, result) = match contract {
            InputContract::LatestFrame => {
                let Some(frame) = self.frames.snapshot_latest() else {
                    debug!("Waiting for frames");
                    self.log.record_idle_tick();
                    return TickOutcome::Idle;
                };
                let result = engine.classifier.classify(ClassifierInput::Frame(&frame));
                (frame, result)
            }
            InputContract::FullWindow { frames: required } => {
                let Some(window) = self.frames.snapshot_recent(required) else {
                    debug!(
                        "Waiting for {required} frames, have {}",
                        self.frames.len()
                    );
                    self.log.record_idle_tick();
                    return TickOutcome::Idle;
                };
                let Some(&frame) = window.last() else {
                    self.log.record_idle_tick();
                    return TickOutcome::Idle;
                };
                let result = engine.classifier.classify(ClassifierInput::Window(&window));
                (frame, result)
            }
        };

        let raw_probability = match result.and_then(|scores| scores.stress_probability()) {
            Ok(p) => p,
            Err(e) => {
                warn!("Inference failed: {e}");
                self.log.record_classifier_failure();
                return TickOutcome::Failed(e);
            }
        };

        let smoothed = engine.smoother.observe(raw_probability);
        let warming_up = engine.smoother.predictions().is_warming_up();
        let decision = engine.gate.update(smoothed.majority_label, warming_up);
        let consecutive = engine.gate.state().consecutive_count;

        debug!(
            "p={raw_probability:.4} avg={:.4} majority={} confidence={:.2} consecutive={consecutive}",
            smoothed.avg_probability, smoothed.majority_label, smoothed.confidence
        );

        let report = TickReport {
            raw_probability,
            avg_probability: smoothed.avg_probability,
            majority_label: smoothed.majority_label,
            confidence: smoothed.confidence,
            consecutive,
            decision,
        };

        if !decision.emits() {
            debug!("Stabilizing ({} identical predictions)", consecutive + 1);
            self.log.record_suppressed();
            return TickOutcome::Suppressed(report);
        }

        info!(
            "Verdict: {} (avg {:.3}, confidence {:.2}{})",
            smoothed.majority_label,
            smoothed.avg_probability,
            smoothed.confidence,
            if decision == GateDecision::WarmUp {
                ", warm-up"
            } else {
                ""
            }
        );

        // Emitted under the lock: once stop() returns, nothing else is emitted.
        self.emitter.emit(ClassificationEvent {
            frame,
            label: smoothed.majority_label,
            probability: smoothed.avg_probability,
            confidence: smoothed.confidence,
            consecutive,
            emitted_at: Utc::now(),
        });
        self.log.record_event_emitted();

        TickOutcome::Emitted(report)
    }

    /// Shared handle to the frame window.
    pub fn frames(&self) -> &SharedFrameWindow {
        &self.frames
    }

    pub fn probability_window_len(&self) -> usize {
        self.engine.lock().smoother.probabilities().len()
    }

    pub fn prediction_window_len(&self) -> usize {
        self.engine.lock().smoother.predictions().len()
    }

    pub fn stability_state(&self) -> StabilityState {
        self.engine.lock().gate.state()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn log(&self) -> &SharedTransparencyLog {
        &self.log
    }
}
