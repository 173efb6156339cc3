//! Verdict labels, emitted classification events, and the emission boundary.

use crate::core::frame::Frame;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Binary verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Relaxed,
    Stress,
}

impl Label {
    pub fn is_stress(self) -> bool {
        self == Label::Stress
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Relaxed => "Relaxed",
            Label::Stress => "Stress",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record pushed to the consumer when the stability gate opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    /// Frame the verdict was computed from (the newest one at tick time)
    pub frame: Frame,
    /// Majority label
    pub label: Label,
    /// Smoothed stress probability (0-1)
    pub probability: f64,
    /// Share of the prediction window agreeing with `label` (0-1)
    pub confidence: f64,
    /// Consecutive repeats of `label` seen by the gate
    pub consecutive: u32,
    /// When the event was emitted
    pub emitted_at: DateTime<Utc>,
}

/// Sink for classification events.
///
/// Emission is fire-and-forget: there is no acknowledgement, and
/// implementations must not block the tick.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: ClassificationEvent);
}

impl<F> EventEmitter for F
where
    F: Fn(ClassificationEvent) + Send + Sync,
{
    fn emit(&self, event: ClassificationEvent) {
        self(event)
    }
}

/// Emitter backed by a bounded channel; events are dropped when full.
pub struct ChannelEmitter {
    sender: Sender<ClassificationEvent>,
    dropped: AtomicU64,
}

impl ChannelEmitter {
    /// Create an emitter and the receiver the consumer reads from.
    pub fn new(capacity: usize) -> (Self, Receiver<ClassificationEvent>) {
        let (sender, receiver) = bounded(capacity.max(1));
        (
            Self {
                sender,
                dropped: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Number of events dropped because the consumer fell behind or went away.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventEmitter for ChannelEmitter {
    fn emit(&self, event: ClassificationEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
