//! Core functionality for the EEG stress agent.
//!
//! This module contains:
//! - Frame decoding from the headset's 24-bit wire format
//! - The bounded sliding window of recent frames
//! - Probability smoothing, majority voting and the stability gate
//! - The classifier boundary and the emitted event type

pub mod classifier;
pub mod event;
pub mod frame;
pub mod smoothing;
pub mod stability;
pub mod window;

// Re-export commonly used types
pub use classifier::{
    softmax_stress, ClassScores, Classifier, ClassifierError, ClassifierInput, InputContract,
    LinearClassifier, LinearClassifierConfig,
};
pub use event::{ChannelEmitter, ClassificationEvent, EventEmitter, Label};
pub use frame::{decode_frame, encode_sample, DecodeError, Frame, CHANNEL_COUNT, FRAME_PAYLOAD_LEN};
pub use smoothing::{MajorityVoter, ProbabilitySmoother, Smoothed, Smoother, Vote};
pub use stability::{GateDecision, StabilityGate, StabilityState};
pub use window::{SharedFrameWindow, SlidingWindowBuffer};
