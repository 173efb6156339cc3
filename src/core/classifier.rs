//! Classifier boundary.
//!
//! The trained model lives outside this crate. A classifier declares which
//! input it consumes through [`Classifier::input_contract`]: either the
//! newest frame alone, or a fixed-length run of the newest frames. The
//! pipeline honours that declaration and never guesses.

use crate::core::frame::{Frame, CHANNEL_COUNT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a classifier can report. Any of them aborts the current tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("input shape mismatch: expected {expected} frames, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("invalid model output: {0}")]
    InvalidOutput(String),

    #[error("inference failed: {0}")]
    Runtime(String),
}

/// Which frames the classifier wants on each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputContract {
    /// Only the most recent frame
    #[default]
    LatestFrame,
    /// The newest `frames` frames, oldest first
    FullWindow { frames: usize },
}

/// Input handed to [`Classifier::classify`].
#[derive(Debug, Clone, Copy)]
pub enum ClassifierInput<'a> {
    Frame(&'a Frame),
    Window(&'a [Frame]),
}

impl ClassifierInput<'_> {
    /// Number of frames carried.
    pub fn len(&self) -> usize {
        match self {
            ClassifierInput::Frame(_) => 1,
            ClassifierInput::Window(frames) => frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-channel mean over the carried frames.
    pub fn channel_means(&self) -> [f64; CHANNEL_COUNT] {
        match self {
            ClassifierInput::Frame(frame) => frame.to_f64(),
            ClassifierInput::Window(frames) => {
                let mut sums = [0.0f64; CHANNEL_COUNT];
                for frame in frames.iter() {
                    for (sum, value) in sums.iter_mut().zip(frame.to_f64()) {
                        *sum += value;
                    }
                }
                let n = frames.len().max(1) as f64;
                sums.map(|s| s / n)
            }
        }
    }
}

/// Two class scores as returned by a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassScores {
    /// Raw logits; converted with softmax
    Logits { relaxed: f64, stress: f64 },
    /// Class probabilities; normalized by their sum
    Probabilities { relaxed: f64, stress: f64 },
}

impl ClassScores {
    /// Probability of the stress class.
    pub fn stress_probability(&self) -> Result<f64, ClassifierError> {
        let p = match *self {
            ClassScores::Logits { relaxed, stress } => softmax_stress(relaxed, stress),
            ClassScores::Probabilities { relaxed, stress } => {
                if relaxed < 0.0 || stress < 0.0 {
                    return Err(ClassifierError::InvalidOutput(format!(
                        "negative probability (relaxed {relaxed}, stress {stress})"
                    )));
                }
                stress / (relaxed + stress)
            }
        };

        if p.is_finite() {
            Ok(p.clamp(0.0, 1.0))
        } else {
            Err(ClassifierError::InvalidOutput(format!(
                "non-finite stress probability from {self:?}"
            )))
        }
    }
}

/// Two-class softmax, shifted by the larger logit so neither exponent overflows.
pub fn softmax_stress(logit_relaxed: f64, logit_stress: f64) -> f64 {
    let max = logit_relaxed.max(logit_stress);
    let e_relaxed = (logit_relaxed - max).exp();
    let e_stress = (logit_stress - max).exp();
    e_stress / (e_relaxed + e_stress)
}

/// A stress/relaxed classifier.
pub trait Classifier: Send {
    /// Input this classifier consumes. Defaults to the newest frame.
    fn input_contract(&self) -> InputContract {
        InputContract::LatestFrame
    }

    fn classify(&mut self, input: ClassifierInput<'_>) -> Result<ClassScores, ClassifierError>;
}

impl<F> Classifier for F
where
    F: FnMut(ClassifierInput<'_>) -> Result<ClassScores, ClassifierError> + Send,
{
    fn classify(&mut self, input: ClassifierInput<'_>) -> Result<ClassScores, ClassifierError> {
        self(input)
    }
}

/// Parameters of [`LinearClassifier`], stored inline in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearClassifierConfig {
    /// Per-channel weights for the relaxed logit
    pub relaxed_weights: Vec<f64>,
    /// Per-channel weights for the stress logit
    pub stress_weights: Vec<f64>,
    pub relaxed_bias: f64,
    pub stress_bias: f64,
    /// Multiplier applied to raw channel values before weighting
    pub input_scale: f64,
    pub input: InputContract,
}

impl Default for LinearClassifierConfig {
    /// Stress logit grows with mean absolute amplitude, scaled to microvolt-ish units.
    fn default() -> Self {
        Self {
            relaxed_weights: vec![0.0; CHANNEL_COUNT],
            stress_weights: vec![1.0 / CHANNEL_COUNT as f64; CHANNEL_COUNT],
            relaxed_bias: 0.0,
            stress_bias: -2.0,
            input_scale: 1.0e-4,
            input: InputContract::LatestFrame,
        }
    }
}

/// Two-logit linear model over (optionally window-averaged) channel values.
///
/// Under [`InputContract::FullWindow`] it scores the per-channel mean of
/// the window. Absolute values are used so the sign of the ADC reading
/// does not matter.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    config: LinearClassifierConfig,
}

impl LinearClassifier {
    pub fn new(config: LinearClassifierConfig) -> Result<Self, ClassifierError> {
        for (name, weights) in [
            ("relaxed_weights", &config.relaxed_weights),
            ("stress_weights", &config.stress_weights),
        ] {
            if weights.len() != CHANNEL_COUNT {
                return Err(ClassifierError::Unavailable(format!(
                    "{name} has {} entries, expected {CHANNEL_COUNT}",
                    weights.len()
                )));
            }
        }
        if let InputContract::FullWindow { frames: 0 } = config.input {
            return Err(ClassifierError::Unavailable(
                "full-window input needs at least one frame".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &LinearClassifierConfig {
        &self.config
    }
}

impl Classifier for LinearClassifier {
    fn input_contract(&self) -> InputContract {
        self.config.input
    }

    fn classify(&mut self, input: ClassifierInput<'_>) -> Result<ClassScores, ClassifierError> {
        if let InputContract::FullWindow { frames } = self.config.input {
            if input.len() != frames {
                return Err(ClassifierError::ShapeMismatch {
                    expected: frames,
                    actual: input.len(),
                });
            }
        }

        let features = input.channel_means().map(|v| v.abs() * self.config.input_scale);
        let dot = |weights: &[f64]| -> f64 {
            weights.iter().zip(features.iter()).map(|(w, x)| w * x).sum()
        };

        Ok(ClassScores::Logits {
            relaxed: dot(&self.config.relaxed_weights) + self.config.relaxed_bias,
            stress: dot(&self.config.stress_weights) + self.config.stress_bias,
        })
    }
}
