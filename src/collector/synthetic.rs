//! Deterministic 16-channel test signal.

use super::PayloadSource;
use crate::core::frame::{Frame, CHANNEL_COUNT, SAMPLE_MAX, SAMPLE_MIN};
use std::f64::consts::TAU;

/// Nominal rate the signal is sampled at, independent of delivery cadence.
const SAMPLE_RATE_HZ: f64 = 250.0;

const RELAXED_AMPLITUDE: f64 = 3_000.0;
const STRESS_OFFSET: f64 = 60_000.0;
const STRESS_AMPLITUDE: f64 = 20_000.0;

/// Sinusoid generator: alpha-band rhythm when relaxed, a large
/// beta-band signal on a raised baseline in stress mode.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    sample: u64,
    stress: bool,
}

impl SyntheticSource {
    pub fn new(stress: bool) -> Self {
        Self { sample: 0, stress }
    }

    pub fn is_stress(&self) -> bool {
        self.stress
    }

    /// Frame for sample index `n`.
    pub fn frame_at(&self, n: u64) -> Frame {
        let t = n as f64 / SAMPLE_RATE_HZ;
        let mut channels = [0i32; CHANNEL_COUNT];

        for (c, slot) in channels.iter_mut().enumerate() {
            let phase = c as f64 * 0.4;
            let value = if self.stress {
                let freq = 20.0 + c as f64;
                STRESS_OFFSET + STRESS_AMPLITUDE * (TAU * freq * t + phase).sin()
            } else {
                let freq = 8.0 + c as f64 * 0.25;
                RELAXED_AMPLITUDE * (TAU * freq * t + phase).sin()
            };
            *slot = (value.round() as i32).clamp(SAMPLE_MIN, SAMPLE_MAX);
        }

        // Values are clamped to 24 bits above, so construction cannot fail.
        Frame::new(channels).unwrap_or_else(|_| Frame::default())
    }

    /// Next frame of the stream.
    pub fn next_frame(&mut self) -> Frame {
        let frame = self.frame_at(self.sample);
        self.sample = self.sample.wrapping_add(1);
        frame
    }
}

impl PayloadSource for SyntheticSource {
    fn next_payload(&mut self) -> Option<Vec<u8>> {
        Some(self.next_frame().to_payload().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{Classifier, ClassifierInput, LinearClassifier};
    use crate::core::frame::decode_frame;

    #[test]
    fn test_deterministic() {
        let mut a = SyntheticSource::new(false);
        let mut b = SyntheticSource::new(false);
        for _ in 0..10 {
            assert_eq!(a.next_payload(), b.next_payload());
        }
    }

    #[test]
    fn test_payloads_decode() {
        let mut source = SyntheticSource::new(true);
        for _ in 0..50 {
            let payload = source.next_payload().unwrap();
            assert_eq!(payload.len(), 48);
            assert!(decode_frame(&payload).is_ok());
        }
    }

    #[test]
    fn test_default_classifier_separates_modes() {
        let mut classifier = LinearClassifier::new(Default::default()).unwrap();

        for (stress, expect_stress) in [(false, false), (true, true)] {
            let mut source = SyntheticSource::new(stress);
            for _ in 0..100 {
                let frame = source.next_frame();
                let p = classifier
                    .classify(ClassifierInput::Frame(&frame))
                    .unwrap()
                    .stress_probability()
                    .unwrap();
                assert_eq!(p > 0.5, expect_stress, "p = {p}");
            }
        }
    }
}
