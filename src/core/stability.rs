//! Hysteresis gate on the majority label.
//!
//! A verdict is only emitted once the majority label has repeated
//! `stability_threshold` times in a row. While the prediction window is
//! still less than half full, the gate is bypassed so early output is
//! available; those early verdicts carry no hysteresis guarantee.

use crate::core::event::Label;

/// Default number of consecutive repeats required.
pub const DEFAULT_STABILITY_THRESHOLD: u32 = 5;

/// `{last_label, consecutive_count}`; empty at session start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StabilityState {
    pub last_label: Option<Label>,
    pub consecutive_count: u32,
}

/// Why the gate let a verdict through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Label has been stable long enough
    Stable,
    /// Prediction window still filling; emitted without hysteresis
    WarmUp,
    /// Still stabilizing; no event
    Suppressed,
}

impl GateDecision {
    pub fn emits(self) -> bool {
        !matches!(self, GateDecision::Suppressed)
    }
}

#[derive(Debug, Clone)]
pub struct StabilityGate {
    state: StabilityState,
    threshold: u32,
}

impl StabilityGate {
    pub fn new(threshold: u32) -> Self {
        Self {
            state: StabilityState::default(),
            threshold,
        }
    }

    /// Record a new majority label and decide whether to emit.
    ///
    /// Counting starts at the first repeat: two equal labels in a row give
    /// `consecutive_count == 1`.
    pub fn update(&mut self, label: Label, warming_up: bool) -> GateDecision {
        if self.state.last_label == Some(label) {
            self.state.consecutive_count = self.state.consecutive_count.saturating_add(1);
        } else {
            self.state.consecutive_count = 0;
        }
        self.state.last_label = Some(label);

        if self.state.consecutive_count >= self.threshold {
            GateDecision::Stable
        } else if warming_up {
            GateDecision::WarmUp
        } else {
            GateDecision::Suppressed
        }
    }

    pub fn state(&self) -> StabilityState {
        self.state
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.state = StabilityState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_starts_at_first_repeat() {
        let mut gate = StabilityGate::new(5);
        gate.update(Label::Stress, false);
        assert_eq!(gate.state().consecutive_count, 0);
        gate.update(Label::Stress, false);
        assert_eq!(gate.state().consecutive_count, 1);
        assert_eq!(gate.state().last_label, Some(Label::Stress));
    }

    #[test]
    fn test_emits_on_threshold_tick_only() {
        let mut gate = StabilityGate::new(3);
        let decisions: Vec<GateDecision> =
            (0..5).map(|_| gate.update(Label::Relaxed, false)).collect();

        assert_eq!(
            decisions,
            vec![
                GateDecision::Suppressed,
                GateDecision::Suppressed,
                GateDecision::Suppressed,
                GateDecision::Stable,
                GateDecision::Stable,
            ]
        );
    }

    #[test]
    fn test_label_change_resets_count() {
        let mut gate = StabilityGate::new(2);
        for _ in 0..4 {
            gate.update(Label::Stress, false);
        }
        assert_eq!(gate.update(Label::Relaxed, false), GateDecision::Suppressed);
        assert_eq!(gate.state().consecutive_count, 0);
    }

    #[test]
    fn test_warm_up_bypasses_hysteresis() {
        let mut gate = StabilityGate::new(5);
        assert_eq!(gate.update(Label::Stress, true), GateDecision::WarmUp);
        assert_eq!(gate.update(Label::Relaxed, true), GateDecision::WarmUp);
        assert!(GateDecision::WarmUp.emits());
        assert!(!GateDecision::Suppressed.emits());
    }

    #[test]
    fn test_reset() {
        let mut gate = StabilityGate::new(1);
        gate.update(Label::Stress, false);
        gate.update(Label::Stress, false);
        gate.reset();
        assert_eq!(gate.state(), StabilityState::default());
    }
}
