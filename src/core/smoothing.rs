//! Probability smoothing and majority voting over recent ticks.
//!
//! Each classified tick feeds one stress probability. The smoother keeps a
//! moving average over the last `C_p` probabilities; the voter discretizes
//! that average against the decision threshold and keeps the last `C_d`
//! labels, reporting the majority and how strongly it holds.

use crate::core::event::Label;
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Default number of probabilities averaged.
pub const DEFAULT_PROBABILITY_WINDOW: usize = 15;

/// Default number of labels voted over.
pub const DEFAULT_PREDICTION_WINDOW: usize = 15;

/// Default decision threshold on the averaged probability.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Bounded FIFO of stress probabilities with a moving average.
#[derive(Debug, Clone)]
pub struct ProbabilitySmoother {
    values: VecDeque<f64>,
    capacity: usize,
}

impl ProbabilitySmoother {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a probability and return the mean of the window.
    pub fn push(&mut self, probability: f64) -> f64 {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(probability);
        self.average().unwrap_or(probability)
    }

    /// Arithmetic mean of the retained probabilities.
    pub fn average(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.iter().mean())
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Result of one vote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote {
    pub label: Label,
    /// Share of the window agreeing with `label`
    pub confidence: f64,
    pub stress_count: usize,
    pub relaxed_count: usize,
}

/// Bounded FIFO of discrete labels with a majority vote.
#[derive(Debug, Clone)]
pub struct MajorityVoter {
    labels: VecDeque<Label>,
    capacity: usize,
}

impl MajorityVoter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            labels: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a label and return the vote over the window.
    pub fn push(&mut self, label: Label) -> Vote {
        if self.labels.len() == self.capacity {
            self.labels.pop_front();
        }
        self.labels.push_back(label);
        self.vote()
    }

    /// Majority over the window. Ties, including an empty window, go to Relaxed.
    pub fn vote(&self) -> Vote {
        let stress_count = self.labels.iter().filter(|l| l.is_stress()).count();
        let relaxed_count = self.labels.len() - stress_count;

        let label = if stress_count > relaxed_count {
            Label::Stress
        } else {
            Label::Relaxed
        };

        let confidence = if self.labels.is_empty() {
            0.0
        } else {
            stress_count.max(relaxed_count) as f64 / self.labels.len() as f64
        };

        Vote {
            label,
            confidence,
            stress_count,
            relaxed_count,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True while fewer than half the window's slots are filled.
    ///
    /// Compares against the real-valued half, so a capacity of 15 stays in
    /// warm-up for the first 7 labels.
    pub fn is_warming_up(&self) -> bool {
        self.labels.len() * 2 < self.capacity
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }
}

/// Output of [`Smoother::observe`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothed {
    pub avg_probability: f64,
    /// Label of this tick alone, from the averaged probability
    pub instant_label: Label,
    pub majority_label: Label,
    pub confidence: f64,
}

/// Smoother and voter chained together with the decision threshold.
#[derive(Debug, Clone)]
pub struct Smoother {
    probabilities: ProbabilitySmoother,
    predictions: MajorityVoter,
    decision_threshold: f64,
}

impl Smoother {
    pub fn new(probability_window: usize, prediction_window: usize, decision_threshold: f64) -> Self {
        Self {
            probabilities: ProbabilitySmoother::new(probability_window),
            predictions: MajorityVoter::new(prediction_window),
            decision_threshold,
        }
    }

    /// Feed one tick's stress probability through both windows.
    pub fn observe(&mut self, probability: f64) -> Smoothed {
        let avg_probability = self.probabilities.push(probability);

        // Strictly greater: an average sitting on the threshold is Relaxed.
        let instant_label = if avg_probability > self.decision_threshold {
            Label::Stress
        } else {
            Label::Relaxed
        };

        let vote = self.predictions.push(instant_label);

        Smoothed {
            avg_probability,
            instant_label,
            majority_label: vote.label,
            confidence: vote.confidence,
        }
    }

    pub fn probabilities(&self) -> &ProbabilitySmoother {
        &self.probabilities
    }

    pub fn predictions(&self) -> &MajorityVoter {
        &self.predictions
    }

    pub fn clear(&mut self) {
        self.probabilities.clear();
        self.predictions.clear();
    }
}
