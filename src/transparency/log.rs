//! Session statistics for the inference pipeline.
//!
//! Tracks how much signal was processed and what the pipeline did with it,
//! without retaining any of the signal itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Payloads received from the transport
    payloads_received: AtomicU64,
    /// Payloads dropped because they did not decode
    decode_failures: AtomicU64,
    /// Inference ticks executed while running
    ticks: AtomicU64,
    /// Ticks with no usable frames
    idle_ticks: AtomicU64,
    /// Ticks aborted by the classifier
    classifier_failures: AtomicU64,
    /// Verdicts emitted
    events_emitted: AtomicU64,
    /// Verdicts held back by the stability gate
    ticks_suppressed: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            payloads_received: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            idle_ticks: AtomicU64::new(0),
            classifier_failures: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
            ticks_suppressed: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that accumulates on top of previously saved totals.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous statistics: {e}");
        }

        log
    }

    pub fn record_payload(&self) {
        self.payloads_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_idle_tick(&self) {
        self.idle_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_classifier_failure(&self) {
        self.classifier_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed(&self) {
        self.ticks_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            payloads_received: self.payloads_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
            classifier_failures: self.classifier_failures.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            ticks_suppressed: self.ticks_suppressed.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Payloads received: {}\n\
             - Payloads dropped (decode): {}\n\
             - Inference ticks: {} ({} idle, {} failed)\n\
             - Verdicts emitted: {}\n\
             - Verdicts held back (stabilizing): {}\n\
             - Session duration: {} seconds",
            stats.payloads_received,
            stats.decode_failures,
            stats.ticks,
            stats.idle_ticks,
            stats.classifier_failures,
            stats.events_emitted,
            stats.ticks_suppressed,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                payloads_received: stats.payloads_received,
                decode_failures: stats.decode_failures,
                ticks: stats.ticks,
                idle_ticks: stats.idle_ticks,
                classifier_failures: stats.classifier_failures,
                events_emitted: stats.events_emitted,
                ticks_suppressed: stats.ticks_suppressed,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.payloads_received
                    .store(persisted.payloads_received, Ordering::Relaxed);
                self.decode_failures
                    .store(persisted.decode_failures, Ordering::Relaxed);
                self.ticks.store(persisted.ticks, Ordering::Relaxed);
                self.idle_ticks.store(persisted.idle_ticks, Ordering::Relaxed);
                self.classifier_failures
                    .store(persisted.classifier_failures, Ordering::Relaxed);
                self.events_emitted
                    .store(persisted.events_emitted, Ordering::Relaxed);
                self.ticks_suppressed
                    .store(persisted.ticks_suppressed, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.payloads_received,
            &self.decode_failures,
            &self.ticks,
            &self.idle_ticks,
            &self.classifier_failures,
            &self.events_emitted,
            &self.ticks_suppressed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of session statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub payloads_received: u64,
    pub decode_failures: u64,
    pub ticks: u64,
    pub idle_ticks: u64,
    pub classifier_failures: u64,
    pub events_emitted: u64,
    pub ticks_suppressed: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    payloads_received: u64,
    decode_failures: u64,
    ticks: u64,
    idle_ticks: u64,
    classifier_failures: u64,
    events_emitted: u64,
    ticks_suppressed: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let log = TransparencyLog::new();

        log.record_payload();
        log.record_payload();
        log.record_decode_failure();
        log.record_tick();
        log.record_event_emitted();

        let stats = log.stats();
        assert_eq!(stats.payloads_received, 2);
        assert_eq!(stats.decode_failures, 1);
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.events_emitted, 1);
        assert_eq!(stats.ticks_suppressed, 0);
    }

    #[test]
    fn test_reset() {
        let log = TransparencyLog::new();
        log.record_payload();
        log.record_suppressed();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.payloads_received, 0);
        assert_eq!(stats.ticks_suppressed, 0);
    }

    #[test]
    fn test_persistence_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transparency.json");

        let first = TransparencyLog::with_persistence(path.clone());
        first.record_payload();
        first.record_classifier_failure();
        first.save().unwrap();

        let second = TransparencyLog::with_persistence(path);
        second.record_payload();
        let stats = second.stats();
        assert_eq!(stats.payloads_received, 2);
        assert_eq!(stats.classifier_failures, 1);
    }

    #[test]
    fn test_summary_format() {
        let summary = TransparencyLog::new().summary();
        assert!(summary.contains("Payloads received"));
        assert!(summary.contains("stabilizing"));
    }
}
