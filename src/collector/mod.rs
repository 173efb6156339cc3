//! Payload collection for the EEG stress agent.
//!
//! A collector runs a [`PayloadSource`] on a background thread and hands its
//! raw notification payloads to the consumer through a bounded channel, the
//! way a BLE notification callback would. Payloads are dropped when the
//! consumer falls behind.

pub mod replay;
pub mod synthetic;

pub use replay::{write_recording, ReplaySource};
pub use synthetic::SyntheticSource;

use crate::config::{SourceConfig, SourceKind};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Payloads buffered between the producer thread and the consumer.
pub const PAYLOAD_CHANNEL_CAPACITY: usize = 10_000;

/// Errors that can occur during payload collection.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Collector is already running")]
    AlreadyRunning,
    #[error("Replay source selected but no replay file configured")]
    MissingReplayFile,
    #[error("Payload source was lost when the producer thread panicked")]
    SourceLost,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that yields raw notification payloads, one per sample.
pub trait PayloadSource: Send + 'static {
    /// Next payload, or `None` once the source is exhausted.
    fn next_payload(&mut self) -> Option<Vec<u8>>;
}

type SourceBox = Box<dyn PayloadSource>;

/// Drives a payload source on its own thread.
pub struct Collector {
    sender: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
    interval: Duration,
    source: Option<SourceBox>,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<SourceBox>>,
    dropped: Arc<AtomicU64>,
}

impl Collector {
    pub fn new(source: impl PayloadSource, interval: Duration) -> Self {
        // Bounded so a stalled consumer cannot grow memory without limit
        let (sender, receiver) = bounded(PAYLOAD_CHANNEL_CAPACITY);
        Self {
            sender,
            receiver,
            interval,
            source: Some(Box::new(source)),
            shutdown: None,
            handle: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Build the collector described by the source section of the config.
    pub fn from_config(config: &SourceConfig) -> Result<Self, CollectorError> {
        match config.kind {
            SourceKind::Synthetic => Ok(Self::new(
                SyntheticSource::new(config.stress),
                config.sample_interval,
            )),
            SourceKind::Replay => {
                let path = config
                    .replay_file
                    .as_ref()
                    .ok_or(CollectorError::MissingReplayFile)?;
                Ok(Self::new(ReplaySource::open(path)?, config.sample_interval))
            }
        }
    }

    /// Start the producer thread.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.is_running() {
            return Err(CollectorError::AlreadyRunning);
        }
        self.reclaim_source();
        let mut source = self.source.take().ok_or(CollectorError::SourceLost)?;

        let (shutdown, shutdown_rx) = bounded::<()>(1);
        let sender = self.sender.clone();
        let interval = self.interval;
        let dropped = Arc::clone(&self.dropped);

        let handle = thread::spawn(move || {
            loop {
                let Some(payload) = source.next_payload() else {
                    info!("Payload source exhausted");
                    break;
                };
                // Drop rather than block the producer when the consumer lags
                if sender.try_send(payload).is_err() {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }

                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            }
            source
        });

        debug!("Collector started ({:?} interval)", interval);
        self.shutdown = Some(shutdown);
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the producer thread and wait for it to finish.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the producer immediately
        self.shutdown.take();
        self.reclaim_source();
    }

    /// True while the producer thread is delivering payloads.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Get the receiver for raw payloads.
    pub fn receiver(&self) -> &Receiver<Vec<u8>> {
        &self.receiver
    }

    /// Try to receive a payload without blocking.
    pub fn try_recv(&self) -> Option<Vec<u8>> {
        self.receiver.try_recv().ok()
    }

    /// Payloads dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn reclaim_source(&mut self) {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(source) => self.source = Some(source),
                Err(_) => warn!("Collector thread panicked"),
            }
        }
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.stop();
    }
}
