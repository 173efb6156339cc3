//! Bounded sliding window of recent frames.
//!
//! The window is the only state touched by both the ingest path and the
//! inference tick, so it is shared behind a single mutex. Neither side
//! ever holds a reference into the buffer outside the lock: readers get
//! copies of the frames they need.

use crate::core::frame::Frame;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of frames retained.
pub const DEFAULT_WINDOW_CAPACITY: usize = 1000;

/// FIFO of frames with oldest-first eviction.
#[derive(Debug, Clone)]
pub struct SlidingWindowBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl SlidingWindowBuffer {
    /// Create an empty window. `capacity` must be non-zero; the pipeline
    /// validates this before construction.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity.min(DEFAULT_WINDOW_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Append a frame, evicting the oldest one when full.
    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// The most recently pushed frame.
    pub fn snapshot_latest(&self) -> Option<Frame> {
        self.frames.back().copied()
    }

    /// The newest `count` frames in arrival order, or `None` if fewer are held.
    pub fn snapshot_recent(&self, count: usize) -> Option<Vec<Frame>> {
        if count == 0 || self.frames.len() < count {
            return None;
        }
        let start = self.frames.len() - count;
        Some(self.frames.range(start..).copied().collect())
    }

    /// Whether at least one frame is present.
    pub fn is_ready(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate frames oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Thread-safe handle to a [`SlidingWindowBuffer`].
///
/// Cloning shares the same underlying window.
#[derive(Debug, Clone)]
pub struct SharedFrameWindow {
    inner: Arc<Mutex<SlidingWindowBuffer>>,
}

impl SharedFrameWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlidingWindowBuffer::new(capacity))),
        }
    }

    /// Producer side: append one decoded frame.
    pub fn push(&self, frame: Frame) {
        self.inner.lock().push(frame);
    }

    /// Consumer side: copy of the newest frame.
    pub fn snapshot_latest(&self) -> Option<Frame> {
        self.inner.lock().snapshot_latest()
    }

    /// Consumer side: copy of the newest `count` frames.
    pub fn snapshot_recent(&self, count: usize) -> Option<Vec<Frame>> {
        self.inner.lock().snapshot_recent(count)
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock().is_ready()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Copy of every frame, oldest first.
    pub fn to_vec(&self) -> Vec<Frame> {
        self.inner.lock().iter().copied().collect()
    }
}
