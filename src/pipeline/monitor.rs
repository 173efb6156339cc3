//! Control surface for a running agent: one pipeline plus its timer.

use super::scheduler::{InferenceScheduler, SchedulerError};
use super::Pipeline;
use crate::config::{ConfigError, PipelineConfig};
use crate::core::classifier::Classifier;
use crate::core::event::EventEmitter;
use crate::core::frame::{DecodeError, Frame};
use crate::transparency::SharedTransparencyLog;
use std::sync::Arc;

pub struct StressMonitor {
    pipeline: Arc<Pipeline>,
    scheduler: InferenceScheduler,
}

impl StressMonitor {
    pub fn new(
        config: PipelineConfig,
        classifier: Box<dyn Classifier>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_pipeline(Pipeline::new(config, classifier, emitter)?))
    }

    pub fn from_pipeline(pipeline: Pipeline) -> Self {
        let pipeline = Arc::new(pipeline);
        Self {
            scheduler: InferenceScheduler::new(Arc::clone(&pipeline)),
            pipeline,
        }
    }

    /// Same as [`StressMonitor::new`], recording into `log`.
    pub fn with_log(
        config: PipelineConfig,
        classifier: Box<dyn Classifier>,
        emitter: Arc<dyn EventEmitter>,
        log: SharedTransparencyLog,
    ) -> Result<Self, ConfigError> {
        let pipeline = Pipeline::new(config, classifier, emitter)?.with_log(log);
        Ok(Self::from_pipeline(pipeline))
    }

    /// Start periodic inference. Calling it again while running does nothing.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        self.scheduler.start().map(|_| ())
    }

    /// Stop periodic inference and reset smoothing state.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Entry point for the transport callback.
    pub fn ingest(&self, payload: &[u8]) -> Result<Frame, DecodeError> {
        self.pipeline.ingest(payload)
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }
}
