//! Fixed-period driver for [`Pipeline::tick`].

use super::Pipeline;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("no tokio runtime available to run the scheduler")]
    NoRuntime,
}

struct SchedulerTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Runs one tick per period on the current tokio runtime.
///
/// Ticks that would overlap are skipped rather than queued. Stopping cancels
/// the timer before the pipeline's state is cleared.
pub struct InferenceScheduler {
    pipeline: Arc<Pipeline>,
    period: Duration,
    task: Option<SchedulerTask>,
}

impl InferenceScheduler {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let period = pipeline.config().tick_period;
        Self {
            pipeline,
            period,
            task: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start the pipeline and its timer. Returns `Ok(false)` if already running.
    pub fn start(&mut self) -> Result<bool, SchedulerError> {
        if self.is_running() {
            return Ok(false);
        }
        // A task that ended on its own still needs its pipeline stopped.
        if self.task.take().is_some() {
            self.pipeline.stop();
        }

        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        self.pipeline.start();

        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let pipeline = Arc::clone(&self.pipeline);
        let period = self.period;

        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        pipeline.tick();
                    }
                }
            }
            debug!("Inference timer stopped");
        });

        debug!("Inference timer started ({:?} period)", period);
        self.task = Some(SchedulerTask { shutdown, handle });
        Ok(true)
    }

    /// Cancel the timer, then stop the pipeline. Returns false if not running.
    pub fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        let _ = task.shutdown.send(());
        task.handle.abort();
        self.pipeline.stop();
        true
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map_or(false, |task| !task.handle.is_finished())
    }
}

impl Drop for InferenceScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
