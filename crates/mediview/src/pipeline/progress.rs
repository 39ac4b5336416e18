use crate::broadcast::{JobEvent, JobEventBroadcaster};

/// Receives every job status change made by the pipeline.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: JobEvent);
}

/// No-op reporter for callers without subscribers.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: JobEvent) {}
}

impl ProgressReporter for JobEventBroadcaster {
    fn report(&self, event: JobEvent) {
        self.send(event);
    }
}
