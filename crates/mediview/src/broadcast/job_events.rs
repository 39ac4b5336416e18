//! Job status events for live streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::worker::job::JobStatus;

/// Published on every job status change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: String,
    pub status: JobStatus,
    /// Human-readable description of the change.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Set once the job is done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Set when the job failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobEvent {
    fn new(job_id: &str, status: JobStatus, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            status,
            message: message.to_string(),
            timestamp: Utc::now(),
            page_count: None,
            error: None,
        }
    }

    pub fn queued(job_id: &str) -> Self {
        Self::new(job_id, JobStatus::Queued, "Job queued for processing")
    }

    pub fn processing(job_id: &str) -> Self {
        Self::new(job_id, JobStatus::Processing, "Running text extraction...")
    }

    pub fn done(job_id: &str, page_count: u32) -> Self {
        Self {
            page_count: Some(page_count),
            ..Self::new(job_id, JobStatus::Done, "Processing completed successfully")
        }
    }

    pub fn failed(job_id: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(job_id, JobStatus::Failed, "Processing failed")
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Fan-out of [`JobEvent`]s to any number of subscribers.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
