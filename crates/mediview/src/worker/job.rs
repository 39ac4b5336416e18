use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::processor::{DocumentFormat, OcrLanguage};

/// Lifecycle status of a job.
///
/// `Queued` is initial; `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "done" => Some(JobStatus::Done),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Returns true if the state machine allows moving from `self` to `next`.
    ///
    /// A queued job may fail before it starts processing (e.g. the worker is
    /// gone), so `Queued -> Failed` is allowed; `Queued -> Done` is not.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Done)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A processing request as recorded in the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub filename: String,
    /// Content type as declared by the submitter, not the corrected one.
    pub content_type: Option<String>,
    pub language: String,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub page_count: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields supplied when a job is first recorded.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub language: String,
}

impl NewJob {
    pub fn new(filename: &str, content_type: Option<&str>, language: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            content_type: content_type.map(str::to_string),
            language: language.to_string(),
        }
    }
}

/// Unit of work handed to the OCR executor.
#[derive(Clone)]
pub struct ExtractionTask {
    pub job_id: String,
    pub bytes: Arc<Vec<u8>>,
    pub format: DocumentFormat,
    pub language: OcrLanguage,
}

impl fmt::Debug for ExtractionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionTask")
            .field("job_id", &self.job_id)
            .field("bytes.len", &self.bytes.len())
            .field("format", &self.format)
            .field("language", &self.language)
            .finish()
    }
}
