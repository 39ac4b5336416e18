use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::WorkerError;
use crate::worker::job::JobStatus;

/// Reasons a submission is rejected before any job is recorded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Filename is required")]
    MissingFilename,

    #[error("Unsupported file type '{0}': expected .pdf, .png, .jpg or .jpeg")]
    UnsupportedExtension(String),

    #[error("Unsupported language '{0}': expected 'en' or 'ko'")]
    UnsupportedLanguage(String),

    #[error("File is empty")]
    EmptyFile,

    #[error("File is {size} bytes, above the limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
}

/// Failures that end a job in the `failed` state.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("OCR worker failed: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Invalid submission: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Failed to record job: {0}")]
    Store(#[from] DatabaseError),

    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },
}

#[derive(Error, Debug)]
pub enum ResultError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job is still {0}")]
    Pending(JobStatus),

    #[error("Job failed: {0}")]
    Failed(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
