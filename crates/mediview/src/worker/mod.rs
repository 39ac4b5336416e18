pub mod executor;
pub mod job;

pub use executor::{ExtractionResult, OcrExecutor, PendingExtraction, SingleWorkerExecutor, StartHook};
pub use job::{ExtractionTask, Job, JobStatus, NewJob};
