//! Medical document text extraction with PII masking.
//!
//! A [`Pipeline`] accepts a PDF or image, extracts positioned text on a
//! single OCR worker, masks resident numbers and labelled personal names,
//! and stores the result in SQLite.

pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod pii;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod store;
pub mod worker;

pub use broadcast::{JobEvent, JobEventBroadcaster};
pub use config::{load_settings, load_settings_with_env, Settings};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, MediviewError, ProcessError, Result, WorkerError};
pub use logging::init_logging;
pub use pii::{PiiDetector, PiiKind, Sensitivity};
pub use pipeline::{
    DocumentResult, Item, Page, Pipeline, PipelineConfig, ResultError, SubmitError, SubmitMode,
    SubmitRequest, Submission, ValidationError,
};
pub use processor::{BoundingBox, DocumentExtractor, DocumentFormat, OcrEngine, OcrLanguage, TesseractEngine};
pub use store::{JobList, JobQuery, JobStore, SqliteJobStore};
pub use worker::{Job, JobStatus, OcrExecutor, SingleWorkerExecutor};
