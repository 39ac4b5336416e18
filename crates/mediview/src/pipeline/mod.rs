pub mod config;
pub mod error;
pub mod fusion;
pub mod progress;
pub mod request;
pub mod runner;

pub use config::PipelineConfig;
pub use error::{PipelineError, ResultError, SubmitError, ValidationError};
pub use fusion::{DocumentResult, Item, Page};
pub use progress::{NoopProgress, ProgressReporter};
pub use request::{SubmitMode, SubmitRequest};
pub use runner::{Pipeline, Submission};
