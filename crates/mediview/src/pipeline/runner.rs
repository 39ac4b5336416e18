use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::broadcast::JobEvent;
use crate::config::Settings;
use crate::db::stats_repo::JobStats;
use crate::db::{Database, DatabaseError};
use crate::error::{ConfigError, MediviewError};
use crate::pii::PiiDetector;
use crate::processor::{DocumentExtractor, TesseractEngine};
use crate::sanitize;
use crate::store::{JobList, JobQuery, JobStore, SqliteJobStore};
use crate::worker::executor::{OcrExecutor, PendingExtraction, SingleWorkerExecutor, StartHook};
use crate::worker::job::{ExtractionTask, Job, JobStatus, NewJob};

use super::config::PipelineConfig;
use super::error::{PipelineError, ResultError, SubmitError};
use super::fusion::{fuse_document, DocumentResult};
use super::progress::{NoopProgress, ProgressReporter};
use super::request::{validate, SubmitMode, SubmitRequest, ValidatedRequest};

/// Outcome of [`Pipeline::submit`].
#[derive(Debug, Clone)]
pub enum Submission {
    /// Synchronous mode: the job finished and its result is attached.
    Completed { job: Job, result: DocumentResult },
    /// Asynchronous mode: the job was accepted; poll [`Pipeline::get_result`].
    Queued { job_id: String, status: JobStatus },
}

impl Submission {
    pub fn job_id(&self) -> &str {
        match self {
            Submission::Completed { job, .. } => &job.id,
            Submission::Queued { job_id, .. } => job_id,
        }
    }
}

/// Drives jobs from submission to a terminal state.
///
/// Cheap to clone; clones share the store, the executor and the reporter.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    store: Arc<dyn JobStore>,
    executor: Arc<dyn OcrExecutor>,
    detector: Arc<PiiDetector>,
    progress: Arc<dyn ProgressReporter>,
}

impl Pipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        store: Arc<dyn JobStore>,
        executor: Arc<dyn OcrExecutor>,
    ) -> Self {
        let detector = Arc::new(config.pii_detector());
        Self {
            config,
            store,
            executor,
            detector,
            progress: Arc::new(NoopProgress),
        }
    }

    /// Publishes every status change to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Production constructor: opens the database, starts the Tesseract
    /// worker and wires them together.
    pub fn from_settings(settings: &Settings) -> Result<Self, MediviewError> {
        let config = Arc::new(PipelineConfig::from_settings(settings));

        let db_path = settings
            .resolved_database_path()
            .ok_or_else(|| ConfigError::Validation {
                message: "No database_path configured and no home directory found".to_string(),
            })?;
        let store = SqliteJobStore::new(Database::open(&db_path)?);

        let engine = Arc::new(TesseractEngine::new(config.tessdata_dir.clone()));
        let extractor = DocumentExtractor::new(engine, config.ocr_dpi);
        let executor = SingleWorkerExecutor::spawn(extractor)?;

        info!(
            dpi = config.ocr_dpi,
            pii = config.pii_enabled,
            "Pipeline ready"
        );

        Ok(Self::new(config, Arc::new(store), Arc::new(executor)))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validates and records a document, then processes it.
    ///
    /// Validation failures create no job. In [`SubmitMode::Sync`] this
    /// resolves once the job is terminal; in [`SubmitMode::Async`] it
    /// resolves as soon as the job is queued.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Submission, SubmitError> {
        let request = validate(request, &self.config).map_err(|e| {
            debug!(error = %e, "Rejected submission");
            e
        })?;

        let job = self.store.create_job(&NewJob::new(
            &request.filename,
            request.declared_content_type.as_deref(),
            &request.language_code,
        ))?;
        self.progress.report(JobEvent::queued(&job.id));

        let span = info_span!("pipeline",
            job_id = %job.id,
            filename = %sanitize::redact_filename(&request.filename),
            content_type = %request.content_type,
            lang = %request.language_code,
            bytes = request.bytes.len(),
        );
        let task = extraction_task(&job.id, &request);

        match request.mode {
            SubmitMode::Sync => self.run_sync(job, task, span).await,
            SubmitMode::Async => Ok(self.run_async(job, task, span)),
        }
    }

    async fn run_sync(&self, job: Job, task: ExtractionTask, span: Span) -> Result<Submission, SubmitError> {
        let outcome = match span.in_scope(|| self.mark_processing(&job.id)) {
            Ok(()) => {
                let pending = self.executor.submit(task);
                self.complete(&job.id, pending).instrument(span.clone()).await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok((job, result)) => Ok(Submission::Completed { job, result }),
            Err(e) => {
                let message = e.to_string();
                span.in_scope(|| self.record_failure(&job.id, &message));
                Err(SubmitError::JobFailed {
                    job_id: job.id,
                    message,
                })
            }
        }
    }

    fn run_async(&self, job: Job, task: ExtractionTask, span: Span) -> Submission {
        // Enqueue before returning so admission order is submission order.
        // The job turns `processing` on the worker, right before extraction.
        let on_start: StartHook = {
            let pipeline = self.clone();
            let job_id = job.id.clone();
            let span = span.clone();
            Box::new(move || {
                span.in_scope(|| pipeline.mark_processing(&job_id))
                    .map_err(|e| e.to_string())
            })
        };
        let pending = self.executor.submit_with_start(task, on_start);
        let pipeline = self.clone();
        let job_id = job.id.clone();

        tokio::spawn(
            async move {
                if let Err(e) = pipeline.complete(&job_id, pending).await {
                    pipeline.record_failure(&job_id, &e.to_string());
                }
            }
            .instrument(span),
        );

        Submission::Queued {
            job_id: job.id,
            status: job.status,
        }
    }

    fn mark_processing(&self, job_id: &str) -> Result<(), PipelineError> {
        self.store
            .transition(job_id, JobStatus::Processing, None, None)?;
        self.progress.report(JobEvent::processing(job_id));
        Ok(())
    }

    /// Awaits extraction, then fuses, persists and marks the job done.
    async fn complete(
        &self,
        job_id: &str,
        pending: PendingExtraction,
    ) -> Result<(Job, DocumentResult), PipelineError> {
        let drafts = pending.wait().await?;

        let result = info_span!("fuse", pages = drafts.len())
            .in_scope(|| fuse_document(drafts, &self.detector));
        let sensitive = result.sensitive_items().count();

        info_span!("persist").in_scope(|| self.store.save_pages(job_id, &result.pages))?;

        let page_count = result.page_count();
        let job = self
            .store
            .transition(job_id, JobStatus::Done, None, Some(page_count))?;
        self.progress.report(JobEvent::done(job_id, page_count));

        info!(
            pages = page_count,
            items = result.item_count(),
            sensitive,
            "Job completed"
        );
        Ok((job, result))
    }

    /// Marks a job failed. A failure to record the failure is only logged,
    /// and no event is published for a status the store does not hold.
    fn record_failure(&self, job_id: &str, message: &str) {
        warn!(error = %message, "Job failed");
        match self
            .store
            .transition(job_id, JobStatus::Failed, Some(message), None)
        {
            Ok(_) => self.progress.report(JobEvent::failed(job_id, message)),
            Err(e) => error!(error = %e, "Failed to record job failure"),
        }
    }

    /// The stored result of a finished job.
    pub fn get_result(&self, job_id: &str) -> Result<DocumentResult, ResultError> {
        let job = self
            .store
            .get_job(job_id)?
            .ok_or_else(|| ResultError::NotFound(job_id.to_string()))?;

        match job.status {
            JobStatus::Queued | JobStatus::Processing => Err(ResultError::Pending(job.status)),
            JobStatus::Failed => Err(ResultError::Failed(
                job.error_message
                    .unwrap_or_else(|| "unknown error".to_string()),
            )),
            JobStatus::Done => Ok(DocumentResult {
                pages: self.store.load_pages(job_id)?,
            }),
        }
    }

    pub fn job(&self, job_id: &str) -> Result<Option<Job>, DatabaseError> {
        self.store.get_job(job_id)
    }

    pub fn list_jobs(&self, query: &JobQuery) -> Result<JobList, DatabaseError> {
        self.store.list_jobs(query)
    }

    pub fn stats(&self) -> Result<JobStats, DatabaseError> {
        self.store.stats()
    }
}

fn extraction_task(job_id: &str, request: &ValidatedRequest) -> ExtractionTask {
    ExtractionTask {
        job_id: job_id.to_string(),
        bytes: Arc::clone(&request.bytes),
        format: request.format,
        language: request.language,
    }
}
