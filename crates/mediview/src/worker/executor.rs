use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};
use tokio::sync::oneshot;

use crate::error::WorkerError;
use crate::processor::{DocumentExtractor, PageDraft};
use crate::worker::job::ExtractionTask;

pub type ExtractionResult = Result<Vec<PageDraft>, WorkerError>;

/// Runs immediately before a task's extraction. An error skips the
/// extraction and resolves the task to [`WorkerError::StartRejected`].
pub type StartHook = Box<dyn FnOnce() -> Result<(), String> + Send>;

/// Handle to an enqueued extraction; resolves once the worker finishes it.
pub struct PendingExtraction {
    inner: Pending,
}

enum Pending {
    Waiting(oneshot::Receiver<ExtractionResult>),
    Ready(ExtractionResult),
}

impl PendingExtraction {
    pub fn waiting(receiver: oneshot::Receiver<ExtractionResult>) -> Self {
        Self {
            inner: Pending::Waiting(receiver),
        }
    }

    /// An already-resolved extraction, for executors that fail fast.
    pub fn ready(result: ExtractionResult) -> Self {
        Self {
            inner: Pending::Ready(result),
        }
    }

    /// Suspends the calling task until the result is available.
    pub async fn wait(self) -> ExtractionResult {
        match self.inner {
            Pending::Waiting(receiver) => receiver.await.unwrap_or(Err(WorkerError::ChannelClosed)),
            Pending::Ready(result) => result,
        }
    }
}

/// Runs extraction tasks away from the async runtime.
///
/// `submit` must enqueue synchronously so that submission order is the
/// order in which tasks are admitted.
pub trait OcrExecutor: Send + Sync {
    fn submit(&self, task: ExtractionTask) -> PendingExtraction;

    /// Like [`submit`](Self::submit), running `on_start` when the task is
    /// admitted. Executors without a queue of their own run it inline.
    fn submit_with_start(&self, task: ExtractionTask, on_start: StartHook) -> PendingExtraction {
        match on_start() {
            Ok(()) => self.submit(task),
            Err(e) => PendingExtraction::ready(Err(WorkerError::StartRejected(e))),
        }
    }
}

struct WorkItem {
    task: ExtractionTask,
    on_start: Option<StartHook>,
    reply: oneshot::Sender<ExtractionResult>,
    enqueued_at: Instant,
}

/// One dedicated thread that runs extraction tasks strictly one at a time,
/// in FIFO order.
///
/// A panic inside a task is caught and reported as
/// [`WorkerError::TaskPanicked`]; the thread keeps serving later tasks.
pub struct SingleWorkerExecutor {
    sender: Sender<WorkItem>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl SingleWorkerExecutor {
    pub fn spawn(extractor: DocumentExtractor) -> Result<Self, WorkerError> {
        let (sender, receiver) = unbounded::<WorkItem>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("mediview-ocr".to_string())
            .spawn(move || run_worker(extractor, receiver, shutdown_flag))
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        info!("Started OCR worker");

        Ok(Self {
            sender,
            worker: Mutex::new(Some(handle)),
            shutdown,
        })
    }

    /// Number of tasks waiting behind the one in flight.
    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }

    /// Stops accepting work. Tasks still queued resolve to
    /// [`WorkerError::ChannelClosed`]; the task in flight completes.
    pub fn shutdown(&self) {
        info!("Shutting down OCR worker...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Blocks until the worker thread has exited. Call after [`shutdown`](Self::shutdown).
    pub fn wait(&self) {
        let handle = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.join() {
                error!("OCR worker panicked: {:?}", e);
            }
            info!("OCR worker has stopped");
        }
    }
}

impl OcrExecutor for SingleWorkerExecutor {
    fn submit(&self, task: ExtractionTask) -> PendingExtraction {
        self.enqueue(task, None)
    }

    /// The hook runs on the worker thread, after every earlier task.
    fn submit_with_start(&self, task: ExtractionTask, on_start: StartHook) -> PendingExtraction {
        self.enqueue(task, Some(on_start))
    }
}

impl SingleWorkerExecutor {
    fn enqueue(&self, task: ExtractionTask, on_start: Option<StartHook>) -> PendingExtraction {
        if self.is_shutdown() {
            return PendingExtraction::ready(Err(WorkerError::ChannelClosed));
        }

        let (reply, receiver) = oneshot::channel();
        let item = WorkItem {
            task,
            on_start,
            reply,
            enqueued_at: Instant::now(),
        };
        match self.sender.send(item) {
            Ok(()) => {
                debug!("Extraction queued, {} task(s) waiting", self.queue_len());
                PendingExtraction::waiting(receiver)
            }
            Err(_) => PendingExtraction::ready(Err(WorkerError::ChannelClosed)),
        }
    }
}

impl Drop for SingleWorkerExecutor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn run_worker(extractor: DocumentExtractor, receiver: Receiver<WorkItem>, shutdown: Arc<AtomicBool>) {
    debug!("OCR worker started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("OCR worker received shutdown signal");
            break;
        }

        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(WorkItem {
                task,
                on_start,
                reply,
                enqueued_at,
            }) => {
                let _span = tracing::info_span!(
                    "worker.extract",
                    job_id = %task.job_id,
                    format = ?task.format,
                    lang = task.language.code()
                )
                .entered();
                debug!(
                    "Extracting job {} after {} ms in queue",
                    task.job_id,
                    enqueued_at.elapsed().as_millis()
                );

                let started = Instant::now();
                let result = panic::catch_unwind(AssertUnwindSafe(|| -> ExtractionResult {
                    if let Some(on_start) = on_start {
                        on_start().map_err(WorkerError::StartRejected)?;
                    }
                    Ok(extractor.extract(&task.bytes, task.format, task.language))
                }))
                .unwrap_or_else(|payload| {
                    Err(WorkerError::TaskPanicked(panic_message(payload.as_ref())))
                });

                match &result {
                    Ok(pages) => debug!(
                        "Job {} extracted {} pages in {} ms",
                        task.job_id,
                        pages.len(),
                        started.elapsed().as_millis()
                    ),
                    Err(e) => error!("Job {} extraction failed: {}", task.job_id, e),
                }

                if reply.send(result).is_err() {
                    debug!("Caller for job {} went away before the result", task.job_id);
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("OCR worker channel disconnected");
                break;
            }
        }
    }

    debug!("OCR worker stopped");
}
