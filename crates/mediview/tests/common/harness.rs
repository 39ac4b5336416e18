//! Test harness for isolated pipeline runs.
//!
//! The `TestHarness` owns a temp directory holding an on-disk SQLite
//! database, a scripted OCR engine behind the real single-worker executor,
//! and a job event broadcaster attached to the pipeline.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;

use mediview::broadcast::{JobEvent, JobEventBroadcaster};
use mediview::db::Database;
use mediview::pipeline::{Pipeline, PipelineConfig};
use mediview::processor::DocumentExtractor;
use mediview::store::SqliteJobStore;
use mediview::worker::SingleWorkerExecutor;

use super::builders::ScriptedEngine;

pub struct TestHarness {
    /// Keeps the database directory alive.
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub store: Arc<SqliteJobStore>,
    pub engine: Arc<ScriptedEngine>,
    pub events: JobEventBroadcaster,
    pub pipeline: Pipeline,
}

impl TestHarness {
    /// Harness whose engine reads a labelled Korean name off every image.
    pub fn new() -> Self {
        Self::with_engine(ScriptedEngine::new(&["성명", "홍길동"]))
    }

    pub fn with_engine(engine: ScriptedEngine) -> Self {
        Self::with_config(PipelineConfig::default(), engine)
    }

    pub fn with_config(config: PipelineConfig, engine: ScriptedEngine) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("mediview.db");
        let db = Database::open(&db_path).expect("Failed to open test database");
        let store = Arc::new(SqliteJobStore::new(db));

        let engine = Arc::new(engine);
        let extractor = DocumentExtractor::new(engine.clone(), config.ocr_dpi);
        let executor =
            SingleWorkerExecutor::spawn(extractor).expect("Failed to start OCR worker");

        let events = JobEventBroadcaster::new(256);
        let pipeline = Pipeline::new(Arc::new(config), store.clone(), Arc::new(executor))
            .with_progress(Arc::new(events.clone()));

        Self {
            temp_dir,
            db_path,
            store,
            engine,
            events,
            pipeline,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Opens a second handle on the same database file.
    pub fn reopen_store(&self) -> SqliteJobStore {
        SqliteJobStore::new(Database::open(&self.db_path).expect("Failed to reopen database"))
    }
}

/// Waits for the terminal event of `job_id`, failing the test after 10s.
pub async fn wait_for_terminal(rx: &mut broadcast::Receiver<JobEvent>, job_id: &str) -> JobEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event) if event.job_id == job_id && event.is_terminal() => return event,
                Ok(_) => continue,
                Err(e) => panic!("Event stream broke: {}", e),
            }
        }
    })
    .await
    .expect("Timed out waiting for job to finish")
}
