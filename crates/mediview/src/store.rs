//! Record store for jobs and their extracted pages.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::job_repo::{self, JobFilter, JobRow, StatusUpdate};
use crate::db::page_repo::{self, ItemRow, PageRow};
use crate::db::stats_repo::{self, JobStats};
use crate::db::{format_timestamp, parse_timestamp, Database, DatabaseError};
use crate::pipeline::fusion::{Item, Page};
use crate::processor::BoundingBox;
use crate::worker::job::{Job, JobStatus, NewJob};

/// Listing filter. Bounds on `created_at` are inclusive.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Defaults to 100.
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// One page of a job listing, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobList {
    pub jobs: Vec<Job>,
    /// Number of jobs matching the filter, ignoring limit and offset.
    pub total: u64,
}

/// Persistence contract used by the pipeline.
pub trait JobStore: Send + Sync {
    /// Records a new job in the `queued` state.
    fn create_job(&self, job: &NewJob) -> Result<Job, DatabaseError>;

    fn get_job(&self, id: &str) -> Result<Option<Job>, DatabaseError>;

    /// Moves a job to `to`, recording the error text and page count.
    ///
    /// `completed_at` is stamped when `to` is terminal and cleared otherwise.
    /// Fails with [`DatabaseError::InvalidTransition`] when the state machine
    /// forbids the move, including when another writer got there first.
    fn transition(
        &self,
        id: &str,
        to: JobStatus,
        error_message: Option<&str>,
        page_count: Option<u32>,
    ) -> Result<Job, DatabaseError>;

    /// Writes every page and item of a job atomically.
    fn save_pages(&self, job_id: &str, pages: &[Page]) -> Result<(), DatabaseError>;

    fn load_pages(&self, job_id: &str) -> Result<Vec<Page>, DatabaseError>;

    fn list_jobs(&self, query: &JobQuery) -> Result<JobList, DatabaseError>;

    fn stats(&self) -> Result<JobStats, DatabaseError>;
}

/// [`JobStore`] backed by the SQLite [`Database`].
#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

// ─── Row conversion ─────────────────────────────────────────────────────────

fn job_from_row(row: JobRow) -> Result<Job, DatabaseError> {
    let status = JobStatus::parse(&row.status).ok_or_else(|| DatabaseError::CorruptRow {
        table: "jobs",
        reason: format!("unknown status '{}' for job {}", row.status, row.id),
    })?;
    let created_at = parse_timestamp(&row.created_at, "jobs")?;
    let completed_at = row
        .completed_at
        .as_deref()
        .map(|s| parse_timestamp(s, "jobs"))
        .transpose()?;

    Ok(Job {
        id: row.id,
        filename: row.filename,
        content_type: row.content_type,
        language: row.lang,
        status,
        error_message: row.error_message,
        page_count: to_u32(row.page_count, "jobs")?,
        created_at,
        completed_at,
    })
}

fn to_u32(value: i64, table: &'static str) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|_| DatabaseError::CorruptRow {
        table,
        reason: format!("value {} out of range", value),
    })
}

fn to_i32(value: i64, table: &'static str) -> Result<i32, DatabaseError> {
    i32::try_from(value).map_err(|_| DatabaseError::CorruptRow {
        table,
        reason: format!("value {} out of range", value),
    })
}

fn page_to_row(page: &Page) -> PageRow {
    PageRow {
        page_index: page.page_index as i64,
        width: page.width as i64,
        height: page.height as i64,
        items: page
            .items
            .iter()
            .map(|item| ItemRow {
                text: item.text.clone(),
                x: item.bbox.x as i64,
                y: item.bbox.y as i64,
                w: item.bbox.w as i64,
                h: item.bbox.h as i64,
                confidence: item.confidence as f64,
                is_sensitive: item.is_sensitive,
                masked_text: item.masked_text.clone(),
            })
            .collect(),
    }
}

fn page_from_row(row: PageRow) -> Result<Page, DatabaseError> {
    let items = row
        .items
        .into_iter()
        .map(|item| {
            Ok(Item {
                bbox: BoundingBox::new(
                    to_i32(item.x, "items")?,
                    to_i32(item.y, "items")?,
                    to_i32(item.w, "items")?,
                    to_i32(item.h, "items")?,
                ),
                text: item.text,
                confidence: item.confidence as f32,
                is_sensitive: item.is_sensitive,
                masked_text: item.masked_text,
            })
        })
        .collect::<Result<Vec<_>, DatabaseError>>()?;

    Ok(Page {
        page_index: to_u32(row.page_index, "pages")?,
        width: to_u32(row.width, "pages")?,
        height: to_u32(row.height, "pages")?,
        items,
    })
}

// ─── JobStore impl ──────────────────────────────────────────────────────────

impl JobStore for SqliteJobStore {
    fn create_job(&self, job: &NewJob) -> Result<Job, DatabaseError> {
        let row = JobRow {
            id: job.id.clone(),
            filename: job.filename.clone(),
            content_type: job.content_type.clone(),
            lang: job.language.clone(),
            page_count: 0,
            status: JobStatus::Queued.as_str().to_string(),
            error_message: None,
            created_at: format_timestamp(&Utc::now()),
            completed_at: None,
        };
        job_repo::insert(&self.db, &row)?;
        log::debug!("Created job {}", row.id);
        job_from_row(row)
    }

    fn get_job(&self, id: &str) -> Result<Option<Job>, DatabaseError> {
        job_repo::find_by_id(&self.db, id)?.map(job_from_row).transpose()
    }

    fn transition(
        &self,
        id: &str,
        to: JobStatus,
        error_message: Option<&str>,
        page_count: Option<u32>,
    ) -> Result<Job, DatabaseError> {
        let current = self
            .get_job(id)?
            .ok_or_else(|| DatabaseError::JobNotFound(id.to_string()))?;

        let invalid = |from: JobStatus| DatabaseError::InvalidTransition {
            job_id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        };

        if !current.status.can_transition_to(to) {
            return Err(invalid(current.status));
        }

        let completed_at = to.is_terminal().then(|| format_timestamp(&Utc::now()));
        let update = StatusUpdate {
            expected: current.status.as_str(),
            status: to.as_str(),
            error_message,
            page_count: page_count.map(i64::from),
            completed_at: completed_at.as_deref(),
        };

        if !job_repo::update_status(&self.db, id, &update)? {
            // Lost a race with another writer; report what it left behind.
            let latest = self
                .get_job(id)?
                .ok_or_else(|| DatabaseError::JobNotFound(id.to_string()))?;
            return Err(invalid(latest.status));
        }

        log::debug!("Job {}: {} -> {}", id, current.status, to);

        self.get_job(id)?
            .ok_or_else(|| DatabaseError::JobNotFound(id.to_string()))
    }

    fn save_pages(&self, job_id: &str, pages: &[Page]) -> Result<(), DatabaseError> {
        let rows: Vec<PageRow> = pages.iter().map(page_to_row).collect();
        page_repo::insert_document(&self.db, job_id, &rows)
    }

    fn load_pages(&self, job_id: &str) -> Result<Vec<Page>, DatabaseError> {
        page_repo::find_by_job(&self.db, job_id)?
            .into_iter()
            .map(page_from_row)
            .collect()
    }

    fn list_jobs(&self, query: &JobQuery) -> Result<JobList, DatabaseError> {
        let filter = JobFilter {
            status: query.status.map(|s| s.as_str().to_string()),
            from_date: query.from.as_ref().map(format_timestamp),
            to_date: query.to.as_ref().map(format_timestamp),
            limit: query.limit,
            offset: query.offset,
        };
        let (rows, total) = job_repo::query(&self.db, &filter)?;
        let jobs = rows
            .into_iter()
            .map(job_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(JobList { jobs, total })
    }

    fn stats(&self) -> Result<JobStats, DatabaseError> {
        stats_repo::summary(&self.db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteJobStore {
        SqliteJobStore::new(Database::open_in_memory().unwrap())
    }

    fn new_job() -> NewJob {
        NewJob::new("scan.pdf", Some("application/pdf"), "ko")
    }

    fn sample_page(index: u32) -> Page {
        Page {
            page_index: index,
            width: 2550,
            height: 3300,
            items: vec![
                Item {
                    text: "성명".to_string(),
                    bbox: BoundingBox::new(10, 20, 30, 40),
                    confidence: 0.75,
                    is_sensitive: false,
                    masked_text: None,
                },
                Item {
                    text: "홍길동".to_string(),
                    bbox: BoundingBox::ZERO,
                    confidence: 1.0,
                    is_sensitive: true,
                    masked_text: Some("홍길*".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_create_job_is_queued() {
        let store = store();
        let job = store.create_job(&new_job()).unwrap();

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.page_count, 0);
        assert!(job.completed_at.is_none());
        assert_eq!(job.language, "ko");
        assert_eq!(store.get_job(&job.id).unwrap(), Some(job));
    }

    #[test]
    fn test_get_unknown_job() {
        assert!(store().get_job("missing").unwrap().is_none());
    }

    #[test]
    fn test_completed_at_set_only_when_terminal() {
        let store = store();
        let job = store.create_job(&new_job()).unwrap();

        let processing = store
            .transition(&job.id, JobStatus::Processing, None, None)
            .unwrap();
        assert!(processing.completed_at.is_none());

        let done = store
            .transition(&job.id, JobStatus::Done, None, Some(2))
            .unwrap();
        assert_eq!(done.status, JobStatus::Done);
        assert_eq!(done.page_count, 2);
        assert!(done.completed_at.is_some());
        assert!(done.completed_at.unwrap() >= done.created_at);
    }

    #[test]
    fn test_failed_records_message() {
        let store = store();
        let job = store.create_job(&new_job()).unwrap();

        let failed = store
            .transition(&job.id, JobStatus::Failed, Some("worker gone"), None)
            .unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("worker gone"));
        assert!(failed.completed_at.is_some());
    }

    #[test]
    fn test_terminal_job_cannot_transition() {
        let store = store();
        let job = store.create_job(&new_job()).unwrap();
        store.transition(&job.id, JobStatus::Processing, None, None).unwrap();
        store.transition(&job.id, JobStatus::Done, None, Some(1)).unwrap();

        for to in [JobStatus::Queued, JobStatus::Processing, JobStatus::Failed, JobStatus::Done] {
            let err = store.transition(&job.id, to, Some("late"), None).unwrap_err();
            assert!(matches!(err, DatabaseError::InvalidTransition { .. }));
        }

        let job = store.get_job(&job.id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_queued_cannot_complete_directly() {
        let store = store();
        let job = store.create_job(&new_job()).unwrap();
        let err = store.transition(&job.id, JobStatus::Done, None, None).unwrap_err();
        match err {
            DatabaseError::InvalidTransition { from, to, .. } => {
                assert_eq!(from, "queued");
                assert_eq!(to, "done");
            }
            other => panic!("Expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn test_transition_unknown_job() {
        let err = store()
            .transition("missing", JobStatus::Processing, None, None)
            .unwrap_err();
        assert!(matches!(err, DatabaseError::JobNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_pages_round_trip_in_order() {
        let store = store();
        let job = store.create_job(&new_job()).unwrap();
        let pages = vec![sample_page(0), sample_page(1)];

        store.save_pages(&job.id, &pages).unwrap();
        let loaded = store.load_pages(&job.id).unwrap();

        assert_eq!(loaded, pages);
    }

    #[test]
    fn test_load_pages_for_job_without_pages() {
        let store = store();
        let job = store.create_job(&new_job()).unwrap();
        assert!(store.load_pages(&job.id).unwrap().is_empty());
    }

    #[test]
    fn test_list_jobs_by_status() {
        let store = store();
        let first = store.create_job(&new_job()).unwrap();
        let second = store.create_job(&new_job()).unwrap();
        store.transition(&first.id, JobStatus::Failed, Some("x"), None).unwrap();

        let all = store.list_jobs(&JobQuery::default()).unwrap();
        assert_eq!(all.total, 2);

        let failed = store
            .list_jobs(&JobQuery {
                status: Some(JobStatus::Failed),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(failed.total, 1);
        assert_eq!(failed.jobs[0].id, first.id);

        let queued = store
            .list_jobs(&JobQuery {
                status: Some(JobStatus::Queued),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(queued.jobs[0].id, second.id);
    }

    #[test]
    fn test_list_jobs_date_range() {
        let store = store();
        store.create_job(&new_job()).unwrap();

        let future = Utc::now() + chrono::Duration::hours(1);
        let none = store
            .list_jobs(&JobQuery {
                from: Some(future),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(none.total, 0);

        let past = Utc::now() - chrono::Duration::hours(1);
        let some = store
            .list_jobs(&JobQuery {
                from: Some(past),
                to: Some(future),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(some.total, 1);
    }

    #[test]
    fn test_stats_counts() {
        let store = store();
        let a = store.create_job(&new_job()).unwrap();
        let b = store.create_job(&new_job()).unwrap();
        store.create_job(&new_job()).unwrap();
        store.transition(&a.id, JobStatus::Processing, None, None).unwrap();
        store.transition(&a.id, JobStatus::Done, None, Some(1)).unwrap();
        store.transition(&b.id, JobStatus::Failed, Some("boom"), None).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_jobs, 3);
        assert_eq!(stats.completed_jobs, 1);
        assert_eq!(stats.failed_jobs, 1);
        assert_eq!(stats.queued_jobs, 1);
        assert!(stats.avg_processing_secs.is_some());
    }
}
