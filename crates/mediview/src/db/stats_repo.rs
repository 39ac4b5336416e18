//! Aggregate job statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Database, DatabaseError};

/// Job counts per status plus average processing time of finished jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub total_jobs: u64,
    pub queued_jobs: u64,
    pub processing_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    /// Mean of `completed_at - created_at` in seconds over `done` jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_processing_secs: Option<f64>,
}

pub fn summary(db: &Database) -> Result<JobStats, DatabaseError> {
    db.with_conn(|conn| {
        let mut stats = JobStats::default();

        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;
        let counts = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, u64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (status, count) in counts {
            stats.total_jobs += count;
            match status.as_str() {
                "queued" => stats.queued_jobs = count,
                "processing" => stats.processing_jobs = count,
                "done" => stats.completed_jobs = count,
                "failed" => stats.failed_jobs = count,
                other => log::warn!("Ignoring {} jobs with unknown status '{}'", count, other),
            }
        }

        let mut stmt = conn.prepare(
            "SELECT created_at, completed_at FROM jobs
             WHERE status = 'done' AND completed_at IS NOT NULL",
        )?;
        let spans = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let durations: Vec<f64> = spans
            .iter()
            .filter_map(|(created, completed)| {
                let created = DateTime::parse_from_rfc3339(created).ok()?;
                let completed = DateTime::parse_from_rfc3339(completed).ok()?;
                let elapsed = completed.with_timezone(&Utc) - created.with_timezone(&Utc);
                Some(elapsed.num_milliseconds() as f64 / 1000.0)
            })
            .collect();
        if !durations.is_empty() {
            stats.avg_processing_secs = Some(durations.iter().sum::<f64>() / durations.len() as f64);
        }

        Ok(stats)
    })
}
