//! Job state machine as observed through the pipeline and the store.

mod common;

use mediview::broadcast::JobEvent;
use mediview::db::DatabaseError;
use mediview::pipeline::{ResultError, SubmitRequest, Submission};
use mediview::store::{JobQuery, JobStore};
use mediview::worker::{JobStatus, NewJob};

use common::{png_bytes, wait_for_terminal, TestHarness};

#[tokio::test]
async fn test_completed_at_tracks_terminal_state() {
    let harness = TestHarness::new();

    let queued = harness
        .store
        .create_job(&NewJob::new("a.png", Some("image/png"), "en"))
        .unwrap();
    assert!(queued.completed_at.is_none());

    let submission = harness
        .pipeline
        .submit(SubmitRequest::new("b.png", png_bytes(16, 16)))
        .await
        .unwrap();
    let done = harness.pipeline.job(submission.job_id()).unwrap().unwrap();

    assert_eq!(done.status, JobStatus::Done);
    assert!(done.completed_at.is_some());

    for job in harness.store.list_jobs(&JobQuery::default()).unwrap().jobs {
        assert_eq!(job.completed_at.is_some(), job.status.is_terminal(), "{:?}", job);
    }
}

#[tokio::test]
async fn test_no_transition_out_of_done() {
    let harness = TestHarness::new();
    let submission = harness
        .pipeline
        .submit(SubmitRequest::new("scan.png", png_bytes(16, 16)))
        .await
        .unwrap();
    let job_id = submission.job_id().to_string();

    for to in [JobStatus::Queued, JobStatus::Processing, JobStatus::Failed] {
        let err = harness.store.transition(&job_id, to, Some("late"), None).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidTransition { .. }));
    }
    assert_eq!(
        harness.pipeline.job(&job_id).unwrap().unwrap().status,
        JobStatus::Done
    );
}

#[tokio::test]
async fn test_async_submission_emits_every_transition() {
    let harness = TestHarness::new();
    let mut rx = harness.subscribe();

    let submission = harness
        .pipeline
        .submit(SubmitRequest::new("scan.png", png_bytes(32, 32)).asynchronous())
        .await
        .unwrap();
    let Submission::Queued { job_id, status } = submission else {
        panic!("Expected a queued submission");
    };
    assert_eq!(status, JobStatus::Queued);

    let terminal = wait_for_terminal(&mut rx, &job_id).await;
    assert_eq!(terminal.status, JobStatus::Done);
    assert_eq!(terminal.page_count, Some(1));

    let result = harness.pipeline.get_result(&job_id).unwrap();
    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages[0].items[1].masked_text.as_deref(), Some("홍길*"));
}

#[tokio::test]
async fn test_event_order_for_sync_submission() {
    let harness = TestHarness::new();
    let mut rx = harness.subscribe();

    let submission = harness
        .pipeline
        .submit(SubmitRequest::new("scan.png", png_bytes(8, 8)))
        .await
        .unwrap();

    let mut statuses = Vec::new();
    while let Ok(JobEvent { job_id, status, .. }) = rx.try_recv() {
        assert_eq!(job_id, submission.job_id());
        statuses.push(status);
    }
    assert_eq!(
        statuses,
        vec![JobStatus::Queued, JobStatus::Processing, JobStatus::Done]
    );
}

#[tokio::test]
async fn test_result_of_unfinished_job_is_pending() {
    let harness = TestHarness::new();
    let job = harness
        .store
        .create_job(&NewJob::new("a.pdf", None, "ko"))
        .unwrap();

    assert!(matches!(
        harness.pipeline.get_result(&job.id),
        Err(ResultError::Pending(JobStatus::Queued))
    ));
    assert!(matches!(
        harness.pipeline.get_result("no-such-job"),
        Err(ResultError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_filters_and_stats() {
    let harness = TestHarness::new();
    for _ in 0..3 {
        harness
            .pipeline
            .submit(SubmitRequest::new("scan.png", png_bytes(8, 8)))
            .await
            .unwrap();
    }
    let stuck = harness
        .store
        .create_job(&NewJob::new("later.png", None, "en"))
        .unwrap();

    let done = harness
        .pipeline
        .list_jobs(&JobQuery {
            status: Some(JobStatus::Done),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(done.total, 3);

    let page = harness
        .pipeline
        .list_jobs(&JobQuery {
            limit: Some(2),
            offset: Some(0),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.jobs.len(), 2);
    // Newest first.
    assert_eq!(page.jobs[0].id, stuck.id);

    let stats = harness.pipeline.stats().unwrap();
    assert_eq!(stats.total_jobs, 4);
    assert_eq!(stats.completed_jobs, 3);
    assert_eq!(stats.queued_jobs, 1);
    assert!(stats.avg_processing_secs.unwrap() >= 0.0);
}
