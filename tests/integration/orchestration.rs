//! Orchestrator: per-interval tasks, best-effort failures, concurrency, cancellation

use crate::common::{records_body, ScriptedSource, TEST_URL_TEMPLATE};
use chrono::NaiveDate;
use finance_complaint_ingest::downloader::{
    FetchExecutor, IngestionOrchestrator, IntervalRequest, RetryPolicy,
};
use finance_complaint_ingest::fetcher::SourceResponse;
use finance_complaint_ingest::shutdown::ShutdownCoordinator;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn request(raw_dir: &Path, from: NaiveDate, to: NaiveDate, retries: u32) -> IntervalRequest {
    IntervalRequest {
        from_date: from,
        to_date: to,
        url_template: TEST_URL_TEMPLATE.to_string(),
        raw_dir: raw_dir.to_path_buf(),
        file_name: "finance_complaint".to_string(),
        retries,
    }
}

fn orchestrator(source: Arc<ScriptedSource>, dir: &TempDir) -> IngestionOrchestrator {
    let executor = FetchExecutor::new(source, dir.path().join("failed"))
        .with_retry_policy(RetryPolicy::immediate());
    IngestionOrchestrator::new(executor).with_shutdown(ShutdownCoordinator::shared())
}

#[tokio::test]
async fn test_one_task_per_interval_with_substituted_urls() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::records(2));
    let raw = dir.path().join("raw");

    let report = orchestrator(source.clone(), &dir)
        .run(&request(&raw, date(2011, 12, 1), date(2012, 3, 1), 1))
        .await
        .unwrap();

    assert_eq!(report.intervals_planned, 3);
    assert_eq!(report.written.len(), 3);
    assert!(report.failed_tasks.is_empty());
    assert_eq!(report.completed_through, Some(date(2012, 3, 1)));

    let calls = source.calls().lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            "http://source.test/api?min=2011-12-01&max=2012-01-01",
            "http://source.test/api?min=2012-01-01&max=2012-02-01",
            "http://source.test/api?min=2012-02-01&max=2012-03-01",
        ]
    );
    assert!(raw.join("finance_complaint_2011-12-01_2012-01-01.json").exists());
    assert!(raw.join("finance_complaint_2012-02-01_2012-03-01.json").exists());
}

#[tokio::test]
async fn test_equal_dates_perform_no_fetch() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::records(2));

    let report = orchestrator(source.clone(), &dir)
        .run(&request(&dir.path().join("raw"), date(2012, 6, 1), date(2012, 6, 1), 3))
        .await
        .unwrap();

    assert_eq!(report.intervals_planned, 0);
    assert_eq!(source.call_count(), 0);
    assert!(!dir.path().join("raw").exists());
}

#[tokio::test]
async fn test_failed_interval_does_not_abort_others() {
    let dir = TempDir::new().unwrap();
    // The February interval always answers garbage
    let source = Arc::new(ScriptedSource::new(|url, _| {
        if url.contains("min=2012-02-01") {
            Ok(SourceResponse::ok("garbage"))
        } else {
            Ok(SourceResponse::ok(records_body(url, 1)))
        }
    }));

    let report = orchestrator(source.clone(), &dir)
        .run(&request(&dir.path().join("raw"), date(2012, 1, 1), date(2012, 5, 1), 2))
        .await
        .unwrap();

    assert_eq!(report.intervals_planned, 4);
    assert_eq!(report.written.len(), 3);
    assert_eq!(report.failed_tasks.len(), 1);
    assert_eq!(report.failed_tasks[0].attempts, 3);
    assert!(report.failed_tasks[0].task.source_url.contains("min=2012-02-01"));
    // Progress stops at the first gap
    assert_eq!(report.completed_through, Some(date(2012, 2, 1)));
    // 3 good intervals once each, bad one 1 + 2 retries
    assert_eq!(source.call_count(), 6);
}

#[tokio::test]
async fn test_failures_reset_between_runs() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::always(SourceResponse::ok("garbage")));
    let orchestrator = orchestrator(source, &dir);
    let request = request(&dir.path().join("raw"), date(2012, 1, 1), date(2012, 1, 3), 0);

    let first = orchestrator.run(&request).await.unwrap();
    let second = orchestrator.run(&request).await.unwrap();

    assert_eq!(first.failed_tasks.len(), 1);
    assert_eq!(second.failed_tasks.len(), 1);
    assert_eq!(second.completed_through, Some(date(2012, 1, 1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_run_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::records(3));
    let executor = FetchExecutor::new(source.clone(), dir.path().join("failed"))
        .with_retry_policy(RetryPolicy::immediate());
    let orchestrator = IngestionOrchestrator::new(executor)
        .with_concurrency(4)
        .with_shutdown(ShutdownCoordinator::shared());

    let report = orchestrator
        .run(&request(&dir.path().join("raw"), date(2012, 1, 1), date(2012, 12, 1), 1))
        .await
        .unwrap();

    assert_eq!(report.intervals_planned, 11);
    assert_eq!(report.written.len(), 11);
    assert_eq!(report.completed_through, Some(date(2012, 12, 1)));
    // Report is in interval order regardless of completion order
    assert!(report
        .written
        .windows(2)
        .all(|pair| pair[0].interval.end == pair[1].interval.start));
    assert_eq!(source.call_count(), 11);
}

#[tokio::test]
async fn test_shutdown_skips_intervals_not_started() {
    let dir = TempDir::new().unwrap();
    let shutdown = ShutdownCoordinator::shared();
    let trigger = shutdown.clone();
    // Request shutdown while the second interval is being fetched
    let source = Arc::new(ScriptedSource::new(move |url, call| {
        if call == 1 {
            trigger.request_shutdown();
        }
        Ok(SourceResponse::ok(records_body(url, 1)))
    }));
    let executor = FetchExecutor::new(source.clone(), dir.path().join("failed"))
        .with_retry_policy(RetryPolicy::immediate());
    let orchestrator = IngestionOrchestrator::new(executor).with_shutdown(shutdown);

    let report = orchestrator
        .run(&request(&dir.path().join("raw"), date(2012, 1, 1), date(2012, 6, 1), 1))
        .await
        .unwrap();

    assert_eq!(report.intervals_planned, 5);
    // The in-flight interval still completes
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.cancelled.len(), 3);
    assert_eq!(report.completed_through, Some(date(2012, 3, 1)));
    assert_eq!(source.call_count(), 2);
}
