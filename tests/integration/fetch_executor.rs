//! Fetch executor retry behavior: bounded attempts, cleanup, hints, diagnostics

use crate::common::{records_body, ScriptedSource};
use finance_complaint_ingest::downloader::{
    DownloadTask, FetchExecutor, FetchOutcome, RetryPolicy,
};
use finance_complaint_ingest::fetcher::{FetcherError, SourceResponse};
use finance_complaint_ingest::output::raw::read_records;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn executor(source: Arc<ScriptedSource>, dir: &TempDir) -> FetchExecutor {
    FetchExecutor::new(source, dir.path().join("failed")).with_retry_policy(RetryPolicy::immediate())
}

#[tokio::test]
async fn test_success_writes_unwrapped_records() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::records(3));
    let output = dir.path().join("raw/nested/interval.json");
    let task = DownloadTask::new("http://source.test/a", &output, 2);

    let outcome = executor(source.clone(), &dir).fetch(task).await;

    match outcome {
        FetchOutcome::Written {
            path,
            records,
            attempts,
        } => {
            assert_eq!(path, output);
            assert_eq!(records, 3);
            assert_eq!(attempts, 1);
        }
        other => panic!("expected success, got {other:?}"),
    }
    // The hit without an envelope was discarded
    let written = read_records(&output).unwrap();
    assert_eq!(written.len(), 3);
    assert!(written.iter().all(|r| r.get("complaint_id").is_some()));
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_always_failing_task_attempted_n_plus_one_times() {
    for retries in [0u32, 1, 3, 5] {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::always(SourceResponse::ok("<html>oops</html>")));
        let output = dir.path().join("raw/interval.json");
        let task = DownloadTask::new("http://source.test/a", &output, retries);

        let outcome = executor(source.clone(), &dir).fetch(task).await;

        match outcome {
            FetchOutcome::Failed(failed) => {
                assert_eq!(failed.attempts, retries + 1);
                assert_eq!(failed.task.retries_remaining, 0);
                assert!(failed.last_error.contains("malformed"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(source.call_count(), retries as usize + 1);
        assert!(!output.exists(), "no partial file may remain");
    }
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::new(|url, call| match call {
        0 => Err(FetcherError::Timeout("request timed out".to_string())),
        1 => Ok(SourceResponse::with_status(503, "unavailable")),
        _ => Ok(SourceResponse::ok(records_body(url, 2))),
    }));
    let output = dir.path().join("raw/interval.json");
    let task = DownloadTask::new("http://source.test/a", &output, 5);

    let outcome = executor(source.clone(), &dir).fetch(task).await;

    assert_eq!(
        outcome,
        FetchOutcome::Written {
            path: output.clone(),
            records: 2,
            attempts: 3
        }
    );
    assert_eq!(source.call_count(), 3);
}

#[tokio::test]
async fn test_failing_body_archived_under_output_name() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::always(SourceResponse::with_status(
        500,
        "internal error",
    )));
    let output = dir.path().join("raw/finance_complaint_2012-01-01_2012-02-01.json");
    let task = DownloadTask::new("http://source.test/a", &output, 1);

    let outcome = executor(source, &dir).fetch(task).await;
    assert!(!outcome.is_written());

    let archived = dir
        .path()
        .join("failed/finance_complaint_2012-01-01_2012-02-01.json");
    assert_eq!(std::fs::read_to_string(archived).unwrap(), "internal error");
}

#[tokio::test]
async fn test_transport_error_leaves_no_diagnostics() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::new(|_, _| {
        Err(FetcherError::Connect("connection refused".to_string()))
    }));
    let task = DownloadTask::new("http://source.test/a", dir.path().join("raw/x.json"), 2);

    let outcome = executor(source.clone(), &dir).fetch(task).await;

    assert!(!outcome.is_written());
    assert_eq!(source.call_count(), 3);
    assert!(!dir.path().join("failed/x.json").exists());
}

#[tokio::test]
async fn test_existing_output_removed_when_attempt_fails() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("raw/x.json");
    std::fs::create_dir_all(output.parent().unwrap()).unwrap();
    std::fs::write(&output, "[{\"stale\": tr").unwrap();

    let source = Arc::new(ScriptedSource::always(SourceResponse::ok("{\"not\": \"array\"}")));
    let task = DownloadTask::new("http://source.test/a", &output, 0);

    let outcome = executor(source, &dir).fetch(task).await;

    assert!(!outcome.is_written());
    assert!(!output.exists());
}

#[tokio::test(start_paused = true)]
async fn test_wait_hint_plus_padding_before_retry() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::new(|url, call| match call {
        0 => Ok(SourceResponse::with_status(
            429,
            "Rate limited, retry after 7 seconds",
        )),
        _ => Ok(SourceResponse::ok(records_body(url, 1))),
    }));
    let policy = RetryPolicy {
        initial_backoff: Duration::from_secs(1),
        max_backoff: Duration::from_secs(30),
        hint_padding: Duration::from_secs(2),
        max_hint_wait: Duration::from_secs(300),
        retry_deadline: None,
    };
    let executor = FetchExecutor::new(source.clone(), dir.path().join("failed")).with_retry_policy(policy);
    let task = DownloadTask::new("http://source.test/a", dir.path().join("raw/x.json"), 3);

    let start = tokio::time::Instant::now();
    let outcome = executor.fetch(task).await;
    let waited = start.elapsed();

    assert!(outcome.is_written());
    assert!(waited >= Duration::from_secs(9), "waited {waited:?}");
    assert!(waited < Duration::from_secs(10), "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn test_hint_is_clamped() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::new(|url, call| match call {
        0 => Ok(SourceResponse::with_status(429, "wait 86400")),
        _ => Ok(SourceResponse::ok(records_body(url, 1))),
    }));
    let policy = RetryPolicy {
        max_hint_wait: Duration::from_secs(60),
        retry_deadline: None,
        ..RetryPolicy::default()
    };
    let executor = FetchExecutor::new(source, dir.path().join("failed")).with_retry_policy(policy);
    let task = DownloadTask::new("http://source.test/a", dir.path().join("raw/x.json"), 1);

    let start = tokio::time::Instant::now();
    assert!(executor.fetch(task).await.is_written());
    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(62));
    assert!(waited < Duration::from_secs(63));
}

#[tokio::test(start_paused = true)]
async fn test_retry_deadline_exhausts_early() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(ScriptedSource::always(SourceResponse::with_status(
        429,
        "retry in 100 seconds",
    )));
    let policy = RetryPolicy {
        retry_deadline: Some(Duration::from_secs(250)),
        ..RetryPolicy::default()
    };
    let executor = FetchExecutor::new(source.clone(), dir.path().join("failed")).with_retry_policy(policy);
    let task = DownloadTask::new("http://source.test/a", dir.path().join("raw/x.json"), 10);

    let outcome = executor.fetch(task).await;

    // 102 s per wait: two waits fit in 250 s, the third would not
    match outcome {
        FetchOutcome::Failed(failed) => {
            assert_eq!(failed.attempts, 3);
            assert!(failed.task.retries_remaining > 0);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(source.call_count(), 3);
}
