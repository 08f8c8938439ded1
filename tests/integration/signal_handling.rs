use std::time::Duration;

use finance_complaint_ingest::shutdown::ShutdownCoordinator;

#[tokio::test]
async fn shutdown_notifies_waiters() {
    let shutdown = ShutdownCoordinator::shared();
    let waiter = {
        let handle = shutdown.clone();
        tokio::spawn(async move {
            handle.wait_for_shutdown().await;
            true
        })
    };

    // Give the task time to start waiting
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.request_shutdown();

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(result.is_ok());
}

/// Shutdown requested before anyone waits must not be missed
#[tokio::test]
async fn shutdown_requested_before_wait_does_not_deadlock() {
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let handle = shutdown.clone();
    let waiter = tokio::spawn(async move {
        handle.wait_for_shutdown().await;
        true
    });

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(result.is_ok(), "wait_for_shutdown() deadlocked despite shutdown already requested");
}

#[tokio::test]
async fn shutdown_concurrent_waiters_all_notified() {
    let shutdown = ShutdownCoordinator::shared();

    let mut waiters = Vec::new();
    for _ in 0..10 {
        let handle = shutdown.clone();
        waiters.push(tokio::spawn(async move {
            handle.wait_for_shutdown().await;
        }));
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    shutdown.request_shutdown();

    for waiter in waiters {
        let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(result.is_ok(), "A waiter was not notified of shutdown");
    }
}

/// A run interrupted mid-range keeps a checkpoint at the last contiguous interval
#[tokio::test]
async fn interrupted_run_checkpoints_completed_prefix() {
    use crate::common::{records_body, ScriptedSource, TEST_URL_TEMPLATE};
    use chrono::NaiveDate;
    use finance_complaint_ingest::fetcher::SourceResponse;
    use finance_complaint_ingest::{IngestionConfig, RunController};
    use std::sync::Arc;
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let shutdown = ShutdownCoordinator::shared();
    let trigger = shutdown.clone();
    let source = Arc::new(ScriptedSource::new(move |url, call| {
        if call == 2 {
            trigger.request_shutdown();
        }
        Ok(SourceResponse::ok(records_body(url, 2)))
    }));
    let config = IngestionConfig {
        artifact_dir: dir.path().to_path_buf(),
        source_url: TEST_URL_TEMPLATE.to_string(),
        ..IngestionConfig::default()
    };

    let artifact = RunController::new(config, source.clone())
        .with_shutdown(shutdown)
        .with_run_id("interrupted")
        .run(
            NaiveDate::from_ymd_opt(2011, 12, 1),
            NaiveDate::from_ymd_opt(2012, 6, 1),
        )
        .await
        .unwrap();

    assert_eq!(source.call_count(), 3);
    assert_eq!(artifact.intervals_written, 3);
    assert_eq!(artifact.cancelled, 3);
    assert_eq!(artifact.records_compacted, 6);
    assert_eq!(artifact.checkpoint_to_date, NaiveDate::from_ymd_opt(2012, 3, 1));
    assert!(!artifact.is_complete());
}
