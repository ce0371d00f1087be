/*!
 * End-to-end queue lifecycle tests: submit through the boundary, let the
 * dispatcher process tasks with a mock provider, observe broadcasts and
 * fetch results.
 */

use doctran::errors::QueueError;
use doctran::providers::mock::{MockBehavior, MockProvider};
use doctran::{Submission, TaskKind, TaskQueue, TaskStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::common::{build_harness, create_temp_dir, sample_csv};

fn csv_submission(file_bytes: Vec<u8>) -> Submission {
    Submission {
        owner: "alice".to_string(),
        kind: TaskKind::Tabular,
        file_bytes,
        source_language: "en".to_string(),
        target_language: "fr".to_string(),
        overwrite: false,
        glossary_bytes: None,
    }
}

/// Polls the queue until the task reaches a terminal status
async fn wait_for_terminal(queue: &TaskQueue, id: &str) -> TaskStatus {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(task) = queue.get(id) {
                if task.status.is_terminal() {
                    return task.status;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task did not reach a terminal status in time")
}

#[tokio::test]
async fn test_lifecycle_withWorkingProvider_shouldCompleteAndServeResult() {
    let dir = create_temp_dir().unwrap();
    let harness = build_harness(dir.path(), Arc::new(MockProvider::working()), 10);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let id = harness.queue.submit(csv_submission(sample_csv())).unwrap();
    let dispatcher = harness.dispatcher;
    let worker = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

    let status = wait_for_terminal(&harness.queue, &id).await;
    assert_eq!(status, TaskStatus::Completed);

    let task = harness.queue.get(&id).unwrap();
    assert_eq!(task.progress.processed, 1);
    assert_eq!(task.progress.total, 1);

    let result = harness.queue.result_bytes(&id).unwrap();
    let csv = String::from_utf8(result.to_vec()).unwrap();
    assert!(csv.contains("Hello,[fr] Hello,greeting"));
    // The already-translated row passed through untouched
    assert!(csv.contains("Bye,x,farewell"));

    let _ = shutdown_tx.send(true);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_withFailingProvider_shouldRecordErrorAndServeNoResult() {
    let dir = create_temp_dir().unwrap();
    let harness = build_harness(dir.path(), Arc::new(MockProvider::failing()), 10);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let id = harness.queue.submit(csv_submission(sample_csv())).unwrap();
    let dispatcher = harness.dispatcher;
    let worker = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

    let status = wait_for_terminal(&harness.queue, &id).await;
    assert_eq!(status, TaskStatus::Error);

    let task = harness.queue.get(&id).unwrap();
    assert!(task.error_message.as_deref().unwrap().contains("mock provider"));

    let err = harness.queue.result_bytes(&id).unwrap_err();
    assert!(matches!(err, QueueError::ResultNotReady(_, ref status) if status == "error"));

    let _ = shutdown_tx.send(true);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_delete_whileTaskIsRunning_shouldBeRejected() {
    let dir = create_temp_dir().unwrap();
    let provider = MockProvider::new(MockBehavior::Slow { delay_ms: 300 });
    let harness = build_harness(dir.path(), Arc::new(provider), 10);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let id = harness.queue.submit(csv_submission(sample_csv())).unwrap();
    let dispatcher = harness.dispatcher;
    let worker = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

    // Wait until the worker has picked the task up
    tokio::time::timeout(Duration::from_secs(5), async {
        while !harness.queue.is_running(&id) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("task never started running");

    let err = harness.queue.delete(&id).unwrap_err();
    assert!(matches!(err, QueueError::TaskRunning(_)));

    // Once finished, deletion is allowed
    let status = wait_for_terminal(&harness.queue, &id).await;
    assert_eq!(status, TaskStatus::Completed);
    harness.queue.delete(&id).unwrap();

    let _ = shutdown_tx.send(true);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_dispatcher_withThreeTasks_shouldNeverRunTwoAtOnce() {
    let dir = create_temp_dir().unwrap();
    let provider = MockProvider::new(MockBehavior::Slow { delay_ms: 30 });
    let harness = build_harness(dir.path(), Arc::new(provider), 10);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut updates = harness.queue.subscribe();
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(harness.queue.submit(csv_submission(sample_csv())).unwrap());
    }

    let dispatcher = harness.dispatcher;
    let worker = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

    // Every broadcast snapshot must show at most one running task
    let all_done = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = match updates.recv().await {
                Ok(snapshot) => snapshot,
                // A lagged receiver just misses snapshots
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => panic!("broadcast channel closed"),
            };
            let running = snapshot
                .iter()
                .filter(|t| t.status == TaskStatus::Running)
                .count();
            assert!(running <= 1, "observed {} running tasks", running);
            if snapshot.iter().all(|t| t.status.is_terminal()) && snapshot.len() == 3 {
                return snapshot;
            }
        }
    })
    .await
    .expect("tasks did not finish in time");

    assert!(all_done.iter().all(|t| t.status == TaskStatus::Completed));
    assert!(!harness.store.has_running());

    let _ = shutdown_tx.send(true);
    worker.await.unwrap();
}
