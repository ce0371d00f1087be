/*!
 * Restart and interruption recovery tests: queue state must survive a
 * process restart, and a task caught mid-run must surface as errored.
 */

use doctran::providers::mock::MockProvider;
use doctran::store::{TaskStore, INTERRUPTED_MESSAGE};
use doctran::task::{Task, TaskConfig};
use doctran::{Submission, TaskKind, TaskStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::common::{build_harness, create_temp_dir, create_test_file, sample_csv};

fn csv_submission() -> Submission {
    Submission {
        owner: "alice".to_string(),
        kind: TaskKind::Tabular,
        file_bytes: sample_csv(),
        source_language: "en".to_string(),
        target_language: "fr".to_string(),
        overwrite: false,
        glossary_bytes: None,
    }
}

#[test]
fn test_reload_afterCrashWhileRunning_shouldMarkTaskErrored() {
    let dir = create_temp_dir().unwrap();
    let tasks_file = dir.path().join("tasks.json");

    {
        let store = TaskStore::open(&tasks_file).unwrap();
        let mut running = Task::new(
            "caught-mid-run".to_string(),
            "alice".to_string(),
            TaskKind::Tabular,
            TaskConfig {
                source_language: "en".to_string(),
                target_language: "fr".to_string(),
                overwrite: false,
                glossary_path: None,
            },
            dir.path().join("input.csv"),
        );
        running.transition(TaskStatus::Running).unwrap();
        store.insert(running).unwrap();

        store
            .insert(Task::new(
                "still-waiting".to_string(),
                "bob".to_string(),
                TaskKind::Tabular,
                TaskConfig {
                    source_language: "en".to_string(),
                    target_language: "de".to_string(),
                    overwrite: false,
                    glossary_path: None,
                },
                dir.path().join("other.csv"),
            ))
            .unwrap();
        // Simulated crash: the store is dropped without the task finishing
    }

    let store = TaskStore::open(&tasks_file).unwrap();
    let interrupted = store.get("caught-mid-run").unwrap();
    assert_eq!(interrupted.status, TaskStatus::Error);
    assert_eq!(interrupted.error_message.as_deref(), Some(INTERRUPTED_MESSAGE));

    // The pending task is untouched and still next in line
    let pending = store.get("still-waiting").unwrap();
    assert_eq!(pending.status, TaskStatus::Pending);
    assert_eq!(store.next_pending().unwrap().id, "still-waiting");
}

#[tokio::test]
async fn test_restart_afterCompletedRun_shouldStillServeResult() {
    let dir = create_temp_dir().unwrap();

    let id = {
        let harness = build_harness(dir.path(), Arc::new(MockProvider::working()), 10);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let id = harness.queue.submit(csv_submission()).unwrap();
        let dispatcher = harness.dispatcher;
        let worker = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

        tokio::time::timeout(Duration::from_secs(5), async {
            while !harness.queue.get(&id).unwrap().status.is_terminal() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("task did not finish in time");

        let _ = shutdown_tx.send(true);
        worker.await.unwrap();
        id
    };

    // A fresh process over the same data directory sees the completed
    // task and can still serve its artifact
    let harness = build_harness(dir.path(), Arc::new(MockProvider::working()), 10);
    let task = harness.queue.get(&id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    let result = harness.queue.result_bytes(&id).unwrap();
    assert!(String::from_utf8(result.to_vec())
        .unwrap()
        .contains("[fr] Hello"));
}

#[tokio::test]
async fn test_restart_afterMidRunFailure_shouldKeepPartialArtifactAndAcceptNewWork() {
    let dir = create_temp_dir().unwrap();

    // 4 rows, batch size 2: the first batch checkpoints, the second fails
    let csv = create_test_file(dir.path(), "big.csv", "source\na\nb\nc\nd\n").unwrap();
    let file_bytes = std::fs::read(&csv).unwrap();

    let failed_id = {
        let harness = build_harness(dir.path(), Arc::new(MockProvider::fail_after(1)), 2);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let id = harness
            .queue
            .submit(Submission {
                file_bytes,
                ..csv_submission()
            })
            .unwrap();
        let dispatcher = harness.dispatcher;
        let worker = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

        tokio::time::timeout(Duration::from_secs(5), async {
            while !harness.queue.get(&id).unwrap().status.is_terminal() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("task did not finish in time");

        let _ = shutdown_tx.send(true);
        worker.await.unwrap();
        id
    };

    // Restarted process: the failure and its checkpointed progress survive
    let harness = build_harness(dir.path(), Arc::new(MockProvider::working()), 2);
    let failed = harness.queue.get(&failed_id).unwrap();
    assert_eq!(failed.status, TaskStatus::Error);
    assert_eq!(failed.progress.processed, 2);
    assert_eq!(failed.progress.total, 4);

    let partial = std::fs::read_to_string(
        harness.results_dir.join(format!("{}.csv", failed_id)),
    )
    .unwrap();
    assert!(partial.contains("a,[fr] a"));
    assert!(partial.contains("b,[fr] b"));

    // The queue keeps accepting and completing new work
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let new_id = harness.queue.submit(csv_submission()).unwrap();
    let dispatcher = harness.dispatcher;
    let worker = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

    tokio::time::timeout(Duration::from_secs(5), async {
        while !harness.queue.get(&new_id).unwrap().status.is_terminal() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task did not finish in time");

    assert_eq!(
        harness.queue.get(&new_id).unwrap().status,
        TaskStatus::Completed
    );

    let _ = shutdown_tx.send(true);
    worker.await.unwrap();
}
