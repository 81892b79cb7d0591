//! End-to-end session runs against a scripted service

use crate::integration::test_utils::{
    completed, config_in, group, image_response, RecordingSleeper, ScriptedService, PNG_BYTES,
};
use async_trait::async_trait;
use pixbatch::config::StrategyKind;
use pixbatch::error::{FailureKind, GenerationError};
use pixbatch::record::SessionStatus;
use pixbatch::service::{ImageService, JobHandle};
use pixbatch::session::{BatchSession, OUTPUT_UNAVAILABLE};
use pixbatch::store::SessionRecordStore;
use pixbatch::timing::Sleeper;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const PACING: Duration = Duration::from_secs(2);

#[tokio::test(start_paused = true)]
async fn three_successes_pace_between_items_only() {
    let temp = TempDir::new().unwrap();
    let groups = vec![group(
        temp.path(),
        "trees",
        &[("oak", "oak tree"), ("pine", "pine tree"), ("birch", "birch tree")],
    )];
    let service = Arc::new(ScriptedService::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let session = BatchSession::new(&config_in(temp.path()), service.clone(), sleeper.clone());
    assert_eq!(session.service_name(), "scripted");

    let outcome = session
        .run("forest", &groups, &CancellationToken::new())
        .await
        .unwrap();

    let record = &outcome.record;
    assert_eq!(record.status, SessionStatus::Completed);
    assert_eq!(record.total_items, 3);
    assert_eq!(record.generated.len(), 3);
    assert!(record.failed.is_empty());
    assert_eq!(sleeper.slept(), vec![PACING, PACING]);
    assert_eq!(service.counts().generate, 3);

    for (asset, id) in record.generated.iter().zip(["oak", "pine", "birch"]) {
        assert_eq!(asset.id, id);
        assert_eq!(asset.file_path, temp.path().join("trees").join(format!("{}.png", id)));
        assert_eq!(std::fs::read(&asset.file_path).unwrap(), PNG_BYTES);
        assert_eq!(asset.file_size_bytes, PNG_BYTES.len() as u64);
        assert_eq!(asset.size, "32x32");
        assert_eq!(asset.content_hash, blake3::hash(PNG_BYTES).to_hex().to_string());
        assert!(asset.review_flags.is_empty());
    }
    assert_eq!(
        outcome.record_path,
        temp.path().join("session_forest_metadata.json")
    );
}

#[tokio::test(start_paused = true)]
async fn transient_failures_recover_within_one_item() {
    let temp = TempDir::new().unwrap();
    let groups = vec![group(temp.path(), "props", &[("crate", "wooden crate")])];
    let service = Arc::new(
        ScriptedService::new()
            .generate_fails(GenerationError::Transport("connection reset".into()))
            .generate_fails(GenerationError::Transport("503".into())),
    );
    let sleeper = Arc::new(RecordingSleeper::new());
    let session = BatchSession::new(&config_in(temp.path()), service.clone(), sleeper.clone());

    let outcome = session
        .run("props", &groups, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(service.counts().generate, 3);
    assert_eq!(outcome.record.generated.len(), 1);
    assert!(outcome.record.failed.is_empty());
    assert_eq!(
        sleeper.slept(),
        vec![Duration::from_secs(5), Duration::from_secs(10)]
    );
}

#[tokio::test(start_paused = true)]
async fn unavailable_output_location_fails_its_group_only() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let groups = vec![
        group(temp.path(), "before", &[("a", "first")]),
        group(&blocker, "blocked", &[("b", "second"), ("c", "third")]),
        group(temp.path(), "after", &[("d", "fourth")]),
    ];
    let service = Arc::new(ScriptedService::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let session = BatchSession::new(&config_in(temp.path()), service.clone(), sleeper.clone());

    let outcome = session
        .run("mixed", &groups, &CancellationToken::new())
        .await
        .unwrap();

    let record = &outcome.record;
    assert_eq!(record.status, SessionStatus::Completed);
    assert_eq!(record.processed(), record.total_items);
    let generated: Vec<&str> = record.generated.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(generated, vec!["a", "d"]);
    let failed: Vec<&str> = record.failed.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(failed, vec!["b", "c"]);
    for item in &record.failed {
        assert_eq!(item.error, OUTPUT_UNAVAILABLE);
        assert_eq!(item.kind, FailureKind::Configuration);
    }
    assert_eq!(service.counts().generate, 2);
    assert_eq!(sleeper.slept(), vec![PACING]);
}

#[tokio::test(start_paused = true)]
async fn session_without_successes_is_still_recorded() {
    let temp = TempDir::new().unwrap();
    let groups = vec![group(temp.path(), "broken", &[("x", "one"), ("y", "two")])];
    let service = Arc::new(
        ScriptedService::new()
            .generate_fails(GenerationError::Rejected("400 Bad Request".into()))
            .generate_returns(Ok(image_response(&[]))),
    );
    let sleeper = Arc::new(RecordingSleeper::new());
    let session = BatchSession::new(&config_in(temp.path()), service, sleeper);

    let outcome = session
        .run("broken", &groups, &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.record.generated.is_empty());
    let kinds: Vec<FailureKind> = outcome.record.failed.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FailureKind::Rejected, FailureKind::Persistence]);
    assert!(!temp.path().join("broken").join("y.png").exists());

    let saved = SessionRecordStore::load_from(&outcome.record_path).unwrap();
    assert_eq!(saved, outcome.record);
}

#[tokio::test(start_paused = true)]
async fn polled_session_records_job_ids() {
    let temp = TempDir::new().unwrap();
    let groups = vec![group(temp.path(), "rocks", &[("boulder", "grey boulder")])];
    let service = Arc::new(
        ScriptedService::new()
            .submit_returns(Ok(JobHandle::new("obj-7")))
            .poll_returns(Ok(completed("https://cdn.example/obj-7.png"))),
    );
    let sleeper = Arc::new(RecordingSleeper::new());
    let mut config = config_in(temp.path());
    config.service.strategy = StrategyKind::AsyncPolled;
    let session = BatchSession::new(&config, service.clone(), sleeper);

    let outcome = session
        .run("rocks", &groups, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.record.strategy, StrategyKind::AsyncPolled);
    assert_eq!(outcome.record.generated[0].job_id.as_deref(), Some("obj-7"));
    assert_eq!(service.counts().generate, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_records_nothing_processed() {
    let temp = TempDir::new().unwrap();
    let groups = vec![group(temp.path(), "trees", &[("oak", "oak tree")])];
    let service = Arc::new(ScriptedService::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let session = BatchSession::new(&config_in(temp.path()), service.clone(), sleeper);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = session.run("early", &groups, &cancel).await.unwrap();

    assert_eq!(outcome.record.status, SessionStatus::Cancelled);
    assert_eq!(outcome.record.processed(), 0);
    assert_eq!(outcome.record.total_items, 1);
    assert_eq!(service.counts().generate, 0);
    assert!(outcome.record_path.exists());
}

/// Cancels the session the first time it is asked to wait.
struct CancellingSleeper {
    cancel: CancellationToken,
}

#[async_trait]
impl Sleeper for CancellingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.cancel.cancel();
        tokio::time::sleep(duration).await;
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_pacing_keeps_finished_items() {
    let temp = TempDir::new().unwrap();
    let groups = vec![group(
        temp.path(),
        "trees",
        &[("oak", "oak tree"), ("pine", "pine tree"), ("birch", "birch tree")],
    )];
    let service = Arc::new(ScriptedService::new());
    let cancel = CancellationToken::new();
    let sleeper = Arc::new(CancellingSleeper {
        cancel: cancel.clone(),
    });
    let session = BatchSession::new(&config_in(temp.path()), service.clone(), sleeper);

    let outcome = session.run("interrupted", &groups, &cancel).await.unwrap();

    let record = &outcome.record;
    assert_eq!(record.status, SessionStatus::Cancelled);
    assert_eq!(record.generated.len(), 1);
    assert!(record.failed.is_empty());
    assert!(record.processed() < record.total_items);
    assert_eq!(service.counts().generate, 1);

    let saved = SessionRecordStore::load_from(&outcome.record_path).unwrap();
    assert_eq!(saved.status, SessionStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn record_file_is_overwritten_by_a_rerun() {
    let temp = TempDir::new().unwrap();
    let groups = vec![group(temp.path(), "trees", &[("oak", "oak tree")])];
    let service: Arc<dyn ImageService> = Arc::new(
        ScriptedService::new().generate_fails(GenerationError::Rejected("402 Payment Required".into())),
    );
    let session = BatchSession::new(
        &config_in(temp.path()),
        service.clone(),
        Arc::new(RecordingSleeper::new()),
    );

    let first = session
        .run("rerun", &groups, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.record.failed.len(), 1);

    let second = session
        .run("rerun", &groups, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.record_path, second.record_path);

    let saved = session.store().load("rerun").unwrap();
    assert_eq!(saved.generated.len(), 1);
    assert!(saved.failed.is_empty());
}

#[tokio::test(start_paused = true)]
async fn unwritable_records_dir_is_a_session_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("records");
    std::fs::write(&blocker, b"file").unwrap();
    let groups = vec![group(temp.path(), "trees", &[("oak", "oak tree")])];
    let session = BatchSession::new(
        &config_in(&blocker),
        Arc::new(ScriptedService::new()),
        Arc::new(RecordingSleeper::new()),
    );

    assert!(session
        .run("lost", &groups, &CancellationToken::new())
        .await
        .is_err());
}
