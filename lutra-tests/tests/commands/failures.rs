//! Tests for per-target failures
//!
//! Every failure yields `success == false`, a message and a failed history
//! record; other targets carry on.

use chrono::{Duration, Utc};
use lutra::managers::backup::backup_file_name;
use rstest::rstest;
use test_utils::{
    target, CompressionType, ConfigBuilder, DatabaseType, MockExecutor, MockResponse,
    OptionAssertions, TestContext,
};

/// Put a file at every name `orders-db` could get over the next few seconds
fn occupy_upcoming_names(ctx: &TestContext) -> Vec<std::path::PathBuf> {
    let now = Utc::now();
    (0..5)
        .map(|s| {
            let name = backup_file_name(
                "orders-db",
                now + Duration::seconds(s),
                ".dump",
                CompressionType::None,
            );
            ctx.create_backup_file("orders-db", &name, b"earlier backup")
        })
        .collect()
}

#[rstest]
#[case::non_zero_exit(MockResponse::failure(1, "pg_dump: error: connection refused"), "connection refused")]
#[case::exit_code_in_message(MockResponse::failure(137, ""), "exit code 137")]
#[case::runtime_missing(MockResponse::SpawnError, "Failed to start 'docker'")]
#[tokio::test]
async fn test_failed_backup_is_recorded(#[case] response: MockResponse, #[case] expected: &str) {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new().add_postgres("orders-db", "pg", "orders_db"),
    );
    let executor = MockExecutor::new().expect("pg_dump", response);
    let orchestrator = ctx.orchestrator(executor);

    let target = ctx.config().databases[0].clone();
    let result = orchestrator.backup(&target).await.unwrap();

    assert!(!result.success);
    assert!(result.file_path.is_none());
    assert!(result.file_size_bytes.is_none());
    let message = result.error_message.assert_some();
    assert!(message.contains(expected), "unexpected message: {}", message);

    // No partial file left behind
    assert!(ctx.backup_files("orders-db").is_empty());

    let records = ctx.records();
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
    assert!(records[0].file_name.is_empty());
    assert_eq!(records[0].file_size_bytes, 0);
    assert_eq!(records[0].error_message.as_deref(), Some(message.as_str()));
}

#[tokio::test]
async fn test_unsupported_type_fails_alone() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new()
            .add_target(target(
                "legacy",
                DatabaseType::Other("oracle".to_string()),
                "ora",
                "LEGACY",
            ))
            .add_postgres("orders-db", "pg", "orders_db"),
    );
    let executor = MockExecutor::new();
    let orchestrator = ctx.orchestrator(executor.clone());

    let results = orchestrator.backup_all().await.unwrap();
    assert_eq!(results.len(), 2);

    assert!(!results[0].success);
    assert!(results[0]
        .error_message
        .as_deref()
        .assert_some()
        .contains("oracle"));
    assert!(results[1].success);

    // Nothing was executed for the unsupported target
    let calls = executor.get_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].container, "pg");

    let legacy = ctx.history().for_target("legacy").unwrap();
    assert_eq!(legacy.len(), 1);
    assert!(!legacy[0].success);
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_run() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new()
            .add_mongo("events", "mongo", "events")
            .add_postgres("orders-db", "pg", "orders_db"),
    );
    let executor = MockExecutor::new()
        .expect("mongodump", MockResponse::failure(1, "Failed: error connecting to db server"));
    let orchestrator = ctx.orchestrator(executor);

    let results = orchestrator.backup_all().await.unwrap();
    assert!(!results[0].success);
    assert!(results[1].success);
    assert_eq!(ctx.records().len(), 2);
}

#[tokio::test]
async fn test_failed_backups_do_not_trigger_retention() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new()
            .with_retention(0, 0)
            .add_postgres("orders-db", "pg", "orders_db"),
    );
    let existing = ctx.create_backup_file("orders-db", "orders-db_old.dump", b"old");
    ctx.history()
        .append(test_utils::sample_record())
        .unwrap();

    let executor = MockExecutor::new().expect("pg_dump", MockResponse::failure(1, "boom"));
    let orchestrator = ctx.orchestrator(executor);

    let target = ctx.config().databases[0].clone();
    let result = orchestrator.backup(&target).await.unwrap();

    assert!(!result.success);
    assert!(existing.exists());
    assert_eq!(ctx.records().len(), 2);
}

#[tokio::test]
async fn test_corrupt_history_is_fatal() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new().add_postgres("orders-db", "pg", "orders_db"),
    );
    std::fs::write(ctx.history().path(), "not json").unwrap();

    let executor = MockExecutor::new().expect("pg_dump", MockResponse::stdout("dump"));
    let orchestrator = ctx.orchestrator(executor);

    let target = ctx.config().databases[0].clone();
    assert!(orchestrator.backup(&target).await.is_err());

    // The dump could not be recorded, so it was not kept
    assert!(ctx.backup_files("orders-db").is_empty());
}

#[tokio::test]
async fn test_failed_attempt_keeps_earlier_backup_of_same_second() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new().add_postgres("orders-db", "pg", "orders_db"),
    );
    let target = ctx.config().databases[0].clone();

    let ok = ctx
        .orchestrator(MockExecutor::new().expect("pg_dump", MockResponse::stdout("dump")))
        .backup(&target)
        .await
        .unwrap();
    let bad = ctx
        .orchestrator(MockExecutor::new().expect("pg_dump", MockResponse::failure(1, "boom")))
        .backup(&target)
        .await
        .unwrap();

    assert!(ok.success);
    assert!(!bad.success);
    let path = ok.file_path.assert_some();
    assert_eq!(std::fs::read(&path).unwrap(), b"dump");

    let records = ctx.records();
    let kept: Vec<_> = records.iter().filter(|r| r.success).collect();
    assert_eq!(kept.len(), 1);
    assert!(ctx.target_dir("orders-db").join(&kept[0].file_name).exists());
}

#[tokio::test]
async fn test_failed_attempt_never_deletes_existing_file() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new().add_postgres("orders-db", "pg", "orders_db"),
    );
    let existing = occupy_upcoming_names(&ctx);

    let executor = MockExecutor::new().expect("pg_dump", MockResponse::failure(1, "boom"));
    let target = ctx.config().databases[0].clone();
    let result = ctx.orchestrator(executor).backup(&target).await.unwrap();

    assert!(!result.success);
    for path in &existing {
        assert_eq!(std::fs::read(path).unwrap(), b"earlier backup");
    }
}

#[tokio::test]
async fn test_name_collision_fails_without_overwriting() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new().add_postgres("orders-db", "pg", "orders_db"),
    );
    let existing = occupy_upcoming_names(&ctx);

    let executor = MockExecutor::new().expect("pg_dump", MockResponse::stdout("new dump"));
    let target = ctx.config().databases[0].clone();
    let result = ctx.orchestrator(executor.clone()).backup(&target).await.unwrap();

    assert!(!result.success);
    assert!(result
        .error_message
        .as_deref()
        .assert_some()
        .contains("already exists"));
    // Refused before running the dump
    assert!(!executor.was_called("pg_dump"));
    for path in &existing {
        assert_eq!(std::fs::read(path).unwrap(), b"earlier backup");
    }

    let records = ctx.records();
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
}
