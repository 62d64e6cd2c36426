//! Unit tests for the JSON history ledger

use chrono::{Duration, Utc};
use lutra::managers::history::{HistoryError, HISTORY_FILE};
use test_utils::{records_aged, sample_failure, sample_record, ConfigBuilder, TestContext};

fn context() -> TestContext {
    TestContext::from_builder(ConfigBuilder::new())
}

#[test]
fn test_history_round_trip() {
    let ctx = context();
    let store = ctx.history();

    store.append(sample_record()).unwrap();
    store.append(sample_failure()).unwrap();

    // Newest first
    let records = store.all().unwrap();
    assert_eq!(records, vec![sample_failure(), sample_record()]);
    assert_eq!(store.path(), ctx.config().backup_directory.join(HISTORY_FILE));
}

#[test]
fn test_history_filters_by_target() {
    let ctx = context();
    let store = ctx.history();
    let now = Utc::now();

    for record in records_aged("orders-db", &[3, 1, 2], now)
        .into_iter()
        .chain(records_aged("events", &[0], now))
    {
        store.append(record).unwrap();
    }

    let orders = store.for_target("orders-db").unwrap();
    assert_eq!(orders.len(), 3);
    assert!(orders.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    assert!(orders.iter().all(|r| r.target_name == "orders-db"));

    assert_eq!(store.for_target("events").unwrap().len(), 1);
    assert!(store.for_target("missing").unwrap().is_empty());
}

#[test]
fn test_history_remove() {
    let ctx = context();
    let store = ctx.history();
    let records = records_aged("orders-db", &[0, 1], Utc::now());
    for record in &records {
        store.append(record.clone()).unwrap();
    }

    assert!(store.remove("orders-db", &records[1].file_name).unwrap());
    assert!(!store.remove("orders-db", &records[1].file_name).unwrap());

    let remaining = store.all().unwrap();
    assert_eq!(remaining, vec![records[0].clone()]);
}

#[test]
fn test_history_tolerates_empty_file() {
    let ctx = context();
    let store = ctx.history();
    std::fs::write(store.path(), "\n").unwrap();

    assert!(store.all().unwrap().is_empty());
    store.append(sample_record()).unwrap();
    assert_eq!(store.all().unwrap().len(), 1);
}

#[test]
fn test_history_corrupt_file_is_reported() {
    let ctx = context();
    let store = ctx.history();
    std::fs::write(store.path(), "[{\"target_name\": 1}]").unwrap();

    let err = store.all().unwrap_err();
    assert!(matches!(err, HistoryError::Corrupt { .. }));
    assert!(err.to_string().contains("corrupt"));
}

#[test]
fn test_history_records_outlive_store() {
    let ctx = context();
    ctx.history()
        .append(records_aged("orders-db", &[0], Utc::now() - Duration::hours(1)).remove(0))
        .unwrap();

    // A fresh store over the same root sees the record
    assert_eq!(ctx.records().len(), 1);
}
