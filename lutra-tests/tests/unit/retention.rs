//! Unit tests for retention selection

use chrono::{Duration, Utc};
use lutra::managers::retention::select_expired;
use rstest::rstest;
use test_utils::{records_aged, BackupRecord, RetentionPolicy};

fn policy(max_count: u32, max_age_days: u32) -> RetentionPolicy {
    RetentionPolicy {
        max_count,
        max_age_days,
    }
}

#[rstest]
#[case::recent_and_many(vec![0; 12], 0)]
#[case::old_but_few(vec![60; 10], 0)]
#[case::old_and_many(vec![60; 12], 2)]
#[case::mixed_ages(vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 10, 31, 45], 2)]
#[case::empty(vec![], 0)]
fn test_select_expired_default_policy(#[case] ages: Vec<i64>, #[case] expected: usize) {
    let now = Utc::now();
    let records = records_aged("orders-db", &ages, now);

    let expired = select_expired(&records, &policy(10, 30), now);
    assert_eq!(expired.len(), expected);
}

#[test]
fn test_expired_are_the_oldest() {
    let now = Utc::now();
    let records = records_aged("orders-db", &[60; 12], now);

    let expired = select_expired(&records, &policy(10, 30), now);
    let mut expected: Vec<&BackupRecord> = records.iter().collect();
    expected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    assert_eq!(expired, expected[10..].to_vec());
}

#[test]
fn test_failed_records_do_not_count() {
    let now = Utc::now();
    let mut records = records_aged("orders-db", &[60; 10], now);
    for i in 0..3 {
        records.push(BackupRecord::failure(
            "orders-db",
            now - Duration::days(100 + i),
            std::time::Duration::from_millis(1),
            "exit code 1",
        ));
    }

    assert!(select_expired(&records, &policy(10, 30), now).is_empty());
    assert!(select_expired(&records, &policy(9, 30), now)
        .iter()
        .all(|r| r.success));
}

#[test]
fn test_age_boundary_is_exclusive() {
    let now = Utc::now();
    let mut records = records_aged("orders-db", &[0, 0], now);
    records.push(BackupRecord::success(
        "orders-db",
        now - Duration::days(30),
        "exactly-30-days.dump",
        1,
        std::time::Duration::from_millis(1),
    ));

    // Exactly max_age_days old is not older than the cutoff
    assert!(select_expired(&records, &policy(2, 30), now).is_empty());
}
