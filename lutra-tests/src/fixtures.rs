//! Test fixtures and sample data
//!
//! Provides pre-built test data and templates for testing.

use chrono::{DateTime, Duration, TimeZone, Utc};
use lutra::managers::history::BackupRecord;

/// Plain-format `pg_dump` output
pub const SAMPLE_SQL_DUMP: &[u8] = b"--\n-- PostgreSQL database dump\n--\n\nCREATE TABLE public.orders (\n    id integer NOT NULL,\n    total numeric(10,2)\n);\n\nCOPY public.orders (id, total) FROM stdin;\n1\t19.99\n2\t5.00\n\\.\n";

/// Create a sample successful record for testing
pub fn sample_record() -> BackupRecord {
    BackupRecord::success(
        "orders-db",
        Utc.with_ymd_and_hms(2024, 1, 15, 3, 0, 0).unwrap(),
        "orders-db_2024-01-15_030000.sql.gz",
        4096,
        std::time::Duration::from_millis(2300),
    )
}

/// Create a sample failed record for testing
pub fn sample_failure() -> BackupRecord {
    BackupRecord::failure(
        "orders-db",
        Utc.with_ymd_and_hms(2024, 1, 16, 3, 0, 0).unwrap(),
        std::time::Duration::from_millis(150),
        "Backup command failed (exit code 1): pg_dump: error: connection refused",
    )
}

/// Successful records aged the given number of days before `now`.
///
/// Each record is one minute older than the previous one so the order is
/// stable; file names are `{target}_{index}.dump`.
pub fn records_aged(target: &str, days: &[i64], now: DateTime<Utc>) -> Vec<BackupRecord> {
    days.iter()
        .enumerate()
        .map(|(i, d)| {
            BackupRecord::success(
                target,
                now - Duration::days(*d) - Duration::minutes(i as i64),
                &format!("{}_{}.dump", target, i),
                128,
                std::time::Duration::from_millis(10),
            )
        })
        .collect()
}

/// Minimal valid config TOML template
pub fn minimal_config_toml() -> &'static str {
    r#"
backup_directory = "{backup_dir}"

[[databases]]
name = "orders-db"
type = "postgresql"
container = "pg"
database = "orders_db"
"#
}

/// Config with one target per supported engine
pub fn multi_target_config_toml() -> &'static str {
    r#"
backup_directory = "{backup_dir}"
timeout_seconds = 3600

[retention]
max_count = 7
max_age_days = 14

[[databases]]
name = "orders-db"
type = "postgres"
container = "pg"
database = "orders_db"
username = "app"
password_env = "ORDERS_DB_PASSWORD"
format = "plain"
compression = "none"

[[databases]]
name = "erp"
type = "mssql"
container = "mssql"
database = "Erp"
password_env = "ERP_SA_PASSWORD"

[[databases]]
name = "events"
type = "mongo"
container = "mongo"
database = "events"
username = "root"
password_env = "EVENTS_PASSWORD"
schedule = "30 1 * * *"

[databases.retention]
max_count = 3
max_age_days = 7
"#
}

/// Fill a config template with a backup directory
pub fn render_config(template: &str, backup_dir: &std::path::Path) -> String {
    template.replace(
        "{backup_dir}",
        &backup_dir.to_string_lossy().replace('\\', "/"),
    )
}
