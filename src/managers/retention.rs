//! Retention selection
//!
//! A successful backup expires only when it ranks beyond `max_count`
//! (newest first) *and* is older than `max_age_days`. Failed attempts are
//! never counted or selected.

use crate::config::RetentionPolicy;
use crate::managers::history::BackupRecord;
use chrono::{DateTime, Duration, Utc};

/// Records to delete under `policy`, newest first
pub fn select_expired<'a>(
    records: &'a [BackupRecord],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Vec<&'a BackupRecord> {
    let mut successful: Vec<&BackupRecord> = records.iter().filter(|r| r.success).collect();
    successful.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    if successful.len() <= policy.max_count as usize {
        return Vec::new();
    }

    // A cutoff before the representable range means nothing is old enough
    let Some(cutoff) = now.checked_sub_signed(Duration::days(i64::from(policy.max_age_days))) else {
        return Vec::new();
    };

    successful
        .into_iter()
        .skip(policy.max_count as usize)
        .filter(|r| r.timestamp < cutoff)
        .collect()
}
