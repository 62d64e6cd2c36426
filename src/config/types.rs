use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base directory for backup files and the history ledger
    pub backup_directory: PathBuf,

    /// Default retention policy, replaced wholesale by a target override
    #[serde(default)]
    pub retention: RetentionPolicy,

    /// Timeout for a single `docker exec` invocation
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Logging configuration
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,

    #[serde(default)]
    pub databases: Vec<DatabaseTarget>,
}

/// One database to back up
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DatabaseTarget {
    pub name: String,

    #[serde(rename = "type")]
    pub db_type: DatabaseType,

    /// Docker container name or ID
    pub container: String,

    /// Database name inside the container
    pub database: String,

    #[serde(default)]
    pub username: Option<String>,

    /// Name of the environment variable holding the password
    #[serde(default)]
    pub password_env: Option<String>,

    /// Cron expression, only consumed by schedulers
    #[serde(default = "default_schedule")]
    pub schedule: String,

    /// Dump format hint (PostgreSQL: "custom" or "plain")
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub compression: CompressionType,

    #[serde(default)]
    pub retention: Option<RetentionPolicy>,
}

impl DatabaseTarget {
    /// Retention for this target: its own override, or the global policy
    pub fn effective_retention<'a>(&'a self, global: &'a RetentionPolicy) -> &'a RetentionPolicy {
        self.retention.as_ref().unwrap_or(global)
    }
}

/// Supported database engines.
///
/// Unknown names deserialize into [`DatabaseType::Other`] so a single bad
/// target fails at backup time instead of rejecting the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    PostgreSql,
    SqlServer,
    MongoDb,
    Other(String),
}

impl DatabaseType {
    pub fn as_str(&self) -> &str {
        match self {
            DatabaseType::PostgreSql => "postgresql",
            DatabaseType::SqlServer => "sqlserver",
            DatabaseType::MongoDb => "mongodb",
            DatabaseType::Other(name) => name,
        }
    }
}

impl From<&str> for DatabaseType {
    fn from(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "postgresql" | "postgres" => DatabaseType::PostgreSql,
            "sqlserver" | "mssql" => DatabaseType::SqlServer,
            "mongodb" | "mongo" => DatabaseType::MongoDb,
            _ => DatabaseType::Other(value.to_string()),
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DatabaseType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DatabaseType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(DatabaseType::from(value.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    None,
    #[default]
    Gzip,
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionType::None => f.write_str("none"),
            CompressionType::Gzip => f.write_str("gzip"),
        }
    }
}

/// A backup is deleted only when it ranks beyond `max_count` successful
/// backups *and* is older than `max_age_days`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetentionPolicy {
    #[serde(default = "default_max_count")]
    pub max_count: u32,
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
            max_age_days: default_max_age_days(),
        }
    }
}

// Default value functions

fn default_max_count() -> u32 { 10 }
fn default_max_age_days() -> u32 { 30 }
fn default_schedule() -> String { "0 3 * * *".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
