//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use lutra::config::{CompressionType, Config, DatabaseTarget, DatabaseType, RetentionPolicy};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A target with the defaults a loaded config would give it, uncompressed
pub fn target(name: &str, db_type: DatabaseType, container: &str, database: &str) -> DatabaseTarget {
    DatabaseTarget {
        name: name.to_string(),
        db_type,
        container: container.to_string(),
        database: database.to_string(),
        username: None,
        password_env: None,
        schedule: "0 3 * * *".to_string(),
        format: None,
        compression: CompressionType::None,
        retention: None,
    }
}

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    config: Config,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with a fresh backup root and no targets
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let backup_directory = temp_dir.path().join("backups");
        std::fs::create_dir_all(&backup_directory).expect("Failed to create backup dir");

        let config = Config {
            backup_directory,
            retention: RetentionPolicy::default(),
            timeout_seconds: None,
            log_directory: None,
            log_level: "info".to_string(),
            log_max_files: 10,
            databases: Vec::new(),
        };

        Self { temp_dir, config }
    }

    /// Set the global retention policy
    pub fn with_retention(mut self, max_count: u32, max_age_days: u32) -> Self {
        self.config.retention = RetentionPolicy {
            max_count,
            max_age_days,
        };
        self
    }

    /// Set the exec timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = Some(seconds);
        self
    }

    /// Add a PostgreSQL target
    pub fn add_postgres(self, name: &str, container: &str, database: &str) -> Self {
        self.add_target(target(name, DatabaseType::PostgreSql, container, database))
    }

    /// Add a SQL Server target
    pub fn add_sqlserver(self, name: &str, container: &str, database: &str) -> Self {
        self.add_target(target(name, DatabaseType::SqlServer, container, database))
    }

    /// Add a MongoDB target
    pub fn add_mongo(self, name: &str, container: &str, database: &str) -> Self {
        self.add_target(target(name, DatabaseType::MongoDb, container, database))
    }

    /// Add a target with full configuration
    pub fn add_target(mut self, target: DatabaseTarget) -> Self {
        self.config.databases.push(target);
        self
    }

    /// Modify the most recently added target
    pub fn last_target(mut self, f: impl FnOnce(&mut DatabaseTarget)) -> Self {
        if let Some(target) = self.config.databases.last_mut() {
            f(target);
        }
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the backup root
    pub fn backup_directory(&self) -> PathBuf {
        self.config.backup_directory.clone()
    }

    /// Build the Config; the backup root is deleted with the builder
    pub fn build(self) -> Config {
        self.config
    }

    /// Keep the temp directory alive alongside the config
    pub fn persist(self) -> (Config, TempDir) {
        (self.config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
