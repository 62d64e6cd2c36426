//! Test context and harness for orchestrator tests
//!
//! Provides a unified context for setting up and inspecting a backup root.

use crate::config_builder::ConfigBuilder;
use anyhow::Result;
use flate2::read::GzDecoder;
use lutra::config::Config;
use lutra::managers::backup::BackupOrchestrator;
use lutra::managers::history::{BackupRecord, HistoryStore};
use lutra::utils::executor::mock::MockExecutor;
use lutra::utils::secrets::SecretResolver;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context that owns a temporary backup root and its configuration
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// The test configuration
    config: Config,
}

impl TestContext {
    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();
        Self { temp_dir, config }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory holding a target's backup files
    pub fn target_dir(&self, target_name: &str) -> PathBuf {
        self.config.backup_directory.join(target_name)
    }

    /// Orchestrator over this context's config with the built-in providers.
    ///
    /// Keep a clone of `executor` to inspect the recorded calls afterwards.
    pub fn orchestrator(&self, executor: MockExecutor) -> BackupOrchestrator<MockExecutor> {
        self.orchestrator_with_secrets(executor, SecretResolver::default())
    }

    pub fn orchestrator_with_secrets(
        &self,
        executor: MockExecutor,
        secrets: SecretResolver,
    ) -> BackupOrchestrator<MockExecutor> {
        BackupOrchestrator::new(self.config.clone(), executor, secrets)
    }

    /// History ledger of the backup root
    pub fn history(&self) -> HistoryStore {
        HistoryStore::new(&self.config.backup_directory)
    }

    /// All history records, newest first
    pub fn records(&self) -> Vec<BackupRecord> {
        self.history().all().expect("Failed to read history")
    }

    /// Names of the files in a target's directory, sorted
    pub fn backup_files(&self, target_name: &str) -> Vec<String> {
        let dir = self.target_dir(target_name);
        let mut names: Vec<String> = match std::fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// Create a file in a target's directory
    pub fn create_backup_file(&self, target_name: &str, file_name: &str, content: &[u8]) -> PathBuf {
        let dir = self.target_dir(target_name);
        std::fs::create_dir_all(&dir).expect("Failed to create target directory");
        let path = dir.join(file_name);
        std::fs::write(&path, content).expect("Failed to write backup file");
        path
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Read a gzipped file back into bytes
    pub fn read_gzip(&self, path: &Path) -> Result<Vec<u8>> {
        let mut decoded = Vec::new();
        GzDecoder::new(std::fs::File::open(path)?).read_to_end(&mut decoded)?;
        Ok(decoded)
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}

/// Extension trait for Option assertions
pub trait OptionAssertions<T> {
    /// Assert that the option is Some and return the value
    fn assert_some(self) -> T;

    /// Assert that the option is None
    fn assert_none(self);
}

impl<T: std::fmt::Debug> OptionAssertions<T> for Option<T> {
    fn assert_some(self) -> T {
        match self {
            Some(v) => v,
            None => panic!("Expected Some, got None"),
        }
    }

    fn assert_none(self) {
        if let Some(v) = self {
            panic!("Expected None, got Some: {:?}", v);
        }
    }
}
