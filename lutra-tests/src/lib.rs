//! Test utilities for lutra
//!
//! This crate provides shared test utilities, fixtures and helper
//! functions for testing the lutra backup orchestrator.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockExecutor, MockResponse};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let (config, _dir) = ConfigBuilder::new()
//!         .add_postgres("orders-db", "pg", "orders_db")
//!         .persist();
//!     let executor = MockExecutor::new().expect("pg_dump", MockResponse::stdout("dump"));
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::{target, ConfigBuilder};
pub use fixtures::*;
pub use test_context::{OptionAssertions, ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use lutra::config::{CompressionType, Config, DatabaseTarget, DatabaseType, RetentionPolicy};
pub use lutra::managers::history::{BackupRecord, HistoryStore};
pub use lutra::utils::executor::mock::{MockExecutor, MockResponse};
pub use lutra::utils::executor::{ExecCommand, ProcessExecutor};
pub use lutra::utils::secrets::SecretResolver;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
