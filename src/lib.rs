//! Lutra Library
//!
//! This library provides backup orchestration for databases running in
//! Docker containers: dump commands run through `docker exec`, output is
//! written (optionally gzipped) under a backup root, and every attempt is
//! recorded in a JSON history ledger that drives retention.

pub mod config;
pub mod managers;
pub mod strategies;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, load_env_file, Config, ConfigError, DatabaseTarget, DatabaseType};
pub use managers::backup::{BackupError, BackupOrchestrator, BackupResult};
pub use managers::history::{BackupRecord, HistoryError, HistoryStore};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use strategies::{BackupProvider, ProviderRegistry};
pub use utils::executor::{DockerExecutor, ExecCommand, ExecResult, ProcessExecutor};
pub use utils::secrets::SecretResolver;
