pub mod mongodb;
pub mod postgres;
pub mod sqlserver;

use crate::config::{DatabaseTarget, DatabaseType};
use crate::utils::executor::ExecCommand;
use crate::utils::secrets::SecretResolver;
use std::collections::HashMap;

pub use mongodb::MongoProvider;
pub use postgres::PostgresProvider;
pub use sqlserver::SqlServerProvider;

/// Trait for database dump strategies
pub trait BackupProvider: Send + Sync {
    /// Database type this provider handles
    fn db_type(&self) -> DatabaseType;

    /// Build the `docker exec` command that dumps the target
    fn build_command(&self, target: &DatabaseTarget, secrets: &SecretResolver) -> ExecCommand;

    /// Extension of the backup file, including the leading dot
    fn file_extension(&self, target: &DatabaseTarget) -> &'static str;

    /// Whether the dump is written to standard output.
    ///
    /// When false, the dump lands at [`BackupProvider::container_backup_path`]
    /// and has to be copied out of the container separately.
    fn streams_to_stdout(&self) -> bool {
        true
    }

    /// Path inside the container written by non-streaming dumps
    fn container_backup_path(&self, _target: &DatabaseTarget) -> Option<String> {
        None
    }

    /// Get provider name (for logging)
    fn name(&self) -> &'static str;
}

/// Providers keyed by the database type they handle
pub struct ProviderRegistry {
    providers: HashMap<DatabaseType, Box<dyn BackupProvider>>,
}

impl ProviderRegistry {
    /// Registry with no providers
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider, replacing any previous one for the same type
    pub fn register(&mut self, provider: Box<dyn BackupProvider>) {
        self.providers.insert(provider.db_type(), provider);
    }

    pub fn with(mut self, provider: Box<dyn BackupProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, db_type: &DatabaseType) -> Option<&dyn BackupProvider> {
        self.providers.get(db_type).map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    /// PostgreSQL, SQL Server and MongoDB
    fn default() -> Self {
        Self::empty()
            .with(Box::new(PostgresProvider))
            .with(Box::new(SqlServerProvider))
            .with(Box::new(MongoProvider))
    }
}
