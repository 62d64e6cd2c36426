//! SQL Server backups via `sqlcmd`
//!
//! `BACKUP DATABASE` writes to a file inside the container rather than to
//! stdout, so the orchestrator copies it out with `cat` and removes it.

use super::BackupProvider;
use crate::config::{DatabaseTarget, DatabaseType};
use crate::utils::executor::ExecCommand;
use crate::utils::secrets::SecretResolver;

/// Where `BACKUP DATABASE` writes inside the container
pub const CONTAINER_BACKUP_PATH: &str = "/tmp/lutra_backup.bak";

const SQLCMD: &str = "/opt/mssql-tools18/bin/sqlcmd";
const DEFAULT_USER: &str = "sa";

pub struct SqlServerProvider;

impl BackupProvider for SqlServerProvider {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::SqlServer
    }

    fn build_command(&self, target: &DatabaseTarget, secrets: &SecretResolver) -> ExecCommand {
        let backup_sql = format!(
            "BACKUP DATABASE [{}] TO DISK = N'{}' WITH FORMAT, INIT",
            target.database.replace(']', "]]"),
            CONTAINER_BACKUP_PATH
        );

        let mut cmd = ExecCommand::new(&target.container, SQLCMD).args([
            "-S",
            "localhost",
            "-U",
            target.username.as_deref().unwrap_or(DEFAULT_USER),
            "-C", // trust server certificate
            "-Q",
            backup_sql.as_str(),
        ]);

        if let Some(password) = secrets.resolve_ref(target.password_env.as_deref()) {
            cmd = cmd.env("SQLCMDPASSWORD", password);
        }

        cmd
    }

    fn file_extension(&self, _target: &DatabaseTarget) -> &'static str {
        ".bak"
    }

    fn streams_to_stdout(&self) -> bool {
        false
    }

    fn container_backup_path(&self, _target: &DatabaseTarget) -> Option<String> {
        Some(CONTAINER_BACKUP_PATH.to_string())
    }

    fn name(&self) -> &'static str {
        "sqlserver"
    }
}
