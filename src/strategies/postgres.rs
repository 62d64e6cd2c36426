//! PostgreSQL dumps via `pg_dump`
//!
//! Custom format (`-Fc`, `.dump`) unless the target asks for `plain`
//! (`-Fp`, `.sql`). The password travels in `PGPASSWORD`.

use super::BackupProvider;
use crate::config::{DatabaseTarget, DatabaseType};
use crate::utils::executor::ExecCommand;
use crate::utils::secrets::SecretResolver;

pub struct PostgresProvider;

impl PostgresProvider {
    fn is_plain(target: &DatabaseTarget) -> bool {
        target
            .format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("plain"))
    }
}

impl BackupProvider for PostgresProvider {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::PostgreSql
    }

    fn build_command(&self, target: &DatabaseTarget, secrets: &SecretResolver) -> ExecCommand {
        let mut cmd = ExecCommand::new(&target.container, "pg_dump");

        if let Some(ref user) = target.username {
            cmd = cmd.args(["-U", user.as_str()]);
        }

        cmd = cmd
            .arg(if Self::is_plain(target) { "-Fp" } else { "-Fc" })
            .arg(&target.database);

        if let Some(password) = secrets.resolve_ref(target.password_env.as_deref()) {
            cmd = cmd.env("PGPASSWORD", password);
        }

        cmd
    }

    fn file_extension(&self, target: &DatabaseTarget) -> &'static str {
        if Self::is_plain(target) {
            ".sql"
        } else {
            ".dump"
        }
    }

    fn name(&self) -> &'static str {
        "postgresql"
    }
}
