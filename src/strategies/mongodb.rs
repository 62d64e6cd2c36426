//! MongoDB dumps via `mongodump --archive`
//!
//! `mongodump` only accepts a password on its command line. The secret is
//! forwarded as `LUTRA_MONGO_PASSWORD` and spliced in by a shell inside the
//! container, so it stays out of the exec argument list and the logs.

use super::BackupProvider;
use crate::config::{DatabaseTarget, DatabaseType};
use crate::utils::executor::ExecCommand;
use crate::utils::secrets::SecretResolver;

pub const PASSWORD_VAR: &str = "LUTRA_MONGO_PASSWORD";

const AUTH_DATABASE: &str = "admin";

pub struct MongoProvider;

impl MongoProvider {
    fn dump_args(target: &DatabaseTarget) -> Vec<String> {
        let mut args = vec![
            "--archive".to_string(),
            "--db".to_string(),
            target.database.clone(),
        ];

        if let Some(ref user) = target.username {
            args.extend([
                "--username".to_string(),
                user.clone(),
                "--authenticationDatabase".to_string(),
                AUTH_DATABASE.to_string(),
            ]);
        }

        args
    }
}

impl BackupProvider for MongoProvider {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::MongoDb
    }

    fn build_command(&self, target: &DatabaseTarget, secrets: &SecretResolver) -> ExecCommand {
        let args = Self::dump_args(target);

        match secrets.resolve_ref(target.password_env.as_deref()) {
            Some(password) => ExecCommand::new(&target.container, "sh")
                .arg("-c")
                .arg(format!(r#"exec mongodump "$@" --password "${}""#, PASSWORD_VAR))
                .arg("mongodump") // $0
                .args(args)
                .env(PASSWORD_VAR, password),
            None => ExecCommand::new(&target.container, "mongodump").args(args),
        }
    }

    fn file_extension(&self, _target: &DatabaseTarget) -> &'static str {
        ".archive"
    }

    fn name(&self) -> &'static str {
        "mongodb"
    }
}
