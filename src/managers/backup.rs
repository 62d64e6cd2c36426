//! Backup orchestrator - runs dumps and records their outcome
//!
//! Per target: build the provider's command, run it through the executor,
//! write the captured output (optionally gzipped) under
//! `<backup_directory>/<target>/`, append a history record and apply
//! retention. Every per-target failure becomes a failed record and result;
//! only a history store that cannot record the failure is fatal.

use crate::config::{CompressionType, Config, DatabaseTarget, DatabaseType};
use crate::managers::history::{BackupRecord, HistoryError, HistoryStore};
use crate::managers::retention;
use crate::strategies::{BackupProvider, ProviderRegistry};
use crate::utils::executor::{CapturedOutput, ExecCommand, ExecError, ProcessExecutor};
use crate::utils::secrets::SecretResolver;
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("No backup provider registered for database type '{0}'")]
    NoProvider(DatabaseType),

    #[error("Backup command failed (exit code {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    #[error("Failed to extract backup file from container (exit code {exit_code}): {stderr}")]
    ExtractFailed { exit_code: i32, stderr: String },

    #[error("Backup file {0:?} already exists")]
    FileExists(PathBuf),

    #[error("Provider '{0}' does not stream to stdout but returned no container backup path")]
    MissingContainerPath(&'static str),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Outcome of one backup attempt, returned to the caller
#[derive(Debug, Clone)]
pub struct BackupResult {
    pub target_name: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub file_path: Option<PathBuf>,
    pub file_size_bytes: Option<u64>,
    pub error_message: Option<String>,
}

/// A finished, recorded backup file
struct Completed {
    file_path: PathBuf,
    file_size_bytes: u64,
    duration: Duration,
}

pub struct BackupOrchestrator<E: ProcessExecutor> {
    config: Config,
    providers: ProviderRegistry,
    executor: E,
    history: HistoryStore,
    secrets: SecretResolver,
}

impl<E: ProcessExecutor> BackupOrchestrator<E> {
    /// Create an orchestrator with the built-in providers
    pub fn new(config: Config, executor: E, secrets: SecretResolver) -> Self {
        let history = HistoryStore::new(&config.backup_directory);

        Self {
            config,
            providers: ProviderRegistry::default(),
            executor,
            history,
            secrets,
        }
    }

    /// Replace the provider registry
    pub fn with_providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Back up a single target.
    ///
    /// Failures are recorded and reported through [`BackupResult`]. An `Err`
    /// means the failure itself could not be written to history.
    pub async fn backup(&self, target: &DatabaseTarget) -> Result<BackupResult, HistoryError> {
        let started_at = Utc::now();
        let timer = Instant::now();

        info!("Starting backup for target: {} ({})", target.name, target.db_type);

        match self.run_backup(target, started_at, &timer).await {
            Ok(completed) => {
                info!(
                    "Backup for '{}' completed in {:.2}s: {:?} ({} bytes)",
                    target.name,
                    completed.duration.as_secs_f64(),
                    completed.file_path,
                    completed.file_size_bytes
                );

                // The backup is already recorded; a failed cleanup does not undo it
                match self.apply_retention(target).await {
                    Ok(0) => {}
                    Ok(deleted) => info!("Retention removed {} backup(s) of '{}'", deleted, target.name),
                    Err(e) => warn!("Retention failed for '{}': {}", target.name, e),
                }

                Ok(BackupResult {
                    target_name: target.name.clone(),
                    success: true,
                    timestamp: started_at,
                    duration: completed.duration,
                    file_path: Some(completed.file_path),
                    file_size_bytes: Some(completed.file_size_bytes),
                    error_message: None,
                })
            }
            Err(e) => {
                let duration = timer.elapsed();
                let message = e.to_string();
                error!("Backup failed for target '{}': {}", target.name, message);

                self.history.append(BackupRecord::failure(
                    &target.name,
                    started_at,
                    duration,
                    &message,
                ))?;

                Ok(BackupResult {
                    target_name: target.name.clone(),
                    success: false,
                    timestamp: started_at,
                    duration,
                    file_path: None,
                    file_size_bytes: None,
                    error_message: Some(message),
                })
            }
        }
    }

    /// Back up every configured target, one after another
    pub async fn backup_all(&self) -> Result<Vec<BackupResult>, HistoryError> {
        info!("Starting backup for {} targets", self.config.databases.len());

        let mut results = Vec::with_capacity(self.config.databases.len());
        for target in &self.config.databases {
            results.push(self.backup(target).await?);
        }

        let failed = results.iter().filter(|r| !r.success).count();
        info!(
            "Backup summary: {} succeeded, {} failed",
            results.len() - failed,
            failed
        );

        Ok(results)
    }

    /// Apply retention to a target, returning how many backups were removed
    pub async fn cleanup(&self, target: &DatabaseTarget) -> Result<usize, BackupError> {
        self.apply_retention(target).await
    }

    async fn run_backup(
        &self,
        target: &DatabaseTarget,
        started_at: DateTime<Utc>,
        timer: &Instant,
    ) -> Result<Completed, BackupError> {
        let provider = self
            .providers
            .get(&target.db_type)
            .ok_or_else(|| BackupError::NoProvider(target.db_type.clone()))?;

        let command = provider.build_command(target, &self.secrets);
        let file_name = backup_file_name(
            &target.name,
            started_at,
            provider.file_extension(target),
            target.compression,
        );

        let target_dir = self.target_dir(&target.name);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|source| BackupError::Io {
                path: target_dir.clone(),
                source,
            })?;

        let (output, file) = PartialOutput::create(target_dir.join(&file_name)).await?;

        if provider.streams_to_stdout() {
            self.stream_backup(&command, file, output.path(), target.compression)
                .await?;
        } else {
            self.file_based_backup(&command, provider, target, file, output.path())
                .await?;
        }

        let file_size_bytes = tokio::fs::metadata(output.path())
            .await
            .map_err(|source| BackupError::Io {
                path: output.path().to_path_buf(),
                source,
            })?
            .len();

        let duration = timer.elapsed();
        self.history.append(BackupRecord::success(
            &target.name,
            started_at,
            &file_name,
            file_size_bytes,
            duration,
        ))?;

        Ok(Completed {
            file_path: output.commit(),
            file_size_bytes,
            duration,
        })
    }

    /// Dump tools that write to stdout
    async fn stream_backup(
        &self,
        command: &ExecCommand,
        file: File,
        destination: &Path,
        compression: CompressionType,
    ) -> Result<(), BackupError> {
        let result = self.executor.execute(command).await?;

        if !result.is_success() {
            return Err(BackupError::CommandFailed {
                exit_code: result.exit_code,
                stderr: result.stderr,
            });
        }

        write_output(result.output, file, destination, compression).await
    }

    /// Dump tools that write a file inside the container: dump, `cat` it
    /// out, then `rm -f` it whether or not the copy worked.
    async fn file_based_backup(
        &self,
        command: &ExecCommand,
        provider: &dyn BackupProvider,
        target: &DatabaseTarget,
        file: File,
        destination: &Path,
    ) -> Result<(), BackupError> {
        let dump = self.executor.execute(command).await?;
        if !dump.is_success() {
            return Err(BackupError::CommandFailed {
                exit_code: dump.exit_code,
                stderr: dump.stderr,
            });
        }
        drop(dump);

        let container_path = provider
            .container_backup_path(target)
            .ok_or(BackupError::MissingContainerPath(provider.name()))?;

        let extracted = self
            .extract_container_file(
                &command.container,
                &container_path,
                file,
                destination,
                target.compression,
            )
            .await;

        self.remove_container_file(&command.container, &container_path)
            .await;

        extracted
    }

    async fn extract_container_file(
        &self,
        container: &str,
        container_path: &str,
        file: File,
        destination: &Path,
        compression: CompressionType,
    ) -> Result<(), BackupError> {
        let cat = ExecCommand::new(container, "cat").arg(container_path);
        let result = self.executor.execute(&cat).await?;

        if !result.is_success() {
            return Err(BackupError::ExtractFailed {
                exit_code: result.exit_code,
                stderr: result.stderr,
            });
        }

        write_output(result.output, file, destination, compression).await
    }

    /// Best effort: failures are logged and swallowed
    async fn remove_container_file(&self, container: &str, container_path: &str) {
        let rm = ExecCommand::new(container, "rm").args(["-f", container_path]);

        match self.executor.execute(&rm).await {
            Ok(result) if result.is_success() => {
                debug!("Removed {} from container {}", container_path, container)
            }
            Ok(result) => warn!(
                "Failed to remove {} from container {} (exit code {}): {}",
                container_path, container, result.exit_code, result.stderr
            ),
            Err(e) => warn!(
                "Failed to remove {} from container {}: {}",
                container_path, container, e
            ),
        }
    }

    async fn apply_retention(&self, target: &DatabaseTarget) -> Result<usize, BackupError> {
        let policy = target.effective_retention(&self.config.retention);
        let records = self.history.for_target(&target.name)?;
        let expired = retention::select_expired(&records, policy, Utc::now());

        let target_dir = self.target_dir(&target.name);
        let mut deleted = 0;

        // File first, then record: a crash in between leaves a dangling
        // record, never an untracked file
        for record in expired {
            let file_path = target_dir.join(&record.file_name);

            match tokio::fs::remove_file(&file_path).await {
                Ok(()) => info!("Deleted expired backup: {:?}", file_path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Expired backup already missing: {:?}", file_path)
                }
                Err(source) => {
                    return Err(BackupError::Io {
                        path: file_path,
                        source,
                    })
                }
            }

            self.history.remove(&target.name, &record.file_name)?;
            deleted += 1;
        }

        Ok(deleted)
    }

    fn target_dir(&self, target_name: &str) -> PathBuf {
        self.config.backup_directory.join(target_name)
    }
}

/// `{target}_{yyyy-MM-dd}_{HHmmss}{ext}[.gz]`
pub fn backup_file_name(
    target_name: &str,
    timestamp: DateTime<Utc>,
    extension: &str,
    compression: CompressionType,
) -> String {
    let mut name = format!(
        "{}_{}{}",
        target_name,
        timestamp.format("%Y-%m-%d_%H%M%S"),
        extension
    );

    if compression == CompressionType::Gzip {
        name.push_str(".gz");
    }

    name
}

/// Copy captured output into `file` (open at `destination`) on the blocking pool
async fn write_output(
    mut output: CapturedOutput,
    file: File,
    destination: &Path,
    compression: CompressionType,
) -> Result<(), BackupError> {
    let copied = tokio::task::spawn_blocking(move || copy_to_file(&mut output, file, compression))
        .await
        .map_err(io::Error::from)
        .and_then(|result| result)
        .map_err(|source| BackupError::Io {
            path: destination.to_path_buf(),
            source,
        })?;

    debug!("Wrote {} bytes of dump output to {:?}", copied, destination);
    Ok(())
}

fn copy_to_file(reader: &mut impl Read, file: File, compression: CompressionType) -> io::Result<u64> {
    let writer = BufWriter::new(file);

    let (copied, mut writer) = match compression {
        CompressionType::Gzip => {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            let copied = io::copy(reader, &mut encoder)?;
            (copied, encoder.finish()?)
        }
        CompressionType::None => {
            let mut writer = writer;
            let copied = io::copy(reader, &mut writer)?;
            (copied, writer)
        }
    };

    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(copied)
}

/// Destination file that is deleted on drop unless committed.
///
/// Only ever wraps a file this attempt created itself, so an earlier
/// backup with the same name is never touched. Covers error returns and
/// dropped futures alike.
struct PartialOutput {
    path: PathBuf,
    committed: bool,
}

impl PartialOutput {
    /// Create `path`, failing if it already exists
    async fn create(path: PathBuf) -> Result<(Self, File), BackupError> {
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| match source.kind() {
                io::ErrorKind::AlreadyExists => BackupError::FileExists(path.clone()),
                _ => BackupError::Io {
                    path: path.clone(),
                    source,
                },
            })?;

        let guard = Self {
            path,
            committed: false,
        };
        Ok((guard, file.into_std().await))
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self) -> PathBuf {
        self.committed = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial backup file: {:?}", self.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove partial backup file {:?}: {}", self.path, e),
        }
    }
}
