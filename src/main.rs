use anyhow::Result;
use clap::{Parser, Subcommand};
use lutra::config::{self, Config, DatabaseTarget};
use lutra::managers::logging;
use lutra::{BackupOrchestrator, BackupResult, DockerExecutor, HistoryStore, SecretResolver};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "lutra")]
#[command(about = "Backs up databases running in Docker containers", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/lutra/lutra.toml")]
    config: PathBuf,

    /// Path to the .env file holding database passwords
    #[arg(long, default_value = "/etc/lutra/.env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run and list database backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Show backup history
    History {
        /// Only show history for this target
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Apply retention and remove old backups
    Cleanup {
        /// Only clean up this target
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Run backups for all targets or a specific one
    Run {
        /// Specific target to back up (defaults to all targets)
        #[arg(short, long)]
        target: Option<String>,
    },

    /// List configured database targets
    List,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init_console_logging()?;
            eprintln!("Configuration error ({}): {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };

    let log_guard = logging::setup(&config)?;

    match cli.command {
        Commands::Config { command: ConfigCommands::Validate } => {
            println!(
                "✓ Configuration is valid ({} target(s))",
                config.databases.len()
            );
        }

        Commands::Backup { command: BackupCommands::List } => {
            print_targets(&config.databases);
        }

        Commands::Backup { command: BackupCommands::Run { target } } => {
            let orchestrator = create_orchestrator(config, &cli.env_file)?;

            let results = match target {
                Some(name) => {
                    let target = orchestrator.config().find_target(&name)?.clone();
                    println!("Running backup for target: {}", target.name);
                    vec![orchestrator.backup(&target).await?]
                }
                None => {
                    println!("Running backups for all targets...");
                    orchestrator.backup_all().await?
                }
            };

            print_results(&results);

            if results.iter().any(|r| !r.success) {
                // exit() skips destructors; flush file logs first
                drop(log_guard);
                std::process::exit(1);
            }
        }

        Commands::History { target } => {
            let history = HistoryStore::new(&config.backup_directory);

            let records = match target {
                Some(name) => {
                    let target = config.find_target(&name)?;
                    history.for_target(&target.name)?
                }
                None => history.all()?,
            };

            if records.is_empty() {
                println!("No backup history found.");
                return Ok(());
            }

            println!(
                "{:<20} {:<20} {:<45} {:>10} {:>10}  Status",
                "Target", "Timestamp", "File", "Size", "Duration"
            );
            for record in &records {
                let size = if record.success {
                    format_bytes(record.file_size_bytes)
                } else {
                    "-".to_string()
                };
                let status = if record.success {
                    "OK".to_string()
                } else {
                    format!("FAILED {}", record.error_message.as_deref().unwrap_or(""))
                };

                println!(
                    "{:<20} {:<20} {:<45} {:>10} {:>10}  {}",
                    record.target_name,
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.file_name,
                    size,
                    format!("{}ms", record.duration_ms),
                    status
                );
            }
        }

        Commands::Cleanup { target } => {
            let orchestrator = create_orchestrator(config, &cli.env_file)?;

            let targets: Vec<DatabaseTarget> = match target {
                Some(name) => vec![orchestrator.config().find_target(&name)?.clone()],
                None => orchestrator.config().databases.clone(),
            };

            let mut total = 0;
            let mut failed = 0;
            for target in &targets {
                match orchestrator.cleanup(target).await {
                    Ok(deleted) => {
                        total += deleted;
                        println!("  {}: removed {} backup(s)", target.name, deleted);
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::error!("Cleanup failed for target '{}': {}", target.name, e);
                        println!("  {}: FAILED {}", target.name, e);
                    }
                }
            }

            if failed > 0 {
                println!(
                    "\n✗ Cleanup finished with {} failed target(s). Removed {} total backup(s).",
                    failed, total
                );
                drop(log_guard);
                std::process::exit(1);
            }

            println!("\n✓ Cleanup complete. Removed {} total backup(s).", total);
        }
    }

    Ok(())
}

fn create_orchestrator(config: Config, env_file: &Path) -> Result<BackupOrchestrator<DockerExecutor>> {
    let secrets = SecretResolver::from_env(config::load_env_file(env_file)?);
    let executor =
        DockerExecutor::new().with_timeout(config.timeout_seconds.map(Duration::from_secs));

    Ok(BackupOrchestrator::new(config, executor, secrets))
}

fn print_targets(targets: &[DatabaseTarget]) {
    println!(
        "{:<20} {:<12} {:<20} {:<20} {:<15} {}",
        "Name", "Type", "Container", "Database", "Schedule", "Compression"
    );
    for target in targets {
        println!(
            "{:<20} {:<12} {:<20} {:<20} {:<15} {}",
            target.name,
            target.db_type,
            target.container,
            target.database,
            target.schedule,
            target.compression
        );
    }
}

fn print_results(results: &[BackupResult]) {
    for result in results {
        let duration = format!("{:.1}s", result.duration.as_secs_f64());

        if result.success {
            println!(
                "✓ {:<20} OK      {:>8} {:>10}  {}",
                result.target_name,
                duration,
                result.file_size_bytes.map(format_bytes).unwrap_or_else(|| "-".to_string()),
                result
                    .file_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        } else {
            println!(
                "✗ {:<20} FAILED  {:>8} {:>10}  {}",
                result.target_name,
                duration,
                "-",
                result.error_message.as_deref().unwrap_or("Unknown error")
            );
        }
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    let failed = results.len() - succeeded;

    if failed == 0 {
        println!("\n{} backup(s) completed successfully.", succeeded);
    } else {
        println!("\n{} succeeded, {} failed.", succeeded, failed);
    }
}

/// Human readable size: B, KB, MB, GB
fn format_bytes(bytes: u64) -> String {
    const SUFFIXES: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut order = 0;
    while size >= 1024.0 && order < SUFFIXES.len() - 1 {
        order += 1;
        size /= 1024.0;
    }

    let formatted = format!("{:.2}", size);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SUFFIXES[order])
}
