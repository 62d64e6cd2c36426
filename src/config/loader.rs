use super::expand_tilde;
use super::types::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Target '{name}' not found. Available targets: {available}")]
    TargetNotFound { name: String, available: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(contents: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(contents)?;
    validate_config(&config)?;

    config.backup_directory = expand_tilde(&config.backup_directory);
    config.log_directory = config.log_directory.as_deref().map(expand_tilde);

    Ok(config)
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.backup_directory.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "'backup_directory' is required".to_string(),
        ));
    }

    if config.databases.is_empty() {
        return Err(ConfigError::ValidationError(
            "At least one database target must be configured under 'databases'".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for (i, target) in config.databases.iter().enumerate() {
        validate_target(i, target)?;

        if !seen.insert(target.name.to_lowercase()) {
            return Err(ConfigError::ValidationError(format!(
                "databases[{}]: duplicate target name '{}'",
                i, target.name
            )));
        }
    }

    Ok(())
}

fn validate_target(index: usize, target: &DatabaseTarget) -> Result<()> {
    let prefix = format!("databases[{}]", index);

    if target.name.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{}: 'name' is required",
            prefix
        )));
    }

    // The name becomes a directory under the backup root
    if target.name.contains(['/', '\\']) || target.name == "." || target.name == ".." {
        return Err(ConfigError::ValidationError(format!(
            "{} ({}): 'name' must not contain path separators",
            prefix, target.name
        )));
    }

    if target.container.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} ({}): 'container' is required",
            prefix, target.name
        )));
    }

    if target.database.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} ({}): 'database' is required",
            prefix, target.name
        )));
    }

    if let DatabaseType::Other(ref name) = target.db_type {
        warn!(
            "{} ({}): unsupported database type '{}', backups of this target will fail",
            prefix, target.name, name
        );
    }

    Ok(())
}

impl Config {
    /// Find a target by name (case-insensitive)
    pub fn find_target(&self, name: &str) -> Result<&DatabaseTarget> {
        self.databases
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::TargetNotFound {
                name: name.to_string(),
                available: self
                    .databases
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Read `KEY=VALUE` pairs from a `.env` file.
///
/// Blank lines, `#` comments and lines without a key are skipped. A missing
/// file yields an empty map.
pub fn load_env_file<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let contents = fs::read_to_string(path)?;
    Ok(parse_env(&contents))
}

fn parse_env(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
