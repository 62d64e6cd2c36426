//! Configuration module for lutra
//!
//! This module handles loading and validating configuration from TOML files,
//! and reading the `.env` file that holds database passwords.
//!
//! ## Retention
//!
//! A target's `retention` table replaces the global policy entirely. There is
//! no field-level merge.
//!
//! ## Example Usage
//!
//! ```no_run
//! use lutra::config;
//!
//! let config = config::load_config("/etc/lutra/lutra.toml")?;
//!
//! for target in &config.databases {
//!     println!("Target: {} ({})", target.name, target.db_type);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, load_env_file, parse_config, ConfigError, Result};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
