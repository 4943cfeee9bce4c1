//! Runtime settings: where the database lives and how loudly to log.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;

const DEFAULT_DB_NAME: &str = "flipnote.db";
const APP_DIR: &str = "flipnote";

pub const DB_ENV: &str = "FLIPNOTE_DB";
pub const LOG_ENV: &str = "FLIPNOTE_LOG";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub db_path: PathBuf,
    // EnvFilter directive string, e.g. "warn" or "flipnote=debug"
    pub log_filter: String,
}

impl Config {
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        Self {
            db_path: config_dir.join(DEFAULT_DB_NAME),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Defaults overridden by `FLIPNOTE_DB`, then `FLIPNOTE_LOG` or `RUST_LOG`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(path) = lookup(DB_ENV).filter(|p| !p.is_empty()) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(filter) = lookup(LOG_ENV)
            .or_else(|| lookup("RUST_LOG"))
            .filter(|f| !f.is_empty())
        {
            config.log_filter = filter;
        }

        config
    }

    /// Creates the database's parent directory if it is missing.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
