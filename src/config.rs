use crate::session::StudyOrder;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Card order within a session: "random" or "dueFirst" (default: random)
    #[serde(default)]
    pub order: StudyOrder,

    /// Show the interval each grade would schedule (default: true)
    #[serde(default = "default_show_intervals")]
    pub show_intervals: bool,

    /// Path to subjects directory
    #[serde(default = "default_subjects_dir")]
    pub subjects_dir: PathBuf,

    /// Path to database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Log filter directive, overridden by STUDYDECK_LOG (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory the log file is written to
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_show_intervals() -> bool {
    true
}

fn default_subjects_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("studydeck").join("subjects"))
        .unwrap_or_else(|| PathBuf::from("subjects"))
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("studydeck").join("studydeck.db"))
        .unwrap_or_else(|| PathBuf::from("studydeck.db"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("studydeck"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            order: StudyOrder::default(),
            show_intervals: default_show_intervals(),
            subjects_dir: default_subjects_dir(),
            db_path: default_db_path(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
        }
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(suffix) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(suffix);
    }
    path.to_path_buf()
}

impl Config {
    /// Load config from file or return defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a specific file, falling back to defaults if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config: {}", config_path.display()))?;
        config.subjects_dir = expand_tilde(&config.subjects_dir);
        config.db_path = expand_tilde(&config.db_path);
        config.log_dir = expand_tilde(&config.log_dir);
        Ok(config)
    }

    /// Path to config file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("studydeck").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Ensure required directories exist
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.subjects_dir).with_context(|| {
            format!(
                "Failed to create subjects directory: {}",
                self.subjects_dir.display()
            )
        })?;

        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::create_dir_all(&self.log_dir)?;

        Ok(())
    }
}
