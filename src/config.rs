use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration.
///
/// `database_path` is the remote store's SQLite file; leaving it unset means
/// no remote store is configured and the app runs read-only on local data.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the remote store database. None = remote not configured.
    pub database_path: Option<PathBuf>,
    /// Path to the local fallback payload.
    pub local_store_path: PathBuf,
    /// Quiet period after the last observed mutation before a persist.
    pub debounce_ms: u64,
    /// Interval between connectivity probes.
    pub probe_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mealweek");
        Self {
            database_path: None,
            local_store_path: data_dir.join("local.json"),
            debounce_ms: 2500,
            probe_interval_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        if let Ok(db_path) = std::env::var("MEALWEEK_DATABASE_PATH") {
            config.database_path = Some(PathBuf::from(db_path));
        }
        if let Ok(local_path) = std::env::var("MEALWEEK_LOCAL_STORE_PATH") {
            config.local_store_path = PathBuf::from(local_path);
        }
        if let Ok(ms) = std::env::var("MEALWEEK_DEBOUNCE_MS") {
            config.debounce_ms = ms
                .parse()
                .map_err(|_| ConfigError::BadValue("MEALWEEK_DEBOUNCE_MS", ms))?;
        }
        if let Ok(secs) = std::env::var("MEALWEEK_PROBE_INTERVAL_SECS") {
            config.probe_interval_secs = secs
                .parse()
                .map_err(|_| ConfigError::BadValue("MEALWEEK_PROBE_INTERVAL_SECS", secs))?;
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/mealweek/config.yaml
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mealweek")
            .join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    BadValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::BadValue(var, value) => {
                write!(f, "Invalid value for {}: '{}'", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
