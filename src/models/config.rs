//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::diff::{ExclusionPattern, ExclusionSet, StructuralDiffer};
use crate::error::{AppError, Result};

/// Environment variable that overrides `api.token`.
pub const TOKEN_ENV: &str = "COURSEWATCH_TOKEN";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LMS web service settings
    #[serde(default)]
    pub api: ApiConfig,

    /// File locations relative to the storage directory
    #[serde(default)]
    pub paths: PathsConfig,

    /// Diff and history behavior
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration, or defaults when the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
            other => other,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.api.token = token;
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.api.base_url)
            .map_err(|e| AppError::validation(format!("api.base_url is invalid: {}", e)))?;
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.monitor.history_capacity == 0 {
            return Err(AppError::validation("monitor.history_capacity must be > 0"));
        }
        if self.monitor.max_depth == 0 {
            return Err(AppError::validation("monitor.max_depth must be > 0"));
        }
        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            return Err(AppError::validation(format!(
                "logging.level '{}' is not a log level",
                self.logging.level
            )));
        }
        if self.paths.resources_dir.as_os_str().is_empty() {
            return Err(AppError::validation("paths.resources_dir is empty"));
        }
        Ok(())
    }
}

/// LMS web service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Site root, e.g. `https://moodle.example.edu`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Web service token
    #[serde(default)]
    pub token: String,

    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification
    #[serde(default = "defaults::accept_invalid_certs")]
    pub accept_invalid_certs: bool,

    /// Number of popup notifications requested per run
    #[serde(default = "defaults::notification_limit")]
    pub notification_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            token: String::new(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            accept_invalid_certs: defaults::accept_invalid_certs(),
            notification_limit: defaults::notification_limit(),
        }
    }
}

/// File locations, relative to the storage directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding snapshot files
    #[serde(default = "defaults::resources_dir")]
    pub resources_dir: PathBuf,

    /// Run history file
    #[serde(default = "defaults::log_file")]
    pub log_file: String,

    /// Watched course list
    #[serde(default = "defaults::watchlist_file")]
    pub watchlist_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            resources_dir: defaults::resources_dir(),
            log_file: defaults::log_file(),
            watchlist_file: defaults::watchlist_file(),
        }
    }
}

/// Diff and history behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Number of run entries kept in the history log
    #[serde(default = "defaults::history_capacity")]
    pub history_capacity: usize,

    /// Nesting limit for snapshot traversal
    #[serde(default = "defaults::max_depth")]
    pub max_depth: usize,

    /// Paths whose differences are never reported
    #[serde(default = "defaults::exclude_paths")]
    pub exclude_paths: Vec<ExclusionPattern>,

    /// Also write each entity's change records next to its snapshots
    #[serde(default)]
    pub write_diff_artifacts: bool,
}

impl MonitorConfig {
    pub fn exclusions(&self) -> ExclusionSet {
        ExclusionSet::new(self.exclude_paths.clone())
    }

    /// Build the structural differ described by this section.
    pub fn differ(&self) -> StructuralDiffer {
        StructuralDiffer::new(self.exclusions()).with_max_depth(self.max_depth)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: defaults::history_capacity(),
            max_depth: defaults::max_depth(),
            exclude_paths: defaults::exclude_paths(),
            write_diff_artifacts: false,
        }
    }
}

/// Logging settings.
///
/// `RUST_LOG` and `--verbose` take precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl LoggingConfig {
    /// Configured level, `info` if it does not parse.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use crate::diff::{DEFAULT_MAX_DEPTH, ExclusionPattern};

    // API defaults
    pub fn base_url() -> String {
        "https://moodle.ncku.edu.tw".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; coursewatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn accept_invalid_certs() -> bool {
        true
    }
    pub fn notification_limit() -> u32 {
        20
    }

    // Path defaults
    pub fn resources_dir() -> PathBuf {
        PathBuf::from("resources")
    }
    pub fn log_file() -> String {
        "log.json".into()
    }
    pub fn watchlist_file() -> String {
        "watchlist.json".into()
    }

    // Monitor defaults
    pub fn history_capacity() -> usize {
        100
    }
    pub fn max_depth() -> usize {
        DEFAULT_MAX_DEPTH
    }
    pub fn exclude_paths() -> Vec<ExclusionPattern> {
        [
            "root['fetched_at']",
            "root['assignments'][*]['contextid']",
            "root['contents'][*]['modules'][*]['id']",
        ]
        .iter()
        .filter_map(|p| ExclusionPattern::parse(p).ok())
        .collect()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
