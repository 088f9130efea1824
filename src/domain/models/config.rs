use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Main configuration structure for lockcell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Search behaviour
    #[serde(default)]
    pub search: SearchConfig,

    /// Task substrate configuration
    #[serde(default)]
    pub substrate: SubstrateConfig,

    /// Retry policy for result retrieval
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Command oracle configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Interval between client progress polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

const fn default_poll_interval_ms() -> u64 {
    200
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            substrate: SubstrateConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
            oracle: OracleConfig::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// How failing complements are explored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Recurse into every failing complement.
    #[default]
    Default,
    /// Probe complements, then reason about the pattern of failures.
    Analyse,
}

impl SearchMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Analyse => "analyse",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "analyse" | "analyze" => Ok(Self::Analyse),
            other => Err(format!("unknown search mode: {other}")),
        }
    }
}

/// Search settings shared by every unit of work of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    #[serde(default)]
    pub mode: SearchMode,

    /// Fall back to the classical path when a structural guess is refuted
    /// instead of failing the job.
    #[serde(default = "default_true")]
    pub recover_guess_mismatch: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            recover_guess_mismatch: default_true(),
        }
    }
}

/// Task substrate configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SubstrateConfig {
    /// Units of work executing at the same time
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Page size for completed-task queries
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

const fn default_max_workers() -> usize {
    8
}

const fn default_page_size() -> usize {
    1000
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            page_size: default_page_size(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_initial_backoff_ms() -> u64 {
    2000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Log file rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Command oracle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OracleConfig {
    /// Program run for every test
    #[serde(default)]
    pub program: Option<String>,

    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,

    /// File listing one atom label per line
    #[serde(default)]
    pub atoms_file: Option<String>,

    /// Timeout of a single test run in seconds
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_oracle_timeout_secs() -> u64 {
    300
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            atoms_file: None,
            timeout_secs: default_oracle_timeout_secs(),
        }
    }
}
