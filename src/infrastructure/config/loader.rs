use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Invalid max_workers: {0}. Must be between 1 and 1024")]
    InvalidMaxWorkers(usize),

    #[error("Invalid page_size: {0}. Must be at least 1")]
    InvalidPageSize(usize),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid oracle timeout_secs: {0}. Must be at least 1")]
    InvalidOracleTimeout(u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

const ENV_PREFIX: &str = "LOCKCELL_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .lockcell/config.yaml (project config)
    /// 3. .lockcell/local.yaml (local overrides, optional)
    /// 4. Environment variables (LOCKCELL_* prefix, `__` separates sections)
    ///
    /// # Errors
    /// Returns an error if a source cannot be parsed or the merged
    /// configuration fails validation.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".lockcell/config.yaml"))
            .merge(Yaml::file(".lockcell/local.yaml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring environment
    /// overrides
    ///
    /// # Arguments
    /// * `path` - YAML file replacing the project and local files
    ///
    /// # Errors
    /// Returns an error if the file cannot be parsed or validation fails.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        if config.substrate.max_workers == 0 || config.substrate.max_workers > 1024 {
            return Err(ConfigError::InvalidMaxWorkers(config.substrate.max_workers));
        }

        if config.substrate.page_size == 0 {
            return Err(ConfigError::InvalidPageSize(config.substrate.page_size));
        }

        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if config.oracle.timeout_secs == 0 {
            return Err(ConfigError::InvalidOracleTimeout(config.oracle.timeout_secs));
        }

        if config
            .oracle
            .program
            .as_deref()
            .is_some_and(|program| program.trim().is_empty())
        {
            return Err(ConfigError::ValidationFailed(
                "oracle program cannot be empty".to_string(),
            ));
        }

        if config.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::SearchMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "{contents}").expect("write config");
        file.flush().expect("flush config");
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.substrate.max_workers, 8);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
search:
  mode: analyse
  recover_guess_mismatch: false
substrate:
  max_workers: 4
  page_size: 50
logging:
  level: debug
  format: pretty
oracle:
  program: ./check.sh
  args: [--quick]
  timeout_secs: 60
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.search.mode, SearchMode::Analyse);
        assert!(!config.search.recover_guess_mismatch);
        assert_eq!(config.substrate.max_workers, 4);
        assert_eq!(config.substrate.page_size, 50);
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.oracle.program.as_deref(), Some("./check.sh"));
        assert_eq!(config.oracle.args, vec!["--quick".to_string()]);
        assert_eq!(config.retry.max_retries, 5, "unset sections keep defaults");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = Config::default();
        config.substrate.max_workers = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxWorkers(0))
        ));
    }

    #[test]
    fn test_validate_zero_page_size() {
        let mut config = Config::default();
        config.substrate.page_size = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidPageSize(0))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 30000;
        config.retry.max_backoff_ms = 10000;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30000, 10000))
        ));
    }

    #[test]
    fn test_validate_zero_retries_and_timeout() {
        let mut config = Config::default();
        config.retry.max_retries = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxRetries(0))
        ));

        let mut config = Config::default();
        config.oracle.timeout_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidOracleTimeout(0))
        ));
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let file = yaml_file("substrate:\n  max_workers: 3\nlogging:\n  level: warn\n");

        temp_env::with_vars(
            [
                ("LOCKCELL_LOGGING__LEVEL", Some("debug")),
                ("LOCKCELL_SEARCH__MODE", Some("analyse")),
            ],
            || {
                let config = ConfigLoader::load_from(file.path()).expect("config should load");
                assert_eq!(config.substrate.max_workers, 3);
                assert_eq!(config.logging.level, "debug", "environment should win");
                assert_eq!(config.search.mode, SearchMode::Analyse);
            },
        );
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let file = yaml_file("substrate:\n  page_size: 0\n");
        let err = ConfigLoader::load_from(file.path()).expect_err("page size 0 is invalid");
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_load_from_missing_file() {
        assert!(ConfigLoader::load_from("/nonexistent/lockcell.yaml").is_err());
    }

    #[test]
    fn test_hierarchical_merging() {
        let base = yaml_file("retry:\n  max_retries: 2\nlogging:\n  level: info\n  format: json\n");
        let local = yaml_file("logging:\n  level: debug\n");

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base.path()))
            .merge(Yaml::file(local.path()))
            .extract()
            .expect("merged config");

        assert_eq!(config.logging.level, "debug", "Override should win");
        assert_eq!(config.logging.format, "json", "Base value should persist");
        assert_eq!(config.retry.max_retries, 2);
    }
}
