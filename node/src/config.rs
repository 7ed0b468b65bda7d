//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use spamdb_ledger::LedgerConfig;
use spamdb_store_lmdb::LmdbEnvironment;
use spamdb_types::{CountryCode, StoreParams};

use crate::{LogFormat, NodeError};

/// Configuration for a spamdb node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Maximum number of named LMDB databases.
    #[serde(default = "default_max_dbs")]
    pub max_dbs: u32,

    /// Days kept before a slot is reused.
    #[serde(default = "default_window_days")]
    pub window_days: u64,

    /// Length of a day in seconds. Only tests should change this.
    #[serde(default = "default_seconds_per_day")]
    pub seconds_per_day: u64,

    /// Entries per daily log.
    #[serde(default = "default_day_capacity")]
    pub day_capacity: u64,

    /// Country codes whose whole window is provisioned at startup.
    #[serde(default)]
    pub country_codes: Vec<String>,

    /// Log a number at most once per day.
    #[serde(default)]
    pub skip_repeat_same_day: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./spamdb_data")
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_max_dbs() -> u32 {
    8
}

fn default_window_days() -> u64 {
    StoreParams::spam_db_defaults().window_days
}

fn default_seconds_per_day() -> u64 {
    StoreParams::SECONDS_PER_DAY
}

fn default_day_capacity() -> u64 {
    StoreParams::spam_db_defaults().day_capacity
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Reject settings the store cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.window_days == 0 {
            return Err(NodeError::Config("window_days must be at least 1".into()));
        }
        if self.seconds_per_day == 0 {
            return Err(NodeError::Config("seconds_per_day must be at least 1".into()));
        }
        if self.day_capacity == 0 {
            return Err(NodeError::Config("day_capacity must be at least 1".into()));
        }
        if self.max_dbs < LmdbEnvironment::MIN_DBS {
            return Err(NodeError::Config(format!(
                "max_dbs is {}, need at least {}",
                self.max_dbs,
                LmdbEnvironment::MIN_DBS
            )));
        }
        for cc in &self.country_codes {
            CountryCode::new(cc.as_str())
                .map_err(|e| NodeError::Config(format!("country_codes: {e}")))?;
        }
        Ok(())
    }

    pub fn store_params(&self) -> StoreParams {
        StoreParams {
            window_days: self.window_days,
            seconds_per_day: self.seconds_per_day,
            day_capacity: self.day_capacity,
        }
    }

    /// Install the global tracing subscriber from `log_format` and
    /// `log_level`. Call once per process, before [`crate::SpamDbNode::open`].
    pub fn init_logging(&self) {
        crate::init_logging(self.log_format, &self.log_level);
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            params: self.store_params(),
            skip_repeat_same_day: self.skip_repeat_same_day,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            max_dbs: default_max_dbs(),
            window_days: default_window_days(),
            seconds_per_day: default_seconds_per_day(),
            day_capacity: default_day_capacity(),
            country_codes: Vec::new(),
            skip_repeat_same_day: false,
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.window_days, config.window_days);
        assert_eq!(parsed.day_capacity, config.day_capacity);
        assert_eq!(parsed.log_format, config.log_format);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.window_days, 60);
        assert_eq!(config.seconds_per_day, 86_400);
        assert_eq!(config.day_capacity, 20_000);
        assert_eq!(config.log_format, LogFormat::Human);
        assert!(!config.skip_repeat_same_day);
        assert!(config.country_codes.is_empty());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            country_codes = ["1", "44"]
            day_capacity = 500
            log_format = "json"
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.country_codes, vec!["1", "44"]);
        assert_eq!(config.day_capacity, 500);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.window_days, 60); // default
        assert_eq!(config.ledger_config().params.day_capacity, 500);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let result = NodeConfig::from_toml_str(r#"log_format = "xml""#);
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn validate_catches_bad_settings() {
        let mut config = NodeConfig::default();
        assert!(config.validate().is_ok());

        config.country_codes = vec!["1a".into()];
        assert!(config.validate().is_err());

        config.country_codes.clear();
        config.window_days = 0;
        assert!(config.validate().is_err());

        config.window_days = 60;
        config.max_dbs = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/spamdb.toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn init_logging_installs_global_subscriber() {
        let config = NodeConfig::from_toml_str(r#"log_format = "json""#).unwrap();
        config.init_logging();
        assert!(tracing::dispatcher::has_been_set());
        tracing::info!(format = %config.log_format, "logging initialised");
    }
}
