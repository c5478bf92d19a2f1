//! Configuration types for poly-history

use crate::clob::{ClobConfig, CLOB_API_URL};
use crate::export::{ExportFormat, Exporter, TIMESTAMP_PLACEHOLDER};
use crate::market::{GammaConfig, GAMMA_API_URL};
use crate::processor::{ProcessorConfig, DEFAULT_TARGET_OUTCOME};
use crate::rate_limit::RateLimiter;
use crate::telemetry::LogFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub discovery: DiscoveryConfig,
    pub history: HistoryConfig,
    pub rate_limit: RateLimitConfig,
    pub selection: SelectionConfig,
    pub export: ExportConfig,
    pub telemetry: TelemetryConfig,
}

/// API endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,
    #[serde(default = "default_clob_url")]
    pub clob_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gamma_url() -> String {
    GAMMA_API_URL.to_string()
}
fn default_clob_url() -> String {
    CLOB_API_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            gamma_url: default_gamma_url(),
            clob_url: default_clob_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Market discovery filters and paging
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Free-text search applied server-side and to market questions
    #[serde(default)]
    pub search: Option<String>,

    /// Tag slug filter
    #[serde(default)]
    pub tag: Option<String>,

    /// Only closed events
    #[serde(default = "default_true")]
    pub closed: bool,

    /// Only archived events
    #[serde(default)]
    pub archived: bool,

    /// Events requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Pause before retrying a failed page (seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Cap on consecutive retries of one page; unset retries forever
    #[serde(default)]
    pub max_page_retries: Option<u32>,
}

fn default_true() -> bool {
    true
}
fn default_page_size() -> u32 {
    100
}
fn default_retry_delay_secs() -> u64 {
    5
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search: None,
            tag: None,
            closed: true,
            archived: false,
            page_size: default_page_size(),
            retry_delay_secs: default_retry_delay_secs(),
            max_page_retries: None,
        }
    }
}

/// Price history fetching
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Sampling granularity sent as `fidelity`
    #[serde(default = "default_fidelity")]
    pub fidelity: u32,

    /// Total attempts per request when rate limited
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the first retry (milliseconds), doubled each retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_fidelity() -> u32 {
    60
}
fn default_max_attempts() -> u32 {
    5
}
fn default_initial_backoff_ms() -> u64 {
    2000
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            fidelity: default_fidelity(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// Minimum spacing between CLOB requests
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    1000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

/// Which outcome token is exported per market
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_target_outcome")]
    pub target_outcome: String,
}

fn default_target_outcome() -> String {
    DEFAULT_TARGET_OUTCOME.to_string()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            target_outcome: default_target_outcome(),
        }
    }
}

/// Output and cache locations
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Must contain `{timestamp}`
    #[serde(default = "default_filename_pattern")]
    pub filename_pattern: String,

    #[serde(default)]
    pub format: ExportFormat,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_cache_file")]
    pub cache_file: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}
fn default_filename_pattern() -> String {
    "polymarket_history_{timestamp}".to_string()
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}
fn default_cache_file() -> String {
    "processed_markets.txt".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            filename_pattern: default_filename_pattern(),
            format: ExportFormat::default(),
            cache_dir: default_cache_dir(),
            cache_file: default_cache_file(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` if given, else use defaults; validates either way
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.gamma_url.trim().is_empty() || self.api.clob_url.trim().is_empty() {
            return Err(ConfigError::Invalid("API URLs must not be empty".into()));
        }
        if self.discovery.page_size == 0 {
            return Err(ConfigError::Invalid("discovery.page_size must be > 0".into()));
        }
        if self.history.max_attempts == 0 {
            return Err(ConfigError::Invalid("history.max_attempts must be > 0".into()));
        }
        if self.selection.target_outcome.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "selection.target_outcome must not be empty".into(),
            ));
        }
        if !self.export.filename_pattern.contains(TIMESTAMP_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "export.filename_pattern must contain {TIMESTAMP_PLACEHOLDER}"
            )));
        }
        if self.export.cache_file.trim().is_empty() {
            return Err(ConfigError::Invalid("export.cache_file must not be empty".into()));
        }
        Ok(())
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Gamma client settings
    pub fn gamma_config(&self) -> GammaConfig {
        GammaConfig {
            base_url: self.api.gamma_url.clone(),
            timeout: self.timeout(),
            search: self.discovery.search.clone(),
            tag: self.discovery.tag.clone(),
            closed: self.discovery.closed,
            archived: self.discovery.archived,
            page_size: self.discovery.page_size,
            retry_delay: Duration::from_secs(self.discovery.retry_delay_secs),
            max_page_retries: self.discovery.max_page_retries,
        }
    }

    /// CLOB client settings
    pub fn clob_config(&self) -> ClobConfig {
        ClobConfig {
            base_url: self.api.clob_url.clone(),
            timeout: self.timeout(),
            fidelity: self.history.fidelity,
            max_attempts: self.history.max_attempts,
            initial_backoff: Duration::from_millis(self.history.initial_backoff_ms),
        }
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            search: self.discovery.search.clone(),
            target_outcome: self.selection.target_outcome.clone(),
        }
    }

    pub fn exporter(&self) -> Exporter {
        Exporter::new(
            &self.export.output_dir,
            &self.export.filename_pattern,
            self.export.format,
        )
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::from_millis(self.rate_limit.delay_ms)
    }

    /// Path of the processed-marker file
    pub fn tracker_path(&self) -> PathBuf {
        self.export.cache_dir.join(&self.export.cache_file)
    }
}
