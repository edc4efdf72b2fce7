use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Markets accepted in the `locale` query parameter
    pub allowed_locales: Vec<String>,
    pub default_locale: String,
    /// Oldest wallpaper a client may ask for
    pub max_days_back: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the `analysis/` and `requests/` record directories
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    #[serde(with = "duration_serde::duration")]
    pub timeout: Duration,
    pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub endpoint: String,
    pub model: String,
    /// Also read from `OPENROUTER_API_KEY`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(with = "duration_serde::duration")]
    pub timeout: Duration,
    pub max_tokens: u32,
    /// Images taller than this are downscaled before upload
    pub max_image_height: u32,
    /// When set, raw analyzer responses are dumped here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Request entries expire at the next multiple of this interval
    #[serde(with = "duration_serde::duration")]
    pub expiry_interval: Duration,
    /// Reclaim idle fingerprint locks this often; disabled when unset
    #[serde(
        with = "duration_serde::option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub lock_sweep_interval: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            allowed_locales: DEFAULT_ALLOWED_LOCALES.iter().map(|l| l.to_string()).collect(),
            default_locale: DEFAULT_LOCALE.to_string(),
            max_days_back: DEFAULT_MAX_DAYS_BACK,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_BASE_URL.to_string(),
            timeout: DEFAULT_FEED_TIMEOUT,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ANALYZER_ENDPOINT.to_string(),
            model: DEFAULT_ANALYZER_MODEL.to_string(),
            api_key: None,
            timeout: DEFAULT_ANALYZER_TIMEOUT,
            max_tokens: DEFAULT_ANALYZER_MAX_TOKENS,
            max_image_height: DEFAULT_MAX_IMAGE_HEIGHT,
            debug_dir: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiry_interval: DEFAULT_EXPIRY_INTERVAL,
            lock_sweep_interval: None,
        }
    }
}

impl WebConfig {
    pub fn is_allowed_locale(&self, locale: &str) -> bool {
        self.allowed_locales.iter().any(|l| l == locale)
    }
}

impl Config {
    /// Load configuration from `config_file`, writing a default one if it
    /// does not exist yet. Environment variables override the file.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if !Path::new(config_file).exists() {
            let contents = toml::to_string_pretty(&Self::default())
                .context("Failed to render default config")?;
            std::fs::write(config_file, contents)
                .with_context(|| format!("Failed to write default config file {config_file}"))?;
            info!("Created default config file: {}", config_file);
        }

        let config: Self = Self::figment(config_file)
            .extract()
            .with_context(|| format!("Failed to load configuration from {config_file}"))?;

        config.validate()?;
        Ok(config)
    }

    /// Layered sources: defaults, then the TOML file, then the environment
    pub fn figment(config_file: &str) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&[API_KEY_ENV])
                    .map(|_| "analyzer.api_key".into()),
            )
    }

    /// Log format as configured, readable before the file is loaded and
    /// validated so logging can come up first. Falls back to text.
    pub fn configured_log_format(config_file: &str) -> LogFormat {
        Self::figment(config_file)
            .extract_inner("logging.format")
            .unwrap_or_default()
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.web.port == 0 {
            return Err(AppError::configuration("web.port must be non-zero"));
        }
        if self.web.allowed_locales.is_empty() {
            return Err(AppError::configuration(
                "web.allowed_locales must contain at least one locale",
            ));
        }
        if !self.web.is_allowed_locale(&self.web.default_locale) {
            return Err(AppError::configuration(format!(
                "web.default_locale '{}' is not in web.allowed_locales",
                self.web.default_locale
            )));
        }
        if self.cache.expiry_interval.is_zero() {
            return Err(AppError::configuration("cache.expiry_interval must be non-zero"));
        }
        if self.cache.expiry_interval > MAX_EXPIRY_INTERVAL {
            return Err(AppError::configuration(format!(
                "cache.expiry_interval must be at most {}",
                humantime::format_duration(MAX_EXPIRY_INTERVAL)
            )));
        }
        if self.cache.lock_sweep_interval.is_some_and(|d| d.is_zero()) {
            return Err(AppError::configuration(
                "cache.lock_sweep_interval must be non-zero when set",
            ));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.analyzer
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}
