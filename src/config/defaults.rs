/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
use std::time::Duration;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_MAX_DAYS_BACK: u32 = 7;
pub const DEFAULT_ALLOWED_LOCALES: [&str; 15] = [
    "en-US", "en-GB", "en-CA", "en-AU", "en-IN", "ja-JP", "zh-CN", "zh-TW", "de-DE", "fr-FR",
    "es-ES", "it-IT", "pt-BR", "ru-RU", "ko-KR",
];

// Storage defaults
pub const DEFAULT_CACHE_DIR: &str = "./cache_data";

// Wallpaper feed defaults
pub const DEFAULT_FEED_BASE_URL: &str = "https://www.bing.com";
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 16 * 1024 * 1024; // 16MB

// Analyzer defaults
pub const DEFAULT_ANALYZER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_ANALYZER_MODEL: &str = "anthropic/claude-sonnet-4.5";
pub const DEFAULT_ANALYZER_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_ANALYZER_MAX_TOKENS: u32 = 4168;
pub const DEFAULT_MAX_IMAGE_HEIGHT: u32 = 540;

// Cache defaults
pub const DEFAULT_EXPIRY_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Upper bound for `cache.expiry_interval`
pub const MAX_EXPIRY_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

// Environment
pub const ENV_PREFIX: &str = "DAILYHUES_";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
