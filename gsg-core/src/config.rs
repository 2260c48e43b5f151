use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::view::{SortDirection, SortField, TieBreak};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub streams: StreamsConfig,
    pub view: ViewConfig,
    pub layout: LayoutConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub dev_base_url: String,
    /// Read the dev deployment instead of prod
    pub use_dev_api: bool,
    /// Event service base URL; empty means "same host as the feed"
    pub event_base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.goldenshrimpguild.com".to_string(),
            dev_base_url: "https://dev-api.goldenshrimpguild.com".to_string(),
            use_dev_api: false,
            event_base_url: String::new(),
            request_timeout_seconds: 15,
        }
    }
}

impl ApiConfig {
    /// Base URL of whichever deployment is selected
    #[must_use]
    pub fn active_base_url(&self) -> &str {
        if self.use_dev_api {
            &self.dev_base_url
        } else {
            &self.base_url
        }
    }

    /// Flip between dev and prod, returning whether dev is now selected
    pub fn toggle_dev_api(&mut self) -> bool {
        self.use_dev_api = !self.use_dev_api;
        self.use_dev_api
    }

    #[must_use]
    pub fn active_event_base_url(&self) -> &str {
        if self.event_base_url.is_empty() {
            self.active_base_url()
        } else {
            &self.event_base_url
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub stream_interval_seconds: u64,
    /// Lower bound between two event schedule fetches
    pub event_min_interval_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            stream_interval_seconds: 60,
            event_min_interval_seconds: 600,
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub const fn stream_interval(&self) -> Duration {
        Duration::from_secs(self.stream_interval_seconds)
    }

    #[must_use]
    pub const fn event_min_interval(&self) -> Duration {
        Duration::from_secs(self.event_min_interval_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamsConfig {
    pub house_channel_login: String,
    pub hide_house_channel: bool,
    pub restrict_to_category: bool,
    pub restricted_category_id: String,
    pub restricted_category_name: String,
    pub use_current_event_data: bool,
    /// Reconcile from `test_streams` instead of calling the network
    pub test_mode: bool,
    pub test_streams: Vec<String>,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            house_channel_login: "goldenshrimpguild".to_string(),
            hide_house_channel: true,
            restrict_to_category: false,
            restricted_category_id: "26936".to_string(),
            restricted_category_name: "Music".to_string(),
            use_current_event_data: true,
            test_mode: false,
            test_streams: [
                "litui",
                "pulsaroctopus",
                "actitect",
                "jaynothin",
                "betaunits",
                "youropponent0",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub include_words: Vec<String>,
    pub exclude_words: Vec<String>,
    pub tie_break: TieBreak,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Height of the per-tile chrome (name bar) outside the video area
    pub decoration_height: f64,
    pub hide_decor: bool,
    pub centre_frames: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1920.0,
            viewport_height: 1080.0,
            decoration_height: 32.0,
            hide_decor: false,
            centre_frames: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // GSG_STREAMS__HOUSE_CHANNEL_LOGIN, GSG_VIEW__INCLUDE_WORDS=jazz,lofi, ...
        builder = builder.add_source(
            Environment::with_prefix("GSG")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("streams.test_streams")
                .with_list_parse_key("view.include_words")
                .with_list_parse_key("view.exclude_words")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Check for misconfigurations, collecting every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.api.base_url.trim().is_empty() {
            errors.push("api.base_url must not be empty".to_string());
        }
        if self.api.use_dev_api && self.api.dev_base_url.trim().is_empty() {
            errors.push("api.dev_base_url must be set when api.use_dev_api is enabled".to_string());
        }
        if self.api.request_timeout_seconds == 0 {
            errors.push("api.request_timeout_seconds must be greater than 0".to_string());
        }
        if self.polling.stream_interval_seconds == 0 {
            errors.push("polling.stream_interval_seconds must be greater than 0".to_string());
        }
        if self.streams.house_channel_login.trim().is_empty() {
            errors.push("streams.house_channel_login must not be empty".to_string());
        }
        if self.streams.restrict_to_category && self.streams.restricted_category_id.is_empty() {
            errors.push(
                "streams.restricted_category_id must be set when restrict_to_category is enabled"
                    .to_string(),
            );
        }
        if self.layout.decoration_height < 0.0 {
            errors.push("layout.decoration_height must not be negative".to_string());
        }
        if self.layout.viewport_width < 0.0 || self.layout.viewport_height < 0.0 {
            errors.push("layout viewport dimensions must not be negative".to_string());
        }
        if crate::logging::parse_log_level(&self.logging.level).is_err() {
            errors.push(format!("logging.level '{}' is not a valid level", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
