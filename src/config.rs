//! Process configuration loaded from environment variables.

use std::path::PathBuf;

use serde::Deserialize;
use strum::{Display, EnumString};

/// Environment variable prefix for every configuration field.
pub const ENV_PREFIX: &str = "CONNECTLIB_";

/// Where the route definition file lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceType {
    /// Application data directory (`src/main/data`).
    #[default]
    Main,
    /// Test resources directory (`src/test/resources`).
    Test,
    /// Directory given by `resource_dir`.
    Custom,
}

impl ResourceType {
    /// Default directory for this resource type, if it has one.
    pub fn default_dir(&self) -> Option<&'static str> {
        match self {
            ResourceType::Main => Some("src/main/data"),
            ResourceType::Test => Some("src/test/resources"),
            ResourceType::Custom => None,
        }
    }
}

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Route File ===
    /// Which resource directory holds `infos.yml`.
    #[serde(default)]
    pub resource_type: ResourceType,

    /// Explicit directory for `infos.yml` (wins over `resource_type`).
    #[serde(default)]
    pub resource_dir: Option<PathBuf>,

    // === Dispatch ===
    /// Base URL applied to every dispatch instead of the file's `urlPath`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Total request timeout in milliseconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_ms: u64,

    /// Connection establishment timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // === Dashboard ===
    /// Port of the status dashboard.
    #[serde(default = "default_dashboard_port")]
    pub dashboard_port: u16,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_http_timeout() -> u64 {
    30_000
}

fn default_connect_timeout() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    "ConnectLib/1.0".to_string()
}

fn default_dashboard_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resource_type: ResourceType::default(),
            resource_dir: None,
            base_url: None,
            http_timeout_ms: default_http_timeout(),
            connect_timeout_ms: default_connect_timeout(),
            user_agent: default_user_agent(),
            dashboard_port: default_dashboard_port(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX).from_env()
    }

    /// Configuration rooted at an explicit directory, everything else default.
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_type: ResourceType::Custom,
            resource_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.http_timeout_ms == 0 {
            return Err("HTTP_TIMEOUT_MS must be greater than 0".to_string());
        }

        if self.connect_timeout_ms == 0 {
            return Err("CONNECT_TIMEOUT_MS must be greater than 0".to_string());
        }

        if self.resource_type == ResourceType::Custom && self.resource_dir.is_none() {
            return Err("RESOURCE_DIR is required when RESOURCE_TYPE is custom".to_string());
        }

        if let Some(base) = self.base_url_override() {
            url::Url::parse(base).map_err(|e| format!("BASE_URL is not a valid URL: {}", e))?;
        }

        Ok(())
    }

    /// Directory that holds the route definition file.
    pub fn resource_dir(&self) -> PathBuf {
        match (&self.resource_dir, self.resource_type.default_dir()) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => PathBuf::from(dir),
            (None, None) => PathBuf::from("."),
        }
    }

    /// Non-empty base URL override, if configured.
    pub fn base_url_override(&self) -> Option<&str> {
        self.base_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}
