#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_TOKEN_FILE: &str = ".inventory-desk/token";

/// Values set on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub token_file: Option<String>,
    pub json_logs: bool,
}

/// Effective settings after merging flags, the optional TOML file and
/// built-in defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub token_file: PathBuf,
    pub log_level: Option<String>,
    pub json_logs: bool,
}

impl Settings {
    pub fn resolve(overrides: Overrides, file: Option<&TomlConfig>) -> Self {
        let from_file = |f: fn(&TomlConfig) -> Option<&str>| file.and_then(f).map(str::to_string);

        Self {
            base_url: overrides
                .base_url
                .or_else(|| from_file(TomlConfig::base_url))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_seconds: overrides
                .timeout_seconds
                .or_else(|| file.and_then(TomlConfig::timeout_seconds))
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            token_file: overrides
                .token_file
                .or_else(|| from_file(TomlConfig::token_file))
                .unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string())
                .into(),
            log_level: from_file(TomlConfig::log_level),
            json_logs: overrides.json_logs || file.map(TomlConfig::json_logs).unwrap_or(false),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::resolve(Overrides::default(), None)
    }
}

impl ConfigProvider for Settings {
    fn api_base_url(&self) -> &str {
        &self.base_url
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn token_file(&self) -> &Path {
        &self.token_file
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.base_url)?;
        validation::validate_range("api.timeout_seconds", self.timeout_seconds, 1, 600)?;
        validation::validate_path("auth.token_file", &self.token_file.to_string_lossy())?;
        Ok(())
    }
}
