use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the backend origin
pub const API_URL_ENV: &str = "STAYDESK_API_URL";

/// Main configuration structure
///
/// Loaded from `config.toml`, then `STAYDESK_API_URL` wins over the file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Read a config file; a missing file means all defaults
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        toml::from_str(contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Apply the API origin override if one is set and non-empty
    pub fn apply_env(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Write the file, refusing to clobber one that is already there
    /// unless `overwrite` is set. Returns whether anything was written.
    pub fn write_to(&self, path: &Path, overwrite: bool) -> crate::Result<bool> {
        if path.exists() && !overwrite {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(true)
    }

    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("staydesk");

        Ok(config_dir.join("config.toml"))
    }

    /// Where the local store (session, persisted UI state) lives
    pub fn storage_path() -> crate::Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?
            .join("staydesk");

        Ok(data_dir.join("storage.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend origin including the API prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bound on TCP/TLS connection setup. Requests never time out.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of the auth cookie
    #[serde(default = "default_cookie_ttl")]
    pub cookie_ttl_days: i64,
}

fn default_cookie_ttl() -> i64 {
    50
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_ttl_days: default_cookie_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds an unobserved query result is kept around
    #[serde(default = "default_keep_unused")]
    pub keep_unused_secs: u64,
}

fn default_keep_unused() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_secs: default_keep_unused(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistConfig {
    #[serde(default = "default_persist_key")]
    pub key: String,

    #[serde(default = "default_rehydrate_timeout")]
    pub rehydrate_timeout_ms: u64,
}

fn default_persist_key() -> String {
    "persist:root".to_string()
}

fn default_rehydrate_timeout() -> u64 {
    5000
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            key: default_persist_key(),
            rehydrate_timeout_ms: default_rehydrate_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Rows per page in list views
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    10
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}
