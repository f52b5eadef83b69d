use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{Cadence, RefreshPolicy};

pub const DEFAULT_API_URL: &str = "http://localhost:3000/v1";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 10,
            retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub single_stale_secs: u64,
    pub single_interval_secs: u64,
    pub batch_stale_secs: u64,
    pub batch_interval_secs: u64,
    pub catalog_ttl_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            single_stale_secs: 60,
            single_interval_secs: 60,
            batch_stale_secs: 60,
            batch_interval_secs: 120,
            catalog_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seeds the selection when no saved selection exists
    pub default_chains: Vec<String>,
    pub local_currency: String,
    pub api: ApiConfig,
    pub refresh: RefreshConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_chains: Vec::new(),
            local_currency: "CNY".to_string(),
            api: ApiConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl Config {
    pub fn refresh_policy(&self) -> RefreshPolicy {
        let r = &self.refresh;
        RefreshPolicy {
            single: Cadence {
                stale_after: Duration::from_secs(r.single_stale_secs),
                interval: Duration::from_secs(r.single_interval_secs),
            },
            batch: Cadence {
                stale_after: Duration::from_secs(r.batch_stale_secs),
                interval: Duration::from_secs(r.batch_interval_secs),
            },
        }
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh.catalog_ttl_secs)
    }

    fn apply_env(mut self) -> Self {
        if let Some(url) = std::env::var("TALLY_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
        {
            self.api.base_url = url.trim().to_string();
        }
        self
    }
}

pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default().apply_env();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Config::default().apply_env(),
    };
    parse(&content).apply_env()
}

/// Malformed files fall back to defaults
pub fn parse(content: &str) -> Config {
    match toml::from_str::<Config>(content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring malformed config");
            Config::default()
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("TALLY_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("tally").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("tally").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "tally", "tally")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("tally"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("tally"));
    }
    directories::ProjectDirs::from("io", "tally", "tally").map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn state_db_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("state.sqlite3"))
}

pub fn log_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("tally.log"))
}
