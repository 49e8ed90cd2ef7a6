use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

fn default_timeout_secs() -> u64 {
    30
}

fn default_send_accept_header() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// `true` asks for `Accept: application/json`; `false` leaves reqwest's `*/*`.
    #[serde(default = "default_send_accept_header")]
    pub send_accept_header: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: default_timeout_secs(),
            send_accept_header: default_send_accept_header(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 900,
            height: 700,
            min_width: 480,
            min_height: 360,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        let mut config = if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Error parsing {}: {}. Using defaults.", config_path.display(), e);
                    Config::default()
                }),
                Err(e) => {
                    tracing::warn!("Error reading {}: {}. Using defaults.", config_path.display(), e);
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `QUERY_CONSOLE_URL` / `QUERY_CONSOLE_TIMEOUT_SECS` on top of the file values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("QUERY_CONSOLE_URL").filter(|u| !u.trim().is_empty()) {
            self.backend.base_url = url.trim().to_string();
        }

        if let Some(raw) = lookup("QUERY_CONSOLE_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.backend.timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid QUERY_CONSOLE_TIMEOUT_SECS={:?}", raw),
            }
        }
    }

    pub fn get_config_path() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/query-console/config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }
}
