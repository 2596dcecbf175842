// src/config.rs
use crate::errors::{Result, SeawatchError};
use crate::history::{DEFAULT_PAGE_SIZE, FetchOrdering};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub storage_url: String,
    pub page_size: usize,
    pub bind_addr: String,
    pub settings_path: PathBuf,
    pub export_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub fetch_ordering: FetchOrdering,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            storage_url: "http://localhost:9000".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            bind_addr: "127.0.0.1:8080".to_string(),
            settings_path: default_settings_path(),
            export_dir: PathBuf::from("."),
            static_dir: None,
            fetch_ordering: FetchOrdering::LastResponseWins,
        }
    }
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("seawatch")
        .join("settings.json")
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any variable source, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("SEAWATCH_API_URL") {
            config.api_url = url;
        }
        if let Some(url) = lookup("SEAWATCH_STORAGE_URL") {
            config.storage_url = url;
        }
        if let Some(size) = lookup("SEAWATCH_PAGE_SIZE") {
            config.page_size = size
                .parse()
                .ok()
                .filter(|n: &usize| *n > 0)
                .ok_or_else(|| SeawatchError::Config(format!("invalid page size: {}", size)))?;
        }
        if let Some(addr) = lookup("SEAWATCH_BIND") {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("SEAWATCH_SETTINGS_PATH") {
            config.settings_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("SEAWATCH_EXPORT_DIR") {
            config.export_dir = PathBuf::from(dir);
        }
        config.static_dir = lookup("SEAWATCH_STATIC_DIR").map(PathBuf::from);
        if let Some(flag) = lookup("SEAWATCH_FENCE_HISTORY") {
            config.fetch_ordering = match flag.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => FetchOrdering::LatestRequestWins,
                "0" | "false" | "no" => FetchOrdering::LastResponseWins,
                _ => {
                    return Err(SeawatchError::Config(format!(
                        "invalid SEAWATCH_FENCE_HISTORY: {}",
                        flag
                    )));
                }
            };
        }

        Ok(config)
    }
}
