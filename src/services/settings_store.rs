// src/services/settings_store.rs
//! Persistence of the operator's class selection.
//!
//! Stored as `{"selectedClasses": [...]}`. Reading never fails: a missing or
//! unreadable value yields the default selection, and labels that are no
//! longer known are dropped.

use crate::models::{ClassLabel, Settings};
use log::warn;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings);
}

pub fn decode_settings(raw: &str) -> Settings {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring corrupt settings: {}", e);
            return Settings::default();
        }
    };

    match value.get("selectedClasses").and_then(Value::as_array) {
        Some(classes) => Settings {
            selected_classes: classes
                .iter()
                .filter_map(Value::as_str)
                .filter_map(ClassLabel::from_display_name)
                .collect(),
        },
        None => {
            warn!("Settings without a class list, using defaults");
            Settings::default()
        }
    }
}

pub fn encode_settings(settings: &Settings) -> String {
    let classes: Vec<&str> = settings
        .selected_classes
        .iter()
        .map(|label| label.display_name())
        .collect();
    json!({ "selectedClasses": classes }).to_string()
}

/// Settings kept in a JSON file inside the operator's profile directory.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => decode_settings(&raw),
            Err(_) => Settings::default(),
        }
    }

    fn save(&self, settings: &Settings) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create {}: {}", parent.display(), e);
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, encode_settings(settings)) {
            warn!("Failed to save settings to {}: {}", self.path.display(), e);
        }
    }
}

/// Holds the serialized settings in memory.
#[derive(Default)]
pub struct MemorySettingsStore {
    raw: Mutex<Option<String>>,
}

impl MemorySettingsStore {
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Settings {
        self.raw().map(|raw| decode_settings(&raw)).unwrap_or_default()
    }

    fn save(&self, settings: &Settings) {
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = Some(encode_settings(settings));
    }
}
