// src/lib.rs
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub mod config;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod history;
pub mod models;
pub mod pagination;
pub mod query;
pub mod services;
pub mod session;

use crate::config::Config;
use crate::history::HistoryController;
use crate::services::{DetectionApi, ImageLocator, SettingsStore};
use crate::session::DetectionSession;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn DetectionApi>,
    pub settings: Arc<dyn SettingsStore>,
    pub session: Arc<Mutex<DetectionSession>>,
    pub history: Arc<Mutex<HistoryController>>,
    pub export_dir: PathBuf,
}

impl AppState {
    pub fn new(
        config: &Config,
        api: Arc<dyn DetectionApi>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            api,
            settings,
            session: Arc::new(Mutex::new(DetectionSession::new(ImageLocator::new(
                config.storage_url.clone(),
            )))),
            history: Arc::new(Mutex::new(HistoryController::new(
                config.page_size,
                config.fetch_ordering,
            ))),
            export_dir: config.export_dir.clone(),
        }
    }
}

/// Locks shared state. A panic while holding the lock does not make the
/// state unusable, so poisoning is ignored.
pub fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
