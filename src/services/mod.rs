// src/services/mod.rs
pub mod detection_api;
pub mod image_validator;
pub mod settings_store;

pub use detection_api::{DetectionApi, HttpDetectionApi, ImageFile, ImageLocator};
pub use image_validator::sniff_image;
pub use settings_store::{FileSettingsStore, MemorySettingsStore, SettingsStore};
