// src/export.rs
use crate::errors::{Result, SeawatchError};
use crate::models::DetectionResult;
use crate::services::DetectionApi;
use log::{error, info};
use std::path::{Path, PathBuf};

const FALLBACK_FILE_NAME: &str = "download.png";

/// File name for an image URL: its last path segment.
pub fn file_name_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string()
}

/// Downloads `url` into `dir/file_name`.
pub async fn save_image(
    api: &dyn DetectionApi,
    url: &str,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf> {
    let bytes = api.download_image(url).await.map_err(|e| {
        error!("Failed to download {}: {}", url, e);
        match e {
            SeawatchError::Export(_) => e,
            other => SeawatchError::Export(other.to_string()),
        }
    })?;

    let path = dir.join(file_name);
    tokio::fs::write(&path, &bytes).await.map_err(|e| {
        error!("Failed to write {}: {}", path.display(), e);
        SeawatchError::Export(format!("Failed to write {}: {}", path.display(), e))
    })?;

    info!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

/// Saves the processed image of a finished detection as `detection_<id>.png`.
pub async fn save_result(
    api: &dyn DetectionApi,
    result: &DetectionResult,
    dir: &Path,
) -> Result<PathBuf> {
    save_image(api, &result.processed_image_url, dir, &result.export_file_name()).await
}

/// Saves a history image under the name it has in storage.
pub async fn save_history_image(api: &dyn DetectionApi, url: &str, dir: &Path) -> Result<PathBuf> {
    save_image(api, url, dir, &file_name_from_url(url)).await
}
