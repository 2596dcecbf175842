// src/services/detection_api.rs
use crate::errors::SeawatchError;
use crate::models::*;
use crate::query::QueryParams;
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::Client;
use reqwest::multipart::{Form, Part};

/// An image picked by the operator, held in memory until it is uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Remote calls the client makes against the detection backend.
#[async_trait]
pub trait DetectionApi: Send + Sync {
    /// Uploads raw image bytes and returns the storage key.
    async fn upload_image(&self, file: &ImageFile) -> Result<String, SeawatchError>;

    async fn detect_image(
        &self,
        image_key: &str,
        classes: &[ClassLabel],
    ) -> Result<DetectResponse, SeawatchError>;

    async fn list_detections(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<DetectionRecord>, SeawatchError>;

    async fn download_image(&self, url: &str) -> Result<Bytes, SeawatchError>;
}

/// Builds image URLs from storage keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLocator {
    storage_url: String,
}

impl ImageLocator {
    pub fn new(storage_url: impl Into<String>) -> Self {
        Self {
            storage_url: storage_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, key: &str) -> String {
        format!("{}/detections/{}", self.storage_url, key)
    }
}

pub struct HttpDetectionApi {
    base_url: String,
    client: Client,
}

impl HttpDetectionApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl DetectionApi for HttpDetectionApi {
    async fn upload_image(&self, file: &ImageFile) -> Result<String, SeawatchError> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| SeawatchError::Upload(format!("Invalid content type: {}", e)))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload-image"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| SeawatchError::Upload(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SeawatchError::Upload(format!("Upload error: {}", error_text)));
        }

        let result: UploadResponse = response
            .json()
            .await
            .map_err(|e| SeawatchError::Upload(format!("Failed to parse upload response: {}", e)))?;

        debug!("Uploaded {} as {}", file.name, result.image_key);
        Ok(result.image_key)
    }

    async fn detect_image(
        &self,
        image_key: &str,
        classes: &[ClassLabel],
    ) -> Result<DetectResponse, SeawatchError> {
        let response = self
            .client
            .post(self.endpoint("detect-image"))
            .json(&DetectRequest {
                image_key,
                classes: classes.to_vec(),
            })
            .send()
            .await
            .map_err(|e| SeawatchError::Detect(format!("Detect request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SeawatchError::Detect(format!("Detect error: {}", error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| SeawatchError::Detect(format!("Failed to parse detect response: {}", e)))
    }

    async fn list_detections(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<DetectionRecord>, SeawatchError> {
        let response = self
            .client
            .get(self.endpoint("detections"))
            .query(params)
            .send()
            .await
            .map_err(|e| SeawatchError::History(format!("History request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SeawatchError::History(format!("History error: {}", error_text)));
        }

        let result: HistoryResponse = response
            .json()
            .await
            .map_err(|e| SeawatchError::History(format!("Failed to parse history: {}", e)))?;

        Ok(result.detections)
    }

    async fn download_image(&self, url: &str) -> Result<Bytes, SeawatchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SeawatchError::Export(format!("Download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SeawatchError::Export(format!(
                "Download failed with status {}",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| SeawatchError::Export(format!("Failed to read image: {}", e)))
    }
}
