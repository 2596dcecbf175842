// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeawatchError {
    #[error("No file selected")]
    NoFileSelected,

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Cannot {action} while session is {from}")]
    InvalidTransition { from: String, action: &'static str },

    #[error("Detection is already running")]
    AlreadyRunning,

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Detection failed: {0}")]
    Detect(String),

    #[error("History fetch failed: {0}")]
    History(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SeawatchError>;

impl ResponseError for SeawatchError {
    fn error_response(&self) -> HttpResponse {
        match self {
            SeawatchError::NoFileSelected | SeawatchError::UnsupportedImage(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "Invalid input",
                    "message": self.to_string()
                }))
            }
            SeawatchError::InvalidTransition { .. } | SeawatchError::AlreadyRunning => {
                HttpResponse::Conflict().json(serde_json::json!({
                    "error": "Session busy",
                    "message": self.to_string()
                }))
            }
            SeawatchError::Upload(_) | SeawatchError::Detect(_) | SeawatchError::History(_) => {
                HttpResponse::BadGateway().json(serde_json::json!({
                    "error": "Detection service error",
                    "message": self.to_string()
                }))
            }
            SeawatchError::Export(_) | SeawatchError::Serialization(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Data processing error",
                    "message": self.to_string()
                }))
            }
            SeawatchError::Config(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Configuration error",
                "message": self.to_string()
            })),
        }
    }
}
