// src/services/image_validator.rs
use crate::errors::SeawatchError;
use image::ImageFormat;

/// Checks that the bytes hold a JPEG or PNG image and returns its MIME type.
pub fn sniff_image(data: &[u8]) -> Result<&'static str, SeawatchError> {
    if data.is_empty() {
        return Err(SeawatchError::UnsupportedImage("file is empty".to_string()));
    }

    let format = image::guess_format(data)
        .map_err(|e| SeawatchError::UnsupportedImage(format!("Unknown image format: {}", e)))?;

    match format {
        ImageFormat::Png => Ok("image/png"),
        ImageFormat::Jpeg => Ok("image/jpeg"),
        other => Err(SeawatchError::UnsupportedImage(format!(
            "{:?} images are not accepted, use JPEG or PNG",
            other
        ))),
    }
}
