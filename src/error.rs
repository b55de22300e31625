//! Error types for capture, export, geocoding and storage

use thiserror::Error;

/// Errors raised while sampling a render surface or producing an export
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The requested region is not present (detached or never registered)
    #[error("Region not found: {0}")]
    RegionNotFound(String),

    /// Rasterization failed (blocked imagery, empty region, missing canvas)
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Imagery did not finish loading in time
    #[error("Capture timed out after {0}ms")]
    Timeout(u64),

    /// PNG encoding or file delivery failed
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        CaptureError::Encode(err.to_string())
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Encode(err.to_string())
    }
}

/// Errors from a single geocoding provider request
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned HTTP {0}")]
    Status(u16),

    #[error("Malformed provider response: {0}")]
    Decode(String),

    #[error("Invalid provider URL: {0}")]
    Url(String),

    #[error("API key not configured for {0}")]
    MissingApiKey(&'static str),
}

/// Errors from the durable key-value storage
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored collection is corrupted: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("Failed to serialize collection: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A data-model invariant was violated
#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("Latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("Longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    #[error("Opacity {0} is outside [0, 100]")]
    Opacity(u8),

    #[error("Color {0} is not in the palette")]
    Color(String),

    #[error("Zoom {0} must be a non-negative number")]
    Zoom(f64),
}
