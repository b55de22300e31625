use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::time::Duration;
use tracing::{debug, warn};

use crate::capture::{capture, encode_png, CaptureOptions, RenderSurface};
use crate::constants::{PLACEHOLDER_THUMBNAIL, THUMBNAIL_IMAGE_TIMEOUT_MS, THUMBNAIL_SETTLE_MS, THUMBNAIL_SIZE};
use crate::error::CaptureError;
use crate::export::cover_scale;

/// Builds the small square previews shown in the saved-maps list
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    size: u32,
    settle: Duration,
    image_timeout: Duration,
}

impl Default for ThumbnailGenerator {
    fn default() -> Self {
        ThumbnailGenerator {
            size: THUMBNAIL_SIZE,
            settle: Duration::from_millis(THUMBNAIL_SETTLE_MS),
            image_timeout: Duration::from_millis(THUMBNAIL_IMAGE_TIMEOUT_MS),
        }
    }
}

impl ThumbnailGenerator {
    pub fn new(settle: Duration, image_timeout: Duration) -> Self {
        ThumbnailGenerator {
            settle,
            image_timeout,
            ..Default::default()
        }
    }

    /// PNG data URL of the region's center, without map chrome.
    /// Falls back to `PLACEHOLDER_THUMBNAIL` on any failure.
    pub async fn generate<S: RenderSurface>(&self, surface: &S) -> String {
        match self.try_generate(surface).await {
            Ok(data_url) => {
                debug!(bytes = data_url.len(), "Thumbnail captured");
                data_url
            }
            Err(e) => {
                warn!(operation = "thumbnail", error = %e, "Thumbnail capture failed, using placeholder");
                PLACEHOLDER_THUMBNAIL.to_string()
            }
        }
    }

    async fn try_generate<S: RenderSurface>(&self, surface: &S) -> Result<String, CaptureError> {
        let (width, height) = surface.measure()?;
        let scale = cover_scale((width, height), (self.size, self.size));
        let window = self.size as f64 / scale;

        let options = CaptureOptions {
            width: Some(self.size),
            height: Some(self.size),
            x: (width - window) / 2.0,
            y: (height - window) / 2.0,
            scale,
            settle: self.settle,
            image_timeout: self.image_timeout,
            ..Default::default()
        }
        .without_chrome();

        let image = capture(surface, &options).await?;
        let png = encode_png(&image)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}

/// Decodes a `data:image/png;base64,` URL back into PNG bytes
pub fn decode_data_url(data_url: &str) -> Option<Vec<u8>> {
    let payload = data_url.strip_prefix("data:image/png;base64,")?;
    STANDARD.decode(payload).ok()
}
