//! Rasterizes a render surface into an in-memory RGBA image.
//!
//! The engine waits for live imagery to settle, samples the surface with an
//! upper time bound, then paints every layer that survives the exclusion
//! predicate at the requested device-pixel scale.

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::constants::{CHROME_CLASSES, EXPORT_BACKGROUND, EXPORT_IMAGE_TIMEOUT_MS};
use crate::error::CaptureError;

pub mod surface;

pub use surface::{Layer, RenderSurface, Snapshot, StaticSurface, SurfaceRegistry};

/// Returns true for layers that must not appear in the capture
pub type ElementFilter = Arc<dyn Fn(&Layer) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct CaptureOptions {
    /// Output width in pixels; defaults to the region width times `scale`
    pub width: Option<u32>,
    /// Output height in pixels; defaults to the region height times `scale`
    pub height: Option<u32>,
    /// Left edge of the captured window in CSS pixels
    pub x: f64,
    /// Top edge of the captured window in CSS pixels
    pub y: f64,
    /// Device-pixel multiplier
    pub scale: f64,
    pub background: Rgba<u8>,
    pub ignore: Option<ElementFilter>,
    /// Wait applied before sampling a live surface
    pub settle: Duration,
    /// Upper bound on waiting for the surface's imagery
    pub image_timeout: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        CaptureOptions {
            width: None,
            height: None,
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            background: Rgba(EXPORT_BACKGROUND),
            ignore: None,
            settle: Duration::ZERO,
            image_timeout: Duration::from_millis(EXPORT_IMAGE_TIMEOUT_MS),
        }
    }
}

impl fmt::Debug for CaptureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureOptions")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("scale", &self.scale)
            .field("background", &self.background)
            .field("ignore", &self.ignore.is_some())
            .field("settle", &self.settle)
            .field("image_timeout", &self.image_timeout)
            .finish()
    }
}

impl CaptureOptions {
    /// Skips any layer carrying one of the given classes
    pub fn ignore_classes(mut self, classes: &'static [&'static str]) -> Self {
        self.ignore = Some(Arc::new(move |layer: &Layer| {
            classes.iter().any(|class| layer.has_class(class))
        }));
        self
    }

    /// Skips attribution text and zoom controls
    pub fn without_chrome(self) -> Self {
        self.ignore_classes(CHROME_CLASSES)
    }

    fn is_ignored(&self, layer: &Layer) -> bool {
        self.ignore.as_ref().is_some_and(|ignore| ignore(layer))
    }
}

/// Samples `surface` and rasterizes it according to `options`.
pub async fn capture<S: RenderSurface>(
    surface: &S,
    options: &CaptureOptions,
) -> Result<RgbaImage, CaptureError> {
    if surface.is_live() && !options.settle.is_zero() {
        debug!(settle_ms = options.settle.as_millis() as u64, "waiting for tiles to settle");
        tokio::time::sleep(options.settle).await;
    }

    let snapshot = tokio::time::timeout(options.image_timeout, surface.snapshot())
        .await
        .map_err(|_| CaptureError::Timeout(options.image_timeout.as_millis() as u64))??;

    // resizing large layers is CPU-bound
    let options = options.clone();
    tokio::task::spawn_blocking(move || rasterize(&snapshot, &options))
        .await
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?
}

/// Paints a snapshot onto a fresh canvas. Pure; no waiting.
pub fn rasterize(snapshot: &Snapshot, options: &CaptureOptions) -> Result<RgbaImage, CaptureError> {
    let scale = options.scale;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CaptureError::CaptureFailed(format!("invalid capture scale {}", scale)));
    }
    if !(snapshot.width > 0.0 && snapshot.height > 0.0) {
        return Err(CaptureError::CaptureFailed(format!(
            "region has no area ({}x{})",
            snapshot.width, snapshot.height
        )));
    }

    let width = options
        .width
        .unwrap_or_else(|| (snapshot.width * scale).round() as u32);
    let height = options
        .height
        .unwrap_or_else(|| (snapshot.height * scale).round() as u32);
    if width == 0 || height == 0 {
        return Err(CaptureError::CaptureFailed(format!(
            "capture canvas would be empty ({}x{})",
            width, height
        )));
    }

    let mut canvas = RgbaImage::from_pixel(width, height, options.background);

    for layer in &snapshot.layers {
        if options.is_ignored(layer) {
            continue;
        }
        let (lw, lh) = layer.image.dimensions();
        let scaled_w = (lw as f64 * scale).round() as u32;
        let scaled_h = (lh as f64 * scale).round() as u32;
        if scaled_w == 0 || scaled_h == 0 {
            continue;
        }

        let left = ((layer.x - options.x) * scale).round() as i64;
        let top = ((layer.y - options.y) * scale).round() as i64;

        if (scaled_w, scaled_h) == (lw, lh) {
            imageops::overlay(&mut canvas, &layer.image, left, top);
        } else {
            let resized = imageops::resize(&layer.image, scaled_w, scaled_h, FilterType::Triangle);
            imageops::overlay(&mut canvas, &resized, left, top);
        }
    }

    Ok(canvas)
}

/// Encodes an image as PNG bytes
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
