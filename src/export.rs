use chrono::{NaiveDate, Utc};
use image::{imageops, Rgba, RgbaImage};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use crate::capture::{capture, encode_png, CaptureOptions, RenderSurface};
use crate::constants::{EXPORT_BACKGROUND, EXPORT_IMAGE_TIMEOUT_MS, EXPORT_SETTLE_MS};
use crate::error::CaptureError;
use crate::models::MapFormat;
use crate::utils::PartialFile;

/// Uniform scale that makes `source` cover `target` in both axes
pub fn cover_scale(source: (f64, f64), target: (u32, u32)) -> f64 {
    let scale_x = target.0 as f64 / source.0;
    let scale_y = target.1 as f64 / source.1;
    scale_x.max(scale_y)
}

/// Top-left position that centers `captured` on `target`.
/// Negative on any axis where the capture overflows the target.
pub fn centering_offset(target: (u32, u32), captured: (u32, u32)) -> (i64, i64) {
    let offset = |t: u32, c: u32| ((t as f64 - c as f64) / 2.0).round() as i64;
    (offset(target.0, captured.0), offset(target.1, captured.1))
}

/// Places `captured` centered on a `target`-sized canvas filled with `background`.
/// Overflowing pixels fall outside the canvas and are dropped.
pub fn compose(captured: &RgbaImage, target: (u32, u32), background: Rgba<u8>) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(target.0, target.1, background);
    let (x, y) = centering_offset(target, captured.dimensions());
    imageops::overlay(&mut canvas, captured, x, y);
    canvas
}

/// `mapflam_<format>_<YYYY-MM-DD>.png`
pub fn default_filename(format: MapFormat, date: NaiveDate) -> String {
    format!("mapflam_{}_{}.png", format.as_str(), date.format("%Y-%m-%d"))
}

/// Produces fixed-size PNG exports of a map region
#[derive(Debug, Clone)]
pub struct Exporter {
    download_dir: PathBuf,
    settle: Duration,
    image_timeout: Duration,
    background: Rgba<u8>,
}

impl Exporter {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Exporter {
            download_dir: download_dir.into(),
            settle: Duration::from_millis(EXPORT_SETTLE_MS),
            image_timeout: Duration::from_millis(EXPORT_IMAGE_TIMEOUT_MS),
            background: Rgba(EXPORT_BACKGROUND),
        }
    }

    pub fn with_timing(mut self, settle: Duration, image_timeout: Duration) -> Self {
        self.settle = settle;
        self.image_timeout = image_timeout;
        self
    }

    /// Renders `surface` to exactly `format.export_size()` pixels.
    pub async fn render<S: RenderSurface>(
        &self,
        surface: &S,
        format: MapFormat,
    ) -> Result<RgbaImage, CaptureError> {
        let target = format.export_size();
        let source = surface.measure()?;
        let scale = cover_scale(source, target);

        let options = CaptureOptions {
            scale,
            background: self.background,
            settle: self.settle,
            image_timeout: self.image_timeout,
            ..Default::default()
        };
        let captured = capture(surface, &options).await?;

        let background = self.background;
        tokio::task::spawn_blocking(move || compose(&captured, target, background))
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    /// Renders and writes the PNG into the download directory.
    /// Returns the path of the written file. Nothing is left on disk on failure.
    pub async fn export<S: RenderSurface>(
        &self,
        surface: &S,
        format: MapFormat,
        filename: Option<&str>,
    ) -> Result<PathBuf, CaptureError> {
        let result = self.try_export(surface, format, filename).await;
        if let Err(e) = &result {
            error!(operation = "export", format = %format, error = %e, "Export failed");
        }
        result
    }

    async fn try_export<S: RenderSurface>(
        &self,
        surface: &S,
        format: MapFormat,
        filename: Option<&str>,
    ) -> Result<PathBuf, CaptureError> {
        let image = self.render(surface, format).await?;
        let (width, height) = image.dimensions();
        let png = tokio::task::spawn_blocking(move || encode_png(&image))
            .await
            .map_err(|e| CaptureError::Encode(e.to_string()))??;

        let name = match filename {
            Some(name) => name.to_string(),
            None => default_filename(format, Utc::now().date_naive()),
        };

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let path = self.download_dir.join(&name);
        let partial = PartialFile::new(self.download_dir.join(format!(".{}.part", name)));

        tokio::fs::write(partial.path(), &png).await?;
        tokio::fs::rename(partial.path(), &path).await?;
        partial.keep();

        info!(
            path = %path.display(),
            width,
            height,
            bytes = png.len(),
            "Map exported"
        );
        Ok(path)
    }
}
