use image::{DynamicImage, RgbaImage};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crate::error::CaptureError;

/// One painted element of a region: an image placed at a CSS-pixel offset.
#[derive(Debug, Clone)]
pub struct Layer {
    pub classes: Vec<String>,
    pub x: f64,
    pub y: f64,
    pub image: RgbaImage,
}

impl Layer {
    pub fn new(image: RgbaImage) -> Self {
        Layer {
            classes: Vec::new(),
            x: 0.0,
            y: 0.0,
            image,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Everything needed to rasterize a region at any scale
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// On-screen size in CSS pixels
    pub width: f64,
    pub height: f64,
    /// Paint order, bottom first
    pub layers: Vec<Layer>,
}

/// Handle to a rendered region that can be measured and sampled.
///
/// Map surfaces are "live": their tiles load asynchronously, so the capture
/// engine waits for a settle delay before sampling them.
pub trait RenderSurface: Send + Sync {
    /// Current on-screen (width, height) in CSS pixels
    fn measure(&self) -> Result<(f64, f64), CaptureError>;

    fn is_live(&self) -> bool;

    /// Resolves once the region's imagery is available
    fn snapshot(&self) -> impl Future<Output = Result<Snapshot, CaptureError>> + Send;
}

impl<T: RenderSurface> RenderSurface for Arc<T> {
    fn measure(&self) -> Result<(f64, f64), CaptureError> {
        (**self).measure()
    }

    fn is_live(&self) -> bool {
        (**self).is_live()
    }

    fn snapshot(&self) -> impl Future<Output = Result<Snapshot, CaptureError>> + Send {
        (**self).snapshot()
    }
}

/// Surface whose content is already in memory
#[derive(Debug, Clone)]
pub struct StaticSurface {
    width: f64,
    height: f64,
    layers: Vec<Layer>,
    live: bool,
}

impl StaticSurface {
    pub fn new(width: f64, height: f64) -> Self {
        StaticSurface {
            width,
            height,
            layers: Vec::new(),
            live: false,
        }
    }

    /// Region sized to the image, with the image as its base tile layer
    pub fn from_image(image: DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (w, h) = rgba.dimensions();
        StaticSurface::new(w as f64, h as f64).with_layer(Layer::new(rgba).with_class("leaflet-tile-pane"))
    }

    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let image = image::open(path)
            .map_err(|e| CaptureError::CaptureFailed(format!("{}: {}", path.display(), e)))?;
        Ok(StaticSurface::from_image(image))
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }
}

impl RenderSurface for StaticSurface {
    fn measure(&self) -> Result<(f64, f64), CaptureError> {
        Ok((self.width, self.height))
    }

    fn is_live(&self) -> bool {
        self.live
    }

    async fn snapshot(&self) -> Result<Snapshot, CaptureError> {
        Ok(Snapshot {
            width: self.width,
            height: self.height,
            layers: self.layers.clone(),
        })
    }
}

/// Named regions, looked up by selector (e.g. `#map-container`)
pub struct SurfaceRegistry<S> {
    regions: HashMap<String, Arc<S>>,
}

impl<S> Default for SurfaceRegistry<S> {
    fn default() -> Self {
        SurfaceRegistry {
            regions: HashMap::new(),
        }
    }
}

impl<S: RenderSurface> SurfaceRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, selector: impl Into<String>, surface: S) -> Arc<S> {
        let surface = Arc::new(surface);
        self.regions.insert(selector.into(), Arc::clone(&surface));
        surface
    }

    pub fn remove(&mut self, selector: &str) -> Option<Arc<S>> {
        self.regions.remove(selector)
    }

    pub fn locate(&self, selector: &str) -> Result<Arc<S>, CaptureError> {
        self.regions
            .get(selector)
            .cloned()
            .ok_or_else(|| CaptureError::RegionNotFound(selector.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_reports_missing_region() {
        let mut registry = SurfaceRegistry::new();
        registry.register("#map-container", StaticSurface::new(10.0, 10.0));
        assert!(registry.locate("#map-container").is_ok());
        assert!(matches!(
            registry.locate("#inset"),
            Err(CaptureError::RegionNotFound(sel)) if sel == "#inset"
        ));
        registry.remove("#map-container");
        assert!(registry.locate("#map-container").is_err());
    }

    #[test]
    fn from_image_uses_image_size() {
        let surface = StaticSurface::from_image(DynamicImage::new_rgba8(40, 30));
        assert_eq!(surface.measure().unwrap(), (40.0, 30.0));
        assert!(!surface.is_live());
    }
}
