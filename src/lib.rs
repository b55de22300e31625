//! MapFlam core
//!
//! Turns a pinned map view into fixed-size social-media images and keeps a
//! short rotating history of saved maps.
//!
//! - [`capture`] rasterizes a render surface at any device-pixel scale
//! - [`export`] cover-fits a capture onto a fixed 1080/1920 canvas and writes a PNG
//! - [`thumbnail`] produces the small preview stored with each saved map
//! - [`store`] keeps at most five saved maps for at most thirty days
//! - [`geocoding`] resolves search text to places, with fallback and caching

pub mod capture;
pub mod clock;
pub mod constants;
pub mod error;
pub mod export;
pub mod geocoding;
pub mod models;
pub mod settings;
pub mod store;
pub mod thumbnail;
pub mod utils;

pub use capture::{capture, CaptureOptions, Layer, RenderSurface, StaticSurface, SurfaceRegistry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CaptureError, GeocodeError, ModelError, StorageError};
pub use export::Exporter;
pub use geocoding::{parse_coordinates, GeocodingGateway, LocationResult};
pub use models::{Coordinates, MapFormat, Marker, SavedComposition, ViewState};
pub use settings::Settings;
pub use store::{CompositionStore, FileStorage, KeyValueStorage, MemoryStorage};
pub use thumbnail::ThumbnailGenerator;
