// Export and thumbnail sizes
pub const THUMBNAIL_SIZE: u32 = 102;
pub const EXPORT_BACKGROUND: [u8; 4] = [255, 255, 255, 255];

// Capture timing (milliseconds)
pub const EXPORT_SETTLE_MS: u64 = 500;
pub const THUMBNAIL_SETTLE_MS: u64 = 300;
pub const EXPORT_IMAGE_TIMEOUT_MS: u64 = 5000;
pub const THUMBNAIL_IMAGE_TIMEOUT_MS: u64 = 2000;

// Geocoding
pub const NOMINATIM_BASE: &str = "https://nominatim.openstreetmap.org/search";
pub const MAPBOX_BASE: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";
pub const MAX_SEARCH_RESULTS: usize = 5;
pub const SEARCH_CACHE_TTL_MS: i64 = 5 * 60 * 1000;
pub const SEARCH_DEBOUNCE_MS: u64 = 300;
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const USER_AGENT: &str = concat!("MapFlam/", env!("CARGO_PKG_VERSION"));

// Saved maps
pub const STORAGE_KEY: &str = "mapflam_saved";
pub const MAX_COMPOSITIONS: usize = 5;
pub const RETENTION_DAYS: i64 = 30;
pub const STORAGE_SOFT_LIMIT_BYTES: u64 = 5 * 1024 * 1024;

// Lagos, used when no better starting point is known
pub const DEFAULT_CENTER: (f64, f64) = (6.5244, 3.3792);
pub const DEFAULT_ZOOM: f64 = 12.0;

/// Fixed 6-color palette shared by pins, labels, insets and spotlights.
pub const COLOR_PALETTE: [&str; 6] = [
    "#5422b0", // purple (default)
    "#02441F", // dark green
    "#004269", // dark blue
    "#AB0000", // red
    "#000000", // black
    "#FFFFFF", // white
];

/// Element classes stripped from thumbnails (map attribution and zoom controls).
pub const CHROME_CLASSES: &[&str] = &[
    "leaflet-control-attribution",
    "leaflet-control",
    "leaflet-control-zoom",
];

/// Pre-baked PNG data URL returned whenever a thumbnail cannot be captured.
pub const PLACEHOLDER_THUMBNAIL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAEAAAABACAYAAACqaXHeAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";
