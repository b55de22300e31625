use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{COLOR_PALETTE, DEFAULT_CENTER};
use crate::error::ModelError;

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self, ModelError> {
        let coords = Coordinates { lat, lng };
        coords.validate()?;
        Ok(coords)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(ModelError::Latitude(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(ModelError::Longitude(self.lng));
        }
        Ok(())
    }
}

impl Default for Coordinates {
    fn default() -> Self {
        Coordinates {
            lat: DEFAULT_CENTER.0,
            lng: DEFAULT_CENTER.1,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Returns true when `color` is one of the six palette entries (case-insensitive hex).
pub fn is_palette_color(color: &str) -> bool {
    COLOR_PALETTE.iter().any(|c| c.eq_ignore_ascii_case(color))
}

fn check_color(color: &str) -> Result<(), ModelError> {
    if is_palette_color(color) {
        Ok(())
    } else {
        Err(ModelError::Color(color.to_string()))
    }
}

fn check_opacity(opacity: u8) -> Result<(), ModelError> {
    if opacity <= 100 {
        Ok(())
    } else {
        Err(ModelError::Opacity(opacity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
    #[default]
    Pin1,
    Pin2,
    Pin3,
    Pin4,
    Pin5,
    Pin6,
}

impl IconType {
    /// SVG asset drawn for this icon
    pub fn file_name(&self) -> &'static str {
        match self {
            IconType::Pin1 => "icon-pin1-fill.svg",
            IconType::Pin2 => "icon-pin1.svg",
            IconType::Pin3 => "icon-pin2-fill.svg",
            IconType::Pin4 => "icon-pin2.svg",
            IconType::Pin5 => "icon-pin3-fill.svg",
            IconType::Pin6 => "icon-pin3.svg",
        }
    }
}

/// Pin size level, 1 (small) to 5 (large). Serialized as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PinSize(u8);

impl PinSize {
    pub const MIN: PinSize = PinSize(1);
    pub const DEFAULT: PinSize = PinSize(3);
    pub const MAX: PinSize = PinSize(5);

    pub fn level(&self) -> u8 {
        self.0
    }

    /// CSS scale factor applied to the 24px base icon
    pub fn scale(&self) -> f64 {
        match self.0 {
            1 => 1.2,
            2 => 1.5,
            3 => 2.0,
            4 => 2.5,
            _ => 3.0,
        }
    }
}

impl Default for PinSize {
    fn default() -> Self {
        PinSize::DEFAULT
    }
}

impl TryFrom<u8> for PinSize {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        if (1..=5).contains(&level) {
            Ok(PinSize(level))
        } else {
            Err(format!("pin size must be between 1 and 5, got {}", level))
        }
    }
}

impl From<PinSize> for u8 {
    fn from(size: PinSize) -> u8 {
        size.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub text: String,
    pub size: LabelSize,
    pub bg_color: String,
    pub bg_opacity: u8,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Label {
    pub fn validate(&self) -> Result<(), ModelError> {
        check_color(&self.bg_color)?;
        check_opacity(self.bg_opacity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub icon: IconType,
    pub size: PinSize,
    pub opacity: u8,
    pub color: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
}

impl Marker {
    /// New pin with default styling, named after its 1-based position.
    pub fn new(position: Coordinates, index: usize) -> Self {
        Marker {
            id: uuid::Uuid::new_v4().to_string(),
            lat: position.lat,
            lng: position.lng,
            icon: IconType::default(),
            size: PinSize::default(),
            opacity: 100,
            color: COLOR_PALETTE[0].to_string(),
            name: format!("Pin {}", index),
            label: None,
        }
    }

    pub fn position(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.position().validate()?;
        check_opacity(self.opacity)?;
        check_color(&self.color)?;
        if let Some(label) = &self.label {
            label.validate()?;
        }
        Ok(())
    }
}

/// Output aspect format. Each maps to a fixed export size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MapFormat {
    #[default]
    #[serde(rename = "square")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl MapFormat {
    pub const ALL: [MapFormat; 3] = [MapFormat::Square, MapFormat::Landscape, MapFormat::Portrait];

    pub fn as_str(&self) -> &'static str {
        match self {
            MapFormat::Square => "square",
            MapFormat::Landscape => "16:9",
            MapFormat::Portrait => "9:16",
        }
    }

    /// (width, height) of the exported PNG
    pub fn export_size(&self) -> (u32, u32) {
        match self {
            MapFormat::Square => (1080, 1080),
            MapFormat::Landscape => (1920, 1080),
            MapFormat::Portrait => (1080, 1920),
        }
    }
}

impl fmt::Display for MapFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "square" => Ok(MapFormat::Square),
            "16:9" => Ok(MapFormat::Landscape),
            "9:16" => Ok(MapFormat::Portrait),
            other => Err(format!(
                "unknown format '{}', expected one of: square, 16:9, 9:16",
                other
            )),
        }
    }
}

/// Tile provider entry: URL template plus attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileStyle {
    pub name: &'static str,
    pub url: &'static str,
    pub attribution: &'static str,
}

impl TileStyle {
    /// Expands `{s}`, `{z}`, `{x}`, `{y}` and `{r}` in the URL template.
    pub fn tile_url(&self, subdomain: char, z: u32, x: u32, y: u32, retina: bool) -> String {
        self.url
            .replace("{s}", &subdomain.to_string())
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
            .replace("{r}", if retina { "@2x" } else { "" })
    }
}

const CARTO_ATTRIBUTION: &str = "© OpenStreetMap contributors, © CartoDB";
const STAMEN_ATTRIBUTION: &str = "© OpenStreetMap contributors, © Stamen Design";

const POSITRON_NOLABELS: TileStyle = TileStyle {
    name: "Light",
    url: "https://{s}.basemaps.cartocdn.com/light_nolabels/{z}/{x}/{y}{r}.png",
    attribution: CARTO_ATTRIBUTION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaseMap {
    #[default]
    Positron,
    #[serde(rename = "positron-nolabels")]
    PositronNoLabels,
    Toner,
}

impl BaseMap {
    pub fn tiles(&self) -> TileStyle {
        match self {
            BaseMap::Positron => TileStyle {
                name: "Positron",
                url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
                attribution: CARTO_ATTRIBUTION,
            },
            BaseMap::PositronNoLabels => POSITRON_NOLABELS,
            BaseMap::Toner => TileStyle {
                name: "Toner",
                url: "https://tile.openstreetmap.de/tiles/osmde/{z}/{x}/{y}.png",
                attribution: STAMEN_ATTRIBUTION,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsetPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsetSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl InsetSize {
    /// Edge length of the square inset in CSS pixels
    pub fn pixels(&self) -> u32 {
        match self {
            InsetSize::Small => 100,
            InsetSize::Medium => 140,
            InsetSize::Large => 180,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InsetBaseMap {
    #[default]
    #[serde(rename = "positron-nolabels")]
    PositronNoLabels,
    #[serde(rename = "watercolor")]
    Watercolor,
    #[serde(rename = "voyager")]
    Voyager,
}

impl InsetBaseMap {
    pub fn tiles(&self) -> TileStyle {
        match self {
            InsetBaseMap::PositronNoLabels => POSITRON_NOLABELS,
            InsetBaseMap::Watercolor => TileStyle {
                name: "Watercolor",
                url: "https://tiles.stadiamaps.com/tiles/stamen_watercolor/{z}/{x}/{y}.jpg",
                attribution: STAMEN_ATTRIBUTION,
            },
            InsetBaseMap::Voyager => TileStyle {
                name: "Voyager",
                url: "https://{s}.basemaps.cartocdn.com/rastertiles/voyager_nolabels/{z}/{x}/{y}{r}.png",
                attribution: CARTO_ATTRIBUTION,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spotlight {
    pub enabled: bool,
    pub lat: f64,
    pub lng: f64,
    pub color: String,
    pub size: PinSize,
    pub opacity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsetConfig {
    pub enabled: bool,
    pub position: InsetPosition,
    pub size: InsetSize,
    pub border_color: String,
    pub base_map: InsetBaseMap,
    pub center: Coordinates,
    pub zoom: f64,
    pub spotlight: Spotlight,
}

impl Default for InsetConfig {
    fn default() -> Self {
        let center = Coordinates::default();
        InsetConfig {
            enabled: false,
            position: InsetPosition::default(),
            size: InsetSize::default(),
            border_color: COLOR_PALETTE[0].to_string(),
            base_map: InsetBaseMap::default(),
            center,
            zoom: 5.0,
            spotlight: Spotlight {
                enabled: false,
                lat: center.lat,
                lng: center.lng,
                color: COLOR_PALETTE[0].to_string(),
                size: PinSize::default(),
                opacity: 100,
            },
        }
    }
}

impl InsetConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        check_color(&self.border_color)?;
        self.center.validate()?;
        check_zoom(self.zoom)?;
        let spot = &self.spotlight;
        Coordinates {
            lat: spot.lat,
            lng: spot.lng,
        }
        .validate()?;
        check_color(&spot.color)?;
        check_opacity(spot.opacity)
    }
}

fn check_zoom(zoom: f64) -> Result<(), ModelError> {
    if zoom.is_finite() && zoom >= 0.0 {
        Ok(())
    } else {
        Err(ModelError::Zoom(zoom))
    }
}

/// Everything needed to restore an editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub markers: Vec<Marker>,
    pub selected_format: MapFormat,
    pub selected_base_map: BaseMap,
    pub map_center: Coordinates,
    pub map_zoom: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inset: Option<InsetConfig>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            markers: Vec::new(),
            selected_format: MapFormat::default(),
            selected_base_map: BaseMap::default(),
            map_center: Coordinates::default(),
            map_zoom: crate::constants::DEFAULT_ZOOM,
            inset: None,
        }
    }
}

impl ViewState {
    pub fn validate(&self) -> Result<(), ModelError> {
        self.map_center.validate()?;
        check_zoom(self.map_zoom)?;
        for marker in &self.markers {
            marker.validate()?;
        }
        if let Some(inset) = &self.inset {
            inset.validate()?;
        }
        Ok(())
    }
}

/// One saved map: view state, pins and a preview image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedComposition {
    pub id: String,
    pub name: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub pin_count: usize,
    pub state: ViewState,
    /// `data:image/png;base64,...`
    pub thumbnail: String,
}

impl SavedComposition {
    pub fn new(name: impl Into<String>, state: ViewState, thumbnail: String, now_millis: i64) -> Self {
        SavedComposition {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now_millis,
            pin_count: state.markers.len(),
            state,
            thumbnail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_sizes_match_formats() {
        assert_eq!(MapFormat::Square.export_size(), (1080, 1080));
        assert_eq!(MapFormat::Landscape.export_size(), (1920, 1080));
        assert_eq!(MapFormat::Portrait.export_size(), (1080, 1920));
    }

    #[test]
    fn format_parses_ui_spelling() {
        for format in MapFormat::ALL {
            assert_eq!(format.as_str().parse::<MapFormat>(), Ok(format));
        }
        assert!("4:3".parse::<MapFormat>().is_err());
        assert_eq!(serde_json::to_string(&MapFormat::Landscape).unwrap(), "\"16:9\"");
    }

    #[test]
    fn pin_size_rejects_out_of_range() {
        assert!(PinSize::try_from(0).is_err());
        assert!(PinSize::try_from(6).is_err());
        assert_eq!(PinSize::try_from(4).unwrap().scale(), 2.5);
        assert!(serde_json::from_str::<PinSize>("9").is_err());
    }

    #[test]
    fn marker_validation() {
        let mut marker = Marker::new(Coordinates::default(), 1);
        assert_eq!(marker.name, "Pin 1");
        assert!(marker.validate().is_ok());

        marker.color = "#5422B0".to_string();
        assert!(marker.validate().is_ok());

        marker.color = "#123456".to_string();
        assert_eq!(marker.validate(), Err(ModelError::Color("#123456".to_string())));

        marker.color = COLOR_PALETTE[3].to_string();
        marker.lat = 91.0;
        assert_eq!(marker.validate(), Err(ModelError::Latitude(91.0)));
    }

    #[test]
    fn tile_url_expands_tokens() {
        let url = BaseMap::Positron.tiles().tile_url('a', 12, 2048, 1361, true);
        assert_eq!(url, "https://a.basemaps.cartocdn.com/light_all/12/2048/1361@2x.png");

        let url = BaseMap::Toner.tiles().tile_url('b', 3, 1, 2, true);
        assert_eq!(url, "https://tile.openstreetmap.de/tiles/osmde/3/1/2.png");
    }

    #[test]
    fn saved_composition_uses_browser_field_names() {
        let mut state = ViewState::default();
        state.markers.push(Marker::new(Coordinates::default(), 1));
        let saved = SavedComposition::new("Map 1", state, "data:image/png;base64,".into(), 1_700_000_000_000);
        assert_eq!(saved.pin_count, 1);

        let json = serde_json::to_value(&saved).unwrap();
        assert_eq!(json["createdAt"], 1_700_000_000_000i64);
        assert_eq!(json["pinCount"], 1);
        assert_eq!(json["state"]["selectedFormat"], "square");
        assert_eq!(json["state"]["selectedBaseMap"], "positron");
        assert_eq!(json["state"]["mapCenter"]["lat"], 6.5244);
        assert!(json["state"].get("inset").is_none());
    }

    #[test]
    fn inset_defaults_are_valid() {
        let inset = InsetConfig::default();
        assert!(inset.validate().is_ok());
        assert_eq!(inset.size.pixels(), 140);
        let json = serde_json::to_value(&inset).unwrap();
        assert_eq!(json["position"], "top-right");
        assert_eq!(json["baseMap"], "positron-nolabels");
    }
}
