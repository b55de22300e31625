use image::{Rgba, RgbaImage};
use std::time::Duration;

use mapflam::capture::{Layer, StaticSurface, SurfaceRegistry};
use mapflam::export::{cover_scale, Exporter};
use mapflam::models::MapFormat;
use mapflam::CaptureError;

fn temp_dir(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("mapflam-{}-{}", tag, uuid::Uuid::new_v4()))
}

fn map_surface(width: u32, height: u32) -> StaticSurface {
    StaticSurface::new(width as f64, height as f64)
        .with_layer(
            Layer::new(RgbaImage::from_pixel(width, height, Rgba([40, 90, 160, 255])))
                .with_class("leaflet-tile-pane"),
        )
        .live(true)
}

#[tokio::test(start_paused = true)]
async fn every_format_has_exact_size_for_any_region() {
    let exporter = Exporter::new(temp_dir("render"));
    for (w, h) in [(800, 400), (375, 812), (1000, 1000), (333, 517)] {
        let surface = map_surface(w, h);
        for format in MapFormat::ALL {
            let image = exporter.render(&surface, format).await.unwrap();
            assert_eq!(image.dimensions(), format.export_size(), "{}x{} -> {}", w, h, format);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn cover_fit_leaves_no_background_visible() {
    let exporter = Exporter::new(temp_dir("cover"));
    let surface = map_surface(800, 400);
    let image = exporter.render(&surface, MapFormat::Portrait).await.unwrap();

    let scale = cover_scale((800.0, 400.0), MapFormat::Portrait.export_size());
    assert_eq!(scale, 4.8);
    for (x, y) in [(0, 0), (1079, 0), (0, 1919), (1079, 1919), (540, 960)] {
        assert_eq!(*image.get_pixel(x, y), Rgba([40, 90, 160, 255]));
    }
}

#[tokio::test(start_paused = true)]
async fn export_writes_png_with_default_name() {
    let dir = temp_dir("export");
    let exporter = Exporter::new(&dir).with_timing(Duration::from_millis(500), Duration::from_secs(5));

    let mut registry = SurfaceRegistry::new();
    registry.register("#map-container", map_surface(640, 360));
    let surface = registry.locate("#map-container").unwrap();

    let path = exporter.export(&surface, MapFormat::Square, None).await.unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("mapflam_square_"), "{}", name);
    assert!(name.ends_with(".png"));

    let written = image::open(&path).unwrap();
    assert_eq!((written.width(), written.height()), (1080, 1080));

    let leftovers: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(start_paused = true)]
async fn failed_delivery_removes_partial_file() {
    let dir = temp_dir("blocked");
    // a non-empty directory where the PNG should land makes the rename fail
    std::fs::create_dir_all(dir.join("out.png")).unwrap();
    std::fs::write(dir.join("out.png").join("keep"), "x").unwrap();

    let exporter = Exporter::new(&dir);
    let result = exporter
        .export(&map_surface(320, 180), MapFormat::Square, Some("out.png"))
        .await;
    assert!(matches!(result, Err(CaptureError::Encode(_))));
    assert!(!dir.join(".out.png.part").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn missing_region_produces_no_file() {
    let dir = temp_dir("missing");
    let registry: SurfaceRegistry<StaticSurface> = SurfaceRegistry::new();

    let err = registry.locate("#map-container").unwrap_err();
    assert!(matches!(err, CaptureError::RegionNotFound(_)));

    let exporter = Exporter::new(&dir);
    let empty = StaticSurface::new(0.0, 0.0);
    let result = exporter.export(&empty, MapFormat::Landscape, Some("out.png")).await;
    assert!(result.is_err());
    assert!(!dir.join("out.png").exists());
}
