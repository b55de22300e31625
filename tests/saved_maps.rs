use image::{Rgba, RgbaImage};
use std::sync::Arc;

use mapflam::capture::{Layer, StaticSurface};
use mapflam::clock::{Clock, ManualClock};
use mapflam::constants::{PLACEHOLDER_THUMBNAIL, STORAGE_KEY};
use mapflam::models::{Coordinates, Marker, SavedComposition, ViewState};
use mapflam::store::{CompositionStore, FileStorage, KeyValueStorage};
use mapflam::thumbnail::{decode_data_url, ThumbnailGenerator};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const T0: i64 = 1_720_000_000_000;

fn pinned_state(pins: usize) -> ViewState {
    let mut state = ViewState::default();
    for i in 1..=pins {
        state
            .markers
            .push(Marker::new(Coordinates::new(6.5 + i as f64 * 0.01, 3.4).unwrap(), i));
    }
    state
}

#[tokio::test]
async fn save_restore_and_expire_on_disk() {
    let dir = std::env::temp_dir().join(format!("mapflam-saved-{}", uuid::Uuid::new_v4()));
    let clock = Arc::new(ManualClock::new(T0));
    let store = CompositionStore::new(FileStorage::new(&dir), clock.clone());

    let surface = StaticSurface::new(400.0, 300.0)
        .with_layer(Layer::new(RgbaImage::from_pixel(400, 300, Rgba([200, 10, 10, 255]))))
        .with_layer(
            Layer::new(RgbaImage::from_pixel(60, 20, Rgba([0, 0, 0, 255])))
                .at(340.0, 280.0)
                .with_class("leaflet-control-attribution"),
        );
    let thumbnail = ThumbnailGenerator::default().generate(&surface).await;
    assert_ne!(thumbnail, PLACEHOLDER_THUMBNAIL);
    assert!(decode_data_url(&thumbnail).is_some());

    let saved = SavedComposition::new("Lagos walk", pinned_state(3), thumbnail.clone(), clock.now_millis());
    store.save(saved.clone());
    assert_eq!(store.current().len(), 1);

    // a fresh store over the same directory sees the same data
    let reopened = CompositionStore::new(FileStorage::new(&dir), clock.clone());
    let loaded = reopened.load_all();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, saved.id);
    assert_eq!(loaded[0].name, "Lagos walk");
    assert_eq!(loaded[0].created_at, T0);
    assert_eq!(loaded[0].thumbnail, thumbnail);
    assert_eq!(loaded[0].pin_count, 3);
    assert_eq!(loaded[0].state.markers[2].name, "Pin 3");

    clock.advance(31 * DAY_MS);
    assert!(reopened.load_all().is_empty());
    let raw = FileStorage::new(&dir).get(STORAGE_KEY).unwrap();
    assert_eq!(raw.as_deref(), Some("[]"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn reads_collections_written_by_the_browser_build() {
    let raw = r##"[{"id":"0b7c","name":"Map 1","createdAt":1720000000000,"pinCount":1,
        "state":{"markers":[{"id":"m1","lat":6.52,"lng":3.37,"icon":"pin3","size":4,"opacity":80,
        "color":"#AB0000","name":"Pin 1","label":{"text":"Home","size":"large","bgColor":"#FFFFFF",
        "bgOpacity":90,"offsetX":0,"offsetY":-4}}],"selectedFormat":"9:16",
        "selectedBaseMap":"positron-nolabels","mapCenter":{"lat":6.52,"lng":3.37},"mapZoom":13},
        "thumbnail":"data:image/png;base64,AAAA"}]"##;

    let storage = Arc::new(mapflam::MemoryStorage::new());
    storage.set(STORAGE_KEY, raw).unwrap();
    let clock = Arc::new(ManualClock::new(T0 + DAY_MS));
    let store = CompositionStore::new(Arc::clone(&storage), clock);

    let loaded = store.load_all();
    assert_eq!(loaded.len(), 1);
    let marker = &loaded[0].state.markers[0];
    assert_eq!(marker.size.level(), 4);
    assert_eq!(marker.label.as_ref().unwrap().offset_y, -4);
    assert!(loaded[0].state.validate().is_ok());

    store.rename("0b7c", "Renamed");
    assert_eq!(store.current()[0].name, "Renamed");
}
