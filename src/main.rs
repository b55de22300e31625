use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use mapflam::capture::{StaticSurface, SurfaceRegistry};
use mapflam::geocoding::{self, GeocodingGateway, MapboxProvider, NominatimProvider};
use mapflam::models::{MapFormat, SavedComposition, ViewState};
use mapflam::store::{CompositionStore, FileStorage};
use mapflam::{Clock, Exporter, Settings, SystemClock, ThumbnailGenerator};

const MAP_SELECTOR: &str = "#map-container";

#[derive(Parser)]
#[command(name = "mapflam", version, about = "Pin maps for social posts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Look up a place name or a "lat,lng" pair
    Search { query: String },
    /// Export a rendered map image at a social-media size
    Export {
        /// Rendered map region (PNG)
        #[arg(long)]
        input: PathBuf,
        /// square, 16:9 or 9:16
        #[arg(long, default_value = "square")]
        format: MapFormat,
        /// File name inside the download directory
        #[arg(long)]
        output: Option<String>,
    },
    /// Save a map (state + thumbnail) to the history
    Save {
        /// Rendered map region (PNG) used for the thumbnail
        #[arg(long)]
        input: PathBuf,
        /// View state JSON (markers, format, base map, center, zoom)
        #[arg(long)]
        state: Option<PathBuf>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Manage saved maps
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },
    /// Show the active configuration
    Config {
        /// Write the active values back to the config file
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand)]
enum SavedAction {
    List,
    Rename { id: String, name: String },
    Delete { id: String },
    Clear,
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mapflam=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load settings")?;

    match cli.command {
        Command::Search { query } => search(&settings, &query).await,
        Command::Export {
            input,
            format,
            output,
        } => export(&settings, &input, format, output.as_deref()).await,
        Command::Save { input, state, name } => save(&settings, &input, state.as_deref(), name).await,
        Command::Saved { action } => saved(&settings, action),
        Command::Config { write } => config(&settings, write),
    }
}

async fn search(settings: &Settings, query: &str) -> Result<()> {
    if let Some(coords) = geocoding::parse_coordinates(query) {
        println!("📍 Coordinates: {}", coords);
        return Ok(());
    }

    let client = geocoding::http_client(settings.request_timeout())?;
    let gateway = GeocodingGateway::new(
        NominatimProvider::with_base_url(client.clone(), settings.nominatim_url.clone()),
        MapboxProvider::new(client, settings.mapbox_api_key.clone()),
        Arc::new(SystemClock),
    );

    let results = gateway.search(query).await;
    if results.is_empty() {
        println!(
            "🔍 No matches for \"{}\", map stays at ({})",
            query,
            geocoding::default_location()
        );
    }
    for (rank, place) in results.iter().enumerate() {
        println!(
            "{}. {} ({}) [{}]",
            rank + 1,
            place.display_name,
            place.coordinates(),
            place.provider
        );
    }
    Ok(())
}

fn locate_map(input: &Path) -> Result<Arc<StaticSurface>> {
    let surface = StaticSurface::open(input)?;
    let mut registry = SurfaceRegistry::new();
    registry.register(MAP_SELECTOR, surface);
    Ok(registry.locate(MAP_SELECTOR)?)
}

async fn export(settings: &Settings, input: &Path, format: MapFormat, output: Option<&str>) -> Result<()> {
    let surface = locate_map(input)?;
    let (settle, image_timeout) = settings.export_timing();
    let exporter = Exporter::new(settings.download_path()).with_timing(settle, image_timeout);

    let path = exporter
        .export(&surface, format, output)
        .await
        .context("Export failed")?;
    let (w, h) = format.export_size();
    println!("✅ Exported {}x{} map to {}", w, h, path.display());
    Ok(())
}

async fn save(settings: &Settings, input: &Path, state: Option<&Path>, name: Option<String>) -> Result<()> {
    let state = match state {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read state file {}", path.display()))?;
            let state: ViewState = serde_json::from_str(&json).context("Invalid view state JSON")?;
            state.validate().context("Invalid view state")?;
            state
        }
        None => ViewState::default(),
    };

    let surface = locate_map(input)?;
    let (settle, image_timeout) = settings.thumbnail_timing();
    let thumbnail = ThumbnailGenerator::new(settle, image_timeout).generate(&surface).await;

    let clock = Arc::new(SystemClock);
    let store = open_store(settings, clock.clone());
    let name = name.unwrap_or_else(|| format!("Map {}", store.load_all().len() + 1));
    let composition = SavedComposition::new(name, state, thumbnail, clock.now_millis());
    let id = composition.id.clone();
    store.save(composition);

    if !store.current().iter().any(|m| m.id == id) {
        bail!("Map could not be saved, see log for details");
    }
    println!("💾 Saved map {}", id);
    Ok(())
}

fn saved(settings: &Settings, action: SavedAction) -> Result<()> {
    let store = open_store(settings, Arc::new(SystemClock));
    match action {
        SavedAction::List => {
            let saved = store.load_all();
            if saved.is_empty() {
                println!("No saved maps");
            }
            for map in saved {
                let created = chrono::DateTime::from_timestamp_millis(map.created_at)
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}  {}  {} pin(s)  {}  {}",
                    map.id, created, map.pin_count, map.state.selected_format, map.name
                );
            }
        }
        SavedAction::Rename { id, name } => store.rename(&id, &name),
        SavedAction::Delete { id } => store.delete(&id),
        SavedAction::Clear => store.clear(),
        SavedAction::Info => {
            let info = store.storage_info();
            println!(
                "🗄️  {} map(s), {} of {} bytes used",
                info.count, info.used_bytes, info.max_bytes
            );
        }
    }
    Ok(())
}

fn config(settings: &Settings, write: bool) -> Result<()> {
    if write {
        settings.save()?;
        println!("⚙️  Wrote {}", Settings::config_path().display());
    }
    println!("# {}", Settings::config_path().display());
    print!("{}", settings.to_ini());
    println!("# storage: {}", settings.storage_path().display());
    println!("# downloads: {}", settings.download_path().display());
    Ok(())
}

fn open_store(settings: &Settings, clock: Arc<dyn Clock>) -> CompositionStore<FileStorage> {
    CompositionStore::new(FileStorage::new(settings.storage_path()), clock)
}
