use anyhow::{Context, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use krabi_map::boundary::{self, BoundarySource, EmbeddedBoundarySource, FileBoundarySource};
use krabi_map::i18n::Translations;
use krabi_map::marker::SelectHandler;
use krabi_map::places::{Place, PlaceCatalog};
use krabi_map::server::events::{event_channel, publish, MapUpdate};
use krabi_map::server::state::AppState;
use krabi_map::server::start_server;
use krabi_map::settings::Settings;
use krabi_map::widget::{InfoCard, MapWidget, WidgetOptions};

fn load_catalog(settings: &Settings) -> Result<PlaceCatalog> {
    match &settings.places_file {
        Some(path) => PlaceCatalog::load_from_file(Path::new(path))
            .with_context(|| format!("Failed to load places from {}", path)),
        None => Ok(PlaceCatalog::default()),
    }
}

fn boundary_source(settings: &Settings) -> Arc<dyn BoundarySource> {
    match &settings.boundary_file {
        Some(path) => Arc::new(FileBoundarySource::new(path)),
        None => Arc::new(EmbeddedBoundarySource::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "krabi_map=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Krabi Map v{} starting", env!("CARGO_PKG_VERSION"));

    let settings_path = Settings::config_path();
    let settings = Settings::load().context("Failed to load settings")?;
    tracing::info!("Settings: {}", settings_path.display());

    let catalog = load_catalog(&settings)?;
    let translations = Translations::load_embedded().context("Failed to load translations")?;
    let boundary = boundary_source(&settings);
    let event_sender = event_channel();

    let selected_sender = event_sender.clone();
    let on_select: SelectHandler = Arc::new(move |place: &Place| {
        tracing::info!(place = %place.id, "place selected");
        publish(&selected_sender, MapUpdate::Selected(InfoCard::from(place)));
    });

    let options = WidgetOptions {
        cluster: settings.cluster_options(),
        ..WidgetOptions::default()
    };
    let widget = Arc::new(Mutex::new(MapWidget::mount(catalog, options, Some(on_select))));

    let frame_sender = event_sender.clone();
    boundary::spawn_load(widget.clone(), boundary.clone(), move |widget| {
        publish(&frame_sender, MapUpdate::Frame(widget.take_frame()));
    });

    let port = settings.port;
    let auto_open_browser = settings.auto_open_browser;
    let app_state = AppState {
        widget,
        settings: Arc::new(Mutex::new(settings)),
        settings_path: Some(settings_path),
        translations: Arc::new(translations),
        boundary,
        event_sender,
    };

    start_server(app_state, port, auto_open_browser).await
}
