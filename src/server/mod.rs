use anyhow::{Context, Result};
use axum::{
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod events;
pub mod handlers;
pub mod state;

use crate::constants::PORTS_TO_CHECK;
use crate::utils::open_browser;
use self::state::AppState;
use handlers::{
    boundary_geojson, get_config, get_languages, get_locale, get_map, get_places,
    get_translations, index_html, map_events_stream, post_map_event, script_js, set_locale,
    style_css,
};

// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_html))
        .route("/style.css", get(style_css))
        .route("/script.js", get(script_js))
        .route("/krabi-border.geojson", get(boundary_geojson))
        .route("/api/config", get(get_config))
        .route("/api/places", get(get_places))
        .route("/api/map", get(get_map))
        .route("/api/map/events", axum::routing::post(post_map_event))
        .route("/api/events", get(map_events_stream))
        .route("/api/languages", get(get_languages))
        .route("/api/i18n/:locale", get(get_translations))
        .route("/api/locale", get(get_locale).post(set_locale))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Binds the preferred port, or the first free one of the fallbacks.
async fn bind_listener(preferred: u16) -> Result<(TcpListener, u16)> {
    let mut candidates = vec![preferred];
    candidates.extend(PORTS_TO_CHECK.iter().copied().filter(|&p| p != preferred));

    let mut last_error = None;
    for port in candidates {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                tracing::warn!("Port {} unavailable: {}", port, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(e).context("No port available for the HTTP server"),
        None => anyhow::bail!("No ports configured"),
    }
}

pub async fn start_server(state: AppState, port: u16, auto_open_browser: bool) -> Result<()> {
    let (listener, port) = bind_listener(port).await?;
    let app = create_app(state.clone());
    let url = format!("http://127.0.0.1:{}", port);

    tracing::info!("HTTP server started at {}", url);
    if auto_open_browser {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    state.widget().unmount();
    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
