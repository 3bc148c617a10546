use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event as SseEvent, KeepAlive},
        Html, IntoResponse, Json, Response, Sse,
    },
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use crate::assets::{mime_type, Asset};
use crate::boundary::BoundaryStyle;
use crate::constants::{
    BOUNDARY_ASSET, HEARTBEAT_SECS, TILE_ATTRIBUTION, TILE_MAX_ZOOM, TILE_URL_TEMPLATE,
};
use crate::i18n::{self, Language, LANGUAGES};
use crate::places::{Category, CategoryFilter, Place};
use crate::widget::{MapEvent, MapFrame};

use super::events::{publish, MapUpdate};
use super::state::AppState;

fn embedded_file(path: &str) -> Response {
    match Asset::get(path) {
        Some(file) => (
            [(header::CONTENT_TYPE, mime_type(path))],
            file.data.into_owned(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Map page rendered in the visitor's locale; the script takes over from there.
pub async fn index_html(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(file) = Asset::get("index.html") else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let template = String::from_utf8_lossy(&file.data);

    let locale = request_locale(&state, &headers);
    let count = state.widget().catalog().len().to_string();
    Html(i18n::render_page(
        &template,
        &state.translations,
        locale,
        &[("count", count.as_str())],
    ))
    .into_response()
}

pub async fn style_css() -> Response {
    embedded_file("style.css")
}

pub async fn script_js() -> Response {
    embedded_file("script.js")
}

/// Border GeoJSON for the browser overlay, from the same source the widget uses.
pub async fn boundary_geojson(State(state): State<AppState>) -> Response {
    let source = state.boundary.clone();
    let response = match tokio::task::spawn_blocking(move || source.fetch()).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::warn!("Boundary source error: {:#}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(e) => {
            tracing::warn!("Boundary task failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !response.is_success() {
        return StatusCode::from_u16(response.status)
            .unwrap_or(StatusCode::NOT_FOUND)
            .into_response();
    }
    ([(header::CONTENT_TYPE, mime_type(BOUNDARY_ASSET))], response.body).into_response()
}

// HTTP API Handlers
pub async fn get_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (view, max_bounds) = {
        let widget = state.widget();
        (widget.view().state(), widget.view().max_bounds())
    };
    // Leaflet takes [[south, west], [north, east]]
    let max_bounds = max_bounds.map(|b| {
        [
            [b.south_west.lat, b.south_west.lng],
            [b.north_east.lat, b.north_east.lng],
        ]
    });
    let cluster = state.settings().cluster_options();
    let colors: serde_json::Map<String, serde_json::Value> = Category::ALL
        .iter()
        .map(|c| (c.key().to_string(), c.color().into()))
        .collect();
    let filters: Vec<&str> = CategoryFilter::options().iter().map(|f| f.key()).collect();

    Json(serde_json::json!({
        "tiles": {
            "url": TILE_URL_TEMPLATE,
            "maxZoom": TILE_MAX_ZOOM,
            "attribution": TILE_ATTRIBUTION,
        },
        "map": {
            "center": view.center,
            "zoom": view.zoom,
            "minZoom": view.min_zoom,
            "maxZoom": view.max_zoom,
            "maxBounds": max_bounds,
        },
        "cluster": {
            "maxClusterRadius": cluster.max_cluster_radius,
            "spiderfyDistanceMultiplier": cluster.spiderfy_distance_multiplier,
            "spiderRadius": cluster.spider_radius(),
        },
        "filters": filters,
        "colors": colors,
        "boundaryStyle": BoundaryStyle::default(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PlacesQuery {
    pub category: Option<String>,
}

pub async fn get_places(
    State(state): State<AppState>,
    Query(query): Query<PlacesQuery>,
) -> Result<Json<Vec<Place>>, StatusCode> {
    let filter = match query.category.as_deref() {
        None | Some("") => CategoryFilter::All,
        Some(raw) => raw.parse::<CategoryFilter>().map_err(|e| {
            tracing::warn!("Invalid category filter: {}", e);
            StatusCode::BAD_REQUEST
        })?,
    };

    let widget = state.widget();
    let places = widget
        .catalog()
        .filtered(filter)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(places))
}

/// Current frame, carrying any view commands not yet delivered.
pub async fn get_map(State(state): State<AppState>) -> Json<MapFrame> {
    Json(state.widget().take_frame())
}

pub async fn post_map_event(
    State(state): State<AppState>,
    Json(event): Json<MapEvent>,
) -> Json<MapFrame> {
    let frame = state.widget().handle(event);
    publish(&state.event_sender, MapUpdate::Frame(frame.clone()));
    Json(frame)
}

pub async fn map_events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);
    let mut event_receiver = state.event_sender.subscribe();

    // Forward broadcast updates to this client
    tokio::spawn(async move {
        loop {
            let update = tokio::select! {
                update = event_receiver.recv() => match update {
                    Ok(update) => update,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("SSE client lagged, skipped {} updates", skipped);
                        continue;
                    }
                    Err(_) => break, // Channel closed
                },
                _ = tokio::time::sleep(Duration::from_secs(HEARTBEAT_SECS)) => MapUpdate::Heartbeat {
                    message: "SSE connection alive".to_string(),
                },
            };

            let sse_event = SseEvent::default()
                .json_data(&update)
                .unwrap_or_else(|_| SseEvent::default().data("Error serializing update"));

            if tx.send(Ok(sse_event)).await.is_err() {
                break; // Client disconnected
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive-message"),
    )
}

pub async fn get_languages() -> Json<Vec<Language>> {
    Json(LANGUAGES.to_vec())
}

pub async fn get_translations(
    State(state): State<AppState>,
    AxumPath(locale): AxumPath<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    state
        .translations
        .resolved(&locale)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocaleBody {
    pub locale: String,
}

#[derive(Debug, Serialize)]
pub struct LocaleResponse {
    pub locale: String,
    pub stored: bool,
    pub language: Option<Language>,
}

fn locale_response(locale: &str, stored: bool) -> Json<LocaleResponse> {
    Json(LocaleResponse {
        locale: locale.to_string(),
        stored,
        language: i18n::language(locale).copied(),
    })
}

/// Stored preference, else the browser's `Accept-Language`, else the default.
fn request_locale(state: &AppState, headers: &HeaderMap) -> &'static str {
    let stored = state.settings().locale.clone();
    let accept = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    i18n::resolve_locale(stored.as_deref(), accept)
}

pub async fn get_locale(State(state): State<AppState>, headers: HeaderMap) -> Json<LocaleResponse> {
    let locale = request_locale(&state, &headers);
    let stored = state.settings().locale.as_deref() == Some(locale);
    locale_response(locale, stored)
}

pub async fn set_locale(
    State(state): State<AppState>,
    Json(body): Json<LocaleBody>,
) -> Result<Json<LocaleResponse>, StatusCode> {
    let settings = {
        let mut settings = state.settings();
        settings.update_locale(&body.locale).map_err(|e| {
            tracing::warn!("{}", e);
            StatusCode::BAD_REQUEST
        })?;
        settings.clone()
    };

    if let Some(path) = &state.settings_path {
        if let Err(e) = settings.save_to(path) {
            tracing::warn!("Failed to save settings: {:#}", e);
        }
    }

    tracing::info!(locale = %body.locale, "interface locale changed");
    publish(
        &state.event_sender,
        MapUpdate::Locale {
            locale: body.locale.clone(),
        },
    );
    Ok(locale_response(&body.locale, true))
}
