//! Integration tests for the map HTTP API.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

use krabi_map::boundary::{
    self, BoundaryResponse, BoundarySource, EmbeddedBoundarySource,
};
use krabi_map::i18n::Translations;
use krabi_map::places::PlaceCatalog;
use krabi_map::server::create_app;
use krabi_map::server::events::event_channel;
use krabi_map::server::state::AppState;
use krabi_map::settings::Settings;
use krabi_map::widget::{MapWidget, WidgetOptions};

struct MissingBoundary;

impl BoundarySource for MissingBoundary {
    fn fetch(&self) -> anyhow::Result<BoundaryResponse> {
        Ok(BoundaryResponse::not_found())
    }

    fn describe(&self) -> String {
        "missing".to_string()
    }
}

/// Creates a test AppState whose settings are persisted in a temporary directory.
fn create_test_state_with(boundary: Arc<dyn BoundarySource>) -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let widget = MapWidget::mount(PlaceCatalog::default(), WidgetOptions::default(), None);

    let state = AppState {
        widget: Arc::new(Mutex::new(widget)),
        settings: Arc::new(Mutex::new(Settings::default())),
        settings_path: Some(temp_dir.path().join("krabi_map.ini")),
        translations: Arc::new(Translations::load_embedded().expect("Failed to load translations")),
        boundary,
        event_sender: event_channel(),
    };

    (state, temp_dir)
}

fn create_test_state() -> (AppState, TempDir) {
    create_test_state_with(Arc::new(EmbeddedBoundarySource::default()))
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    (status, json)
}

/// Helper to make a GET request and get the response body as JSON.
async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Helper to make a POST request with a JSON body.
async fn post_json(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

fn rendered_total(frame: &Value) -> u64 {
    frame["layers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|layer| match layer["kind"].as_str() {
            Some("marker") => 1,
            _ => layer["count"].as_u64().unwrap(),
        })
        .sum()
}

// ============================================================================
// Static files
// ============================================================================

#[tokio::test]
async fn test_index_and_assets() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);

    for (uri, content_type) in [
        ("/", "text/html; charset=utf-8"),
        ("/script.js", "application/javascript"),
        ("/style.css", "text/css"),
        ("/krabi-border.geojson", "application/geo+json"),
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(response.headers()[header::CONTENT_TYPE], content_type);
    }
}

#[tokio::test]
async fn test_index_rendered_in_request_locale() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);

    let request = Request::builder()
        .uri("/")
        .header(header::ACCEPT_LANGUAGE, "de-DE, en;q=0.5")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(body.to_vec()).unwrap();

    assert!(html.contains(r#"<html lang="de">"#));
    assert!(html.contains("Krabi entdecken"));
    assert!(html.contains("14 Orte auf der Karte"));
    assert!(html.contains("<li>"));
    assert!(!html.contains("{{t:"));
    assert!(!html.contains("{{list:"));
}

#[tokio::test]
async fn test_config() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);

    let (status, json) = get_json(&app, "/api/config").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tiles"]["maxZoom"], 19);
    assert_eq!(json["map"]["minZoom"], 8.0);
    assert_eq!(json["map"]["maxZoom"], 17.0);
    assert_eq!(json["cluster"]["maxClusterRadius"], 60.0);
    assert_eq!(json["cluster"]["spiderRadius"], 35.0);
    assert_eq!(json["filters"], json!(["all", "beach", "island", "snorkel", "sunset"]));
    assert_eq!(json["colors"]["sunset"], "#e17055");

    // Fallback box (7.4..8.4, 98.55..99.1) padded by 15 %
    let max_bounds = json["map"]["maxBounds"].as_array().unwrap();
    let south_west = max_bounds[0].as_array().unwrap();
    let north_east = max_bounds[1].as_array().unwrap();
    assert!((south_west[0].as_f64().unwrap() - 7.25).abs() < 1e-9);
    assert!((south_west[1].as_f64().unwrap() - 98.4675).abs() < 1e-9);
    assert!((north_east[0].as_f64().unwrap() - 8.55).abs() < 1e-9);
    assert!((north_east[1].as_f64().unwrap() - 99.1825).abs() < 1e-9);
}

// ============================================================================
// Places
// ============================================================================

#[tokio::test]
async fn test_places_filtering() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);

    let (status, json) = get_json(&app, "/api/places").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 14);
    assert_eq!(json[0]["id"], "ao-nang");
    assert_eq!(json[0]["type"], "beach");
    assert_eq!(json[0]["highlightTag"], "Starting Point");

    let (status, json) = get_json(&app, "/api/places?category=snorkel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, _) = get_json(&app, "/api/places?category=volcano").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Map events
// ============================================================================

#[tokio::test]
async fn test_initial_frame() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);

    let (status, frame) = get_json(&app, "/api/map").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(frame["mounted"], true);
    assert_eq!(frame["filter"], "all");
    assert_eq!(frame["interaction"]["state"], "idle");
    assert_eq!(frame["active"]["placeId"], "ao-nang");
    assert_eq!(frame["boundary"]["status"], "pending");
    assert_eq!(frame["commands"][0]["type"], "fit_bounds");
    assert_eq!(rendered_total(&frame), 14);

    // Commands are delivered once
    let (_, frame) = get_json(&app, "/api/map").await;
    assert!(frame["commands"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_filter_change_event() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);
    get_json(&app, "/api/map").await;

    let (status, frame) = post_json(
        &app,
        "/api/map/events",
        json!({"type": "filter_change", "category": "sunset"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(frame["filter"], "sunset");
    assert_eq!(rendered_total(&frame), 9);
    assert_eq!(frame["active"]["placeId"], "ao-nang-sunset");
    assert_eq!(frame["commands"][0]["type"], "fit_bounds");

    let (_, frame) = post_json(
        &app,
        "/api/map/events",
        json!({"type": "filter_change", "category": "all"}),
    )
    .await;
    assert_eq!(rendered_total(&frame), 14);
    // The selection survives when still visible
    assert_eq!(frame["active"]["placeId"], "ao-nang-sunset");
}

#[tokio::test]
async fn test_cluster_click_flies_in() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);

    let (_, frame) = get_json(&app, "/api/map").await;
    let badge = frame["layers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|layer| layer["kind"] == "cluster")
        .cloned()
        .expect("overview should contain a cluster");
    let zoom = frame["view"]["zoom"].as_f64().unwrap();

    let (status, frame) = post_json(
        &app,
        "/api/map/events",
        json!({"type": "cluster_click", "generation": frame["generation"], "index": badge["index"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(frame["commands"][0]["type"], "fly_to");
    assert_eq!(frame["commands"][0]["zoom"].as_f64().unwrap(), (zoom + 2.0).min(17.0));
    assert_eq!(frame["commands"][0]["duration"], 0.35);
    assert_eq!(frame["interaction"]["state"], "flying");
}

#[tokio::test]
async fn test_stale_and_unknown_clicks_are_ignored() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);

    let (_, before) = get_json(&app, "/api/map").await;

    let (status, frame) = post_json(
        &app,
        "/api/map/events",
        json!({"type": "cluster_click", "generation": 0, "index": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(frame["commands"].as_array().unwrap().is_empty());

    let (status, frame) = post_json(
        &app,
        "/api/map/events",
        json!({"type": "marker_click", "place_id": "atlantis"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(frame["commands"].as_array().unwrap().is_empty());
    assert_eq!(frame["active"], before["active"]);
}

#[tokio::test]
async fn test_marker_click_selects_place() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);
    get_json(&app, "/api/map").await;

    let (status, frame) = post_json(
        &app,
        "/api/map/events",
        json!({"type": "marker_click", "place_id": "hong"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(frame["active"]["name"], "Hong Island");
    assert_eq!(frame["active"]["highlightTag"], "Lagoon");
    assert_eq!(frame["commands"][0]["type"], "fly_to");
    assert!(frame["commands"][0]["zoom"].as_f64().unwrap() >= 11.0);
}

#[tokio::test]
async fn test_invalid_event_rejected() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);

    let (status, _) = post_json(&app, "/api/map/events", json!({"type": "teleport"})).await;
    assert!(status.is_client_error());

    let (status, _) = post_json(
        &app,
        "/api/map/events",
        json!({"type": "filter_change", "category": "volcano"}),
    )
    .await;
    assert!(status.is_client_error());
}

// ============================================================================
// Boundary
// ============================================================================

#[tokio::test]
async fn test_missing_boundary_falls_back() {
    let (state, _temp_dir) = create_test_state_with(Arc::new(MissingBoundary));
    let app = create_app(state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/krabi-border.geojson")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let applied = boundary::spawn_load(state.widget.clone(), state.boundary.clone(), |_| {})
        .await
        .unwrap();
    assert!(applied);

    let (_, frame) = get_json(&app, "/api/map").await;
    assert_eq!(frame["boundary"]["status"], "fallback");
    assert_eq!(frame["boundary"]["bounds"]["south_west"]["lat"], 7.4);
    assert_eq!(frame["boundary"]["bounds"]["north_east"]["lng"], 99.1);
    assert_eq!(rendered_total(&frame), 14);
}

#[tokio::test]
async fn test_embedded_boundary_loads() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state.clone());

    boundary::spawn_load(state.widget.clone(), state.boundary.clone(), |_| {})
        .await
        .unwrap();

    let (_, frame) = get_json(&app, "/api/map").await;
    assert_eq!(frame["boundary"]["status"], "loaded");
    assert_eq!(frame["boundary"]["feature_count"], 1);
    assert_eq!(frame["boundary"]["style"]["color"], "#0099ff");
}

// ============================================================================
// Languages and locale
// ============================================================================

#[tokio::test]
async fn test_languages_and_translations() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);

    let (status, json) = get_json(&app, "/api/languages").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 10);
    assert_eq!(json[0]["code"], "th");
    assert_eq!(json[0]["name"], "ไทย");

    let (status, json) = get_json(&app, "/api/i18n/ja").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["map"]["filters"]["beach"], "ビーチ");

    let (status, _) = get_json(&app, "/api/i18n/pt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_locale_resolution_and_persistence() {
    let (state, temp_dir) = create_test_state();
    let app = create_app(state);

    let request = Request::builder()
        .uri("/api/locale")
        .header(header::ACCEPT_LANGUAGE, "pt-BR, de-DE;q=0.9, en;q=0.5")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["locale"], "de");
    assert_eq!(json["stored"], false);

    let (status, _) = post_json(&app, "/api/locale", json!({"locale": "pt"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post_json(&app, "/api/locale", json!({"locale": "ja"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["language"]["name"], "日本語");

    let (_, json) = get_json(&app, "/api/locale").await;
    assert_eq!(json["locale"], "ja");
    assert_eq!(json["stored"], true);

    let saved = Settings::load_from(&temp_dir.path().join("krabi_map.ini")).unwrap();
    assert_eq!(saved.locale.as_deref(), Some("ja"));
}

#[tokio::test]
async fn test_default_locale_without_preferences() {
    let (state, _temp_dir) = create_test_state();
    let app = create_app(state);

    let (_, json) = get_json(&app, "/api/locale").await;
    assert_eq!(json["locale"], "en");
    assert_eq!(json["language"]["label"], "EN");
}
