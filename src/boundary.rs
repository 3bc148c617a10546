//! Decorative boundary overlay. Loading is best-effort: any failure leaves the
//! widget on the fallback bounding box and is only logged.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::assets::Asset;
use crate::constants::{
    BOUNDARY_ASSET, BOUNDARY_FILL, BOUNDARY_FILL_OPACITY, BOUNDARY_STROKE, BOUNDARY_WEIGHT,
};
use crate::geojson::FeatureCollection;
use crate::widget::MapWidget;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryStyle {
    pub color: &'static str,
    pub weight: f64,
    pub fill_color: &'static str,
    pub fill_opacity: f64,
}

impl Default for BoundaryStyle {
    fn default() -> Self {
        BoundaryStyle {
            color: BOUNDARY_STROKE,
            weight: BOUNDARY_WEIGHT,
            fill_color: BOUNDARY_FILL,
            fill_opacity: BOUNDARY_FILL_OPACITY,
        }
    }
}

/// Raw answer from a boundary source, HTTP-style.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryResponse {
    pub status: u16,
    pub body: String,
}

impl BoundaryResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        BoundaryResponse {
            status: 200,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        BoundaryResponse {
            status: 404,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where the border polygon comes from.
pub trait BoundarySource: Send + Sync {
    fn fetch(&self) -> Result<BoundaryResponse>;

    fn describe(&self) -> String;
}

impl<S: BoundarySource + ?Sized> BoundarySource for Arc<S> {
    fn fetch(&self) -> Result<BoundaryResponse> {
        (**self).fetch()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Border file compiled into the binary.
#[derive(Debug, Clone)]
pub struct EmbeddedBoundarySource {
    asset: String,
}

impl EmbeddedBoundarySource {
    pub fn new(asset: impl Into<String>) -> Self {
        EmbeddedBoundarySource {
            asset: asset.into(),
        }
    }
}

impl Default for EmbeddedBoundarySource {
    fn default() -> Self {
        EmbeddedBoundarySource::new(BOUNDARY_ASSET)
    }
}

impl BoundarySource for EmbeddedBoundarySource {
    fn fetch(&self) -> Result<BoundaryResponse> {
        match Asset::get(&self.asset) {
            Some(file) => {
                let body = String::from_utf8(file.data.into_owned())
                    .context("Embedded boundary file is not UTF-8")?;
                Ok(BoundaryResponse::ok(body))
            }
            None => Ok(BoundaryResponse::not_found()),
        }
    }

    fn describe(&self) -> String {
        format!("embedded:{}", self.asset)
    }
}

/// Border file on disk, e.g. an override configured in settings.
#[derive(Debug, Clone)]
pub struct FileBoundarySource {
    path: PathBuf,
}

impl FileBoundarySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBoundarySource { path: path.into() }
    }
}

impl BoundarySource for FileBoundarySource {
    fn fetch(&self) -> Result<BoundaryResponse> {
        match std::fs::read_to_string(&self.path) {
            Ok(body) => Ok(BoundaryResponse::ok(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BoundaryResponse::not_found()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read boundary file {}", self.path.display()))
            }
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fetches and parses the border collection. Non-success statuses are errors.
pub fn load(source: &dyn BoundarySource) -> Result<FeatureCollection> {
    let response = source.fetch()?;
    if !response.is_success() {
        anyhow::bail!(
            "Boundary request to {} failed with status {}",
            source.describe(),
            response.status
        );
    }
    FeatureCollection::parse(&response.body)
}

/// Shared flag telling background work whether its widget is still mounted.
#[derive(Debug, Clone)]
pub struct MountGuard {
    mounted: Arc<AtomicBool>,
}

impl MountGuard {
    pub fn new() -> Self {
        MountGuard {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }
}

impl Default for MountGuard {
    fn default() -> Self {
        MountGuard::new()
    }
}

/// Loads the boundary in the background and applies it to `widget`, unless
/// the widget was unmounted meanwhile. `on_applied` runs with the widget
/// still locked. Resolves to whether the result was applied.
pub fn spawn_load<S, F>(widget: Arc<Mutex<MapWidget>>, source: S, on_applied: F) -> JoinHandle<bool>
where
    S: BoundarySource + 'static,
    F: FnOnce(&mut MapWidget) + Send + 'static,
{
    let guard = widget
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .mount_guard();

    tokio::spawn(async move {
        let description = source.describe();
        let result = match tokio::task::spawn_blocking(move || load(&source)).await {
            Ok(result) => result,
            Err(e) => Err(anyhow::Error::new(e).context("Boundary load task failed")),
        };

        if !guard.is_mounted() {
            tracing::debug!(source = %description, "widget unmounted, dropping boundary result");
            return false;
        }

        let mut widget = widget.lock().unwrap_or_else(|e| e.into_inner());
        widget.apply_boundary(result);
        on_applied(&mut widget);
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FixedSource(BoundaryResponse);

    impl BoundarySource for FixedSource {
        fn fetch(&self) -> Result<BoundaryResponse> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    #[test]
    fn test_load_rejects_error_status() {
        let err = load(&FixedSource(BoundaryResponse::not_found())).unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_load_rejects_bad_body() {
        assert!(load(&FixedSource(BoundaryResponse::ok("not json"))).is_err());
    }

    #[test]
    fn test_embedded_source() {
        let collection = load(&EmbeddedBoundarySource::default()).unwrap();
        assert!(!collection.is_empty());
        assert!(collection.bounds().is_some());

        let missing = EmbeddedBoundarySource::new("missing.geojson").fetch().unwrap();
        assert_eq!(missing.status, 404);
    }

    #[test]
    fn test_file_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("border.geojson");
        std::fs::write(&path, r#"{"type": "FeatureCollection", "features": []}"#).unwrap();

        assert!(load(&FileBoundarySource::new(&path)).unwrap().is_empty());

        let missing = FileBoundarySource::new(dir.path().join("nope.geojson"));
        assert_eq!(missing.fetch().unwrap().status, 404);
    }

    #[tokio::test]
    async fn test_spawn_load_applies_fallback_on_404() {
        use crate::places::PlaceCatalog;
        use crate::widget::{fallback_bounds, BoundaryState, WidgetOptions};

        let widget = Arc::new(Mutex::new(MapWidget::mount(
            PlaceCatalog::default(),
            WidgetOptions::default(),
            None,
        )));
        let applied = spawn_load(
            widget.clone(),
            FixedSource(BoundaryResponse::not_found()),
            |widget| {
                widget.take_frame();
            },
        )
        .await
        .unwrap();

        assert!(applied);
        let widget = widget.lock().unwrap();
        assert_eq!(
            widget.boundary(),
            &BoundaryState::Fallback {
                bounds: fallback_bounds()
            }
        );
    }

    #[tokio::test]
    async fn test_spawn_load_after_unmount_is_dropped() {
        use crate::places::PlaceCatalog;
        use crate::widget::{BoundaryState, WidgetOptions};

        let widget = Arc::new(Mutex::new(MapWidget::mount(
            PlaceCatalog::default(),
            WidgetOptions::default(),
            None,
        )));
        let handle = spawn_load(
            widget.clone(),
            Arc::new(EmbeddedBoundarySource::default()),
            |_| panic!("must not run after unmount"),
        );
        widget.lock().unwrap().unmount();

        assert!(!handle.await.unwrap());
        assert_eq!(widget.lock().unwrap().boundary(), &BoundaryState::Pending);
    }

    #[test]
    fn test_mount_guard_shared() {
        let guard = MountGuard::new();
        let clone = guard.clone();
        assert!(clone.is_mounted());
        guard.release();
        assert!(!clone.is_mounted());
    }
}
