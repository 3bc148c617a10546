//! View state of the map: center, zoom and viewport size, with the
//! spherical-mercator projection the browser map uses. Layer points computed
//! here line up with Leaflet's `latLngToLayerPoint`, so pixel radii mean the
//! same thing on both sides.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_VIEWPORT, FALLBACK_BOUNDS, INITIAL_CENTER, INITIAL_ZOOM, MAX_BOUNDS_PAD, MAX_ZOOM,
    MIN_ZOOM,
};
use crate::geo::{LatLng, LatLngBounds, Point};

const EARTH_RADIUS: f64 = 6378137.0;
const MAX_LATITUDE: f64 = 85.0511287798;
const TILE_SIZE: f64 = 256.0;

/// Map events other components can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapEventKind {
    ZoomEnd,
    MoveEnd,
}

pub type ListenerId = u64;

/// Construction options for a [`MapView`].
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub size: Point,
    pub max_bounds: Option<LatLngBounds>,
}

impl Default for MapOptions {
    fn default() -> Self {
        let fallback = LatLngBounds::new(FALLBACK_BOUNDS[0].into(), FALLBACK_BOUNDS[1].into());
        Self {
            center: INITIAL_CENTER.into(),
            zoom: INITIAL_ZOOM,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            size: Point::new(DEFAULT_VIEWPORT.0, DEFAULT_VIEWPORT.1),
            max_bounds: Some(fallback.pad(MAX_BOUNDS_PAD)),
        }
    }
}

/// Serializable snapshot of where the map is looking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub width: f64,
    pub height: f64,
}

/// Padding and zoom cap for [`MapView::fit_bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FitOptions {
    pub padding_top_left: Point,
    pub padding_bottom_right: Point,
    pub max_zoom: Option<f64>,
}

/// View changes the browser has to animate to stay in step with the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewCommand {
    FlyTo {
        center: LatLng,
        zoom: f64,
        duration: f64,
    },
    FitBounds {
        bounds: LatLngBounds,
        options: FitOptions,
        center: LatLng,
        zoom: f64,
    },
}

#[derive(Debug, Clone)]
pub struct MapView {
    center: LatLng,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    size: Point,
    max_bounds: Option<LatLngBounds>,
    listeners: Vec<(ListenerId, MapEventKind)>,
    next_listener: ListenerId,
    destroyed: bool,
}

impl MapView {
    pub fn new(options: MapOptions) -> Self {
        let mut view = MapView {
            center: options.center,
            zoom: options.zoom,
            min_zoom: options.min_zoom,
            max_zoom: options.max_zoom,
            size: options.size,
            max_bounds: options.max_bounds,
            listeners: Vec::new(),
            next_listener: 1,
            destroyed: false,
        };
        view.set_view(options.center, options.zoom);
        view
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn size(&self) -> Point {
        self.size
    }

    pub fn max_bounds(&self) -> Option<LatLngBounds> {
        self.max_bounds
    }

    pub fn state(&self) -> ViewState {
        ViewState {
            center: self.center,
            zoom: self.zoom,
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            width: self.size.x,
            height: self.size.y,
        }
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.size = Point::new(width.max(0.0), height.max(0.0));
    }

    /// Moves the view, limiting zoom to the allowed range and the center to the max bounds.
    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.zoom = self.limit_zoom(zoom);
        self.center = match &self.max_bounds {
            Some(bounds) => bounds.clamp(center),
            None => center,
        };
    }

    fn limit_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.min_zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Projects a coordinate to absolute pixel space at `zoom`.
    pub fn project(&self, lat_lng: LatLng, zoom: f64) -> Point {
        let d = std::f64::consts::PI / 180.0;
        let lat = lat_lng.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let sin = (lat * d).sin();
        let world = Point::new(
            EARTH_RADIUS * lat_lng.lng * d,
            EARTH_RADIUS * ((1.0 + sin) / (1.0 - sin)).ln() / 2.0,
        );

        let scale = TILE_SIZE * 2f64.powf(zoom);
        let k = 0.5 / (std::f64::consts::PI * EARTH_RADIUS);
        Point::new(scale * (k * world.x + 0.5), scale * (-k * world.y + 0.5))
    }

    pub fn unproject(&self, point: Point, zoom: f64) -> LatLng {
        let scale = TILE_SIZE * 2f64.powf(zoom);
        let k = 0.5 / (std::f64::consts::PI * EARTH_RADIUS);
        let world = Point::new((point.x / scale - 0.5) / k, (point.y / scale - 0.5) / -k);

        let d = 180.0 / std::f64::consts::PI;
        LatLng::new(
            (2.0 * (world.y / EARTH_RADIUS).exp().atan() - std::f64::consts::PI / 2.0) * d,
            world.x * d / EARTH_RADIUS,
        )
    }

    /// Top-left corner of the viewport in absolute pixels.
    pub fn pixel_origin(&self) -> Point {
        self.project(self.center, self.zoom)
            .subtract(self.size.scale(0.5))
            .round()
    }

    pub fn lat_lng_to_layer_point(&self, lat_lng: LatLng) -> Point {
        self.project(lat_lng, self.zoom)
            .round()
            .subtract(self.pixel_origin())
    }

    pub fn layer_point_to_lat_lng(&self, point: Point) -> LatLng {
        self.unproject(point.add(self.pixel_origin()), self.zoom)
    }

    /// Largest zoom at which `bounds` fits the viewport minus `padding`.
    pub fn bounds_zoom(&self, bounds: &LatLngBounds, padding: Point) -> f64 {
        let available = self.size.subtract(padding);
        let nw = self.project(bounds.north_west(), self.zoom);
        let se = self.project(bounds.south_east(), self.zoom);
        let bounds_size = Point::new((se.x - nw.x).abs(), (se.y - nw.y).abs());

        let scale = (available.x / bounds_size.x).min(available.y / bounds_size.y);
        let zoom = self.zoom + scale.log2();
        // zoomSnap = 1
        let zoom = ((zoom * 100.0).round() / 100.0).floor();

        self.limit_zoom(zoom)
    }

    /// Fits the view to `bounds` and returns the command that mirrors it in the browser.
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds, options: FitOptions) -> ViewCommand {
        let padding = options.padding_top_left.add(options.padding_bottom_right);
        let mut zoom = self.bounds_zoom(bounds, padding);
        if let Some(max_zoom) = options.max_zoom {
            zoom = zoom.min(max_zoom);
        }

        let offset = options
            .padding_bottom_right
            .subtract(options.padding_top_left)
            .scale(0.5);
        let sw = self.project(bounds.south_west, zoom);
        let ne = self.project(bounds.north_east, zoom);
        let center = self.unproject(sw.add(ne).scale(0.5).add(offset), zoom);

        self.set_view(center, zoom);

        ViewCommand::FitBounds {
            bounds: *bounds,
            options,
            center: self.center,
            zoom: self.zoom,
        }
    }

    pub fn fly_to(&mut self, center: LatLng, zoom: f64, duration: f64) -> ViewCommand {
        self.set_view(center, zoom);
        ViewCommand::FlyTo {
            center: self.center,
            zoom: self.zoom,
            duration,
        }
    }

    /// Registers a listener slot for `kind`; the owner dispatches to it.
    pub fn on(&mut self, kind: MapEventKind) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, kind));
        id
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    pub fn is_listening(&self, id: ListenerId, kind: MapEventKind) -> bool {
        self.listeners
            .iter()
            .any(|(listener, listener_kind)| *listener == id && *listener_kind == kind)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Drops every listener. The view must not be used for rendering afterwards.
    pub fn destroy(&mut self) {
        self.listeners.clear();
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Default for MapView {
    fn default() -> Self {
        MapView::new(MapOptions::default())
    }
}
