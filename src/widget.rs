//! The map widget: owns the view, the cluster group, the visible markers and
//! the active selection, and turns browser events into frames.
//!
//! Interaction states: `Idle`, `Flying` (a fly-to is animating in the
//! browser; ends with the next zoom-end/move-end) and `Spiderfied` (a cluster
//! at max zoom is fanned out; cleared by the next recompute or a click on the
//! empty map).

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::boundary::{BoundaryStyle, MountGuard};
use crate::cluster::{Cluster, ClusterGroup, ClusterOptions};
use crate::constants::{
    BOUNDARY_PAD, CARD_FIT_MAX_ZOOM, CARD_PADDING_BOTTOM_RIGHT, CARD_PADDING_TOP_LEFT,
    CLUSTER_FLY_DURATION, CLUSTER_ZOOM_STEP, FALLBACK_BOUNDS, MARKER_FLY_DURATION,
    MARKER_MIN_ZOOM, SINGLE_FOCUS_DURATION, SINGLE_FOCUS_ZOOM,
};
use crate::geo::{LatLng, LatLngBounds, Point};
use crate::geojson::FeatureCollection;
use crate::map_view::{FitOptions, MapEventKind, MapOptions, MapView, ViewCommand, ViewState};
use crate::marker::{Marker, SelectHandler};
use crate::places::{CategoryFilter, Place, PlaceCatalog};
use crate::render::{render_clusters, RenderedLayer};
use crate::spiderfy::SpiderLayer;

#[derive(Debug, Clone, Default)]
pub struct WidgetOptions {
    pub map: MapOptions,
    pub cluster: ClusterOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Interaction {
    #[default]
    Idle,
    Flying { target: LatLng, zoom: f64 },
    Spiderfied { cluster: usize },
}

/// Events reported by the browser map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapEvent {
    Resize { width: f64, height: f64 },
    ZoomEnd { center: LatLng, zoom: f64 },
    MoveEnd { center: LatLng, zoom: f64 },
    ClusterClick { generation: u64, index: usize },
    MarkerClick { place_id: String },
    MapClick,
    FilterChange { category: CategoryFilter },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoCard {
    pub place_id: String,
    pub highlight_tag: String,
    pub name: String,
    pub short_description: String,
}

impl From<&Place> for InfoCard {
    fn from(place: &Place) -> Self {
        InfoCard {
            place_id: place.id.clone(),
            highlight_tag: place.highlight_tag.clone(),
            name: place.name.clone(),
            short_description: place.short_description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BoundaryState {
    #[default]
    Pending,
    Loaded {
        feature_count: usize,
        bounds: Option<LatLngBounds>,
        style: BoundaryStyle,
    },
    Fallback {
        bounds: LatLngBounds,
    },
}

/// Everything the browser needs to draw the map after one event.
#[derive(Debug, Clone, Serialize)]
pub struct MapFrame {
    pub generation: u64,
    pub mounted: bool,
    pub view: ViewState,
    pub filter: CategoryFilter,
    pub interaction: Interaction,
    pub layers: Vec<RenderedLayer>,
    pub spider: Option<SpiderLayer>,
    pub active: Option<InfoCard>,
    pub boundary: BoundaryState,
    pub commands: Vec<ViewCommand>,
}

pub fn fallback_bounds() -> LatLngBounds {
    LatLngBounds::new(FALLBACK_BOUNDS[0].into(), FALLBACK_BOUNDS[1].into())
}

fn card_fit_options() -> FitOptions {
    FitOptions {
        padding_top_left: Point::new(CARD_PADDING_TOP_LEFT.0, CARD_PADDING_TOP_LEFT.1),
        padding_bottom_right: Point::new(CARD_PADDING_BOTTOM_RIGHT.0, CARD_PADDING_BOTTOM_RIGHT.1),
        max_zoom: Some(CARD_FIT_MAX_ZOOM),
    }
}

pub struct MapWidget {
    catalog: PlaceCatalog,
    map: MapView,
    group: ClusterGroup,
    markers: Vec<Marker>,
    filter: CategoryFilter,
    active: Option<String>,
    interaction: Interaction,
    boundary: BoundaryState,
    on_select: Option<SelectHandler>,
    guard: MountGuard,
    pending: Vec<ViewCommand>,
}

impl MapWidget {
    /// Creates the map view, attaches the cluster group and shows every place.
    pub fn mount(
        catalog: PlaceCatalog,
        options: WidgetOptions,
        on_select: Option<SelectHandler>,
    ) -> Self {
        let mut map = MapView::new(options.map);
        let mut group = ClusterGroup::new(options.cluster);
        group.add_to(&mut map);

        let active = catalog.all().first().map(|p| p.id.clone());
        let mut widget = MapWidget {
            catalog,
            map,
            group,
            markers: Vec::new(),
            filter: CategoryFilter::All,
            active,
            interaction: Interaction::Idle,
            boundary: BoundaryState::Pending,
            on_select,
            guard: MountGuard::new(),
            pending: Vec::new(),
        };
        widget.apply_filter(CategoryFilter::All);

        tracing::info!(
            places = widget.catalog.len(),
            zoom = widget.map.zoom(),
            "map widget mounted"
        );
        widget
    }

    /// Detaches the cluster group and destroys the view. Safe to call twice.
    pub fn unmount(&mut self) {
        if !self.guard.is_mounted() {
            return;
        }
        self.guard.release();
        self.group.remove(&mut self.map);
        self.map.destroy();
        self.markers.clear();
        self.pending.clear();
        self.interaction = Interaction::Idle;
        tracing::info!("map widget unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.guard.is_mounted()
    }

    pub fn mount_guard(&self) -> MountGuard {
        self.guard.clone()
    }

    pub fn catalog(&self) -> &PlaceCatalog {
        &self.catalog
    }

    pub fn view(&self) -> &MapView {
        &self.map
    }

    pub fn filter(&self) -> CategoryFilter {
        self.filter
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    pub fn boundary(&self) -> &BoundaryState {
        &self.boundary
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn clusters(&self) -> &[Cluster] {
        self.group.clusters()
    }

    pub fn spider(&self) -> Option<&SpiderLayer> {
        self.group.spider()
    }

    pub fn generation(&self) -> u64 {
        self.group.generation()
    }

    pub fn active_place(&self) -> Option<&Place> {
        self.active.as_deref().and_then(|id| self.catalog.get(id))
    }

    /// Applies one event and returns the resulting frame. Events after
    /// unmount are ignored.
    pub fn handle(&mut self, event: MapEvent) -> MapFrame {
        if !self.is_mounted() {
            tracing::warn!(?event, "event for unmounted map widget ignored");
            return self.take_frame();
        }

        match event {
            MapEvent::Resize { width, height } => {
                self.map.set_size(width, height);
                self.recompute();
            }
            MapEvent::ZoomEnd { center, zoom } => self.view_changed(MapEventKind::ZoomEnd, center, zoom),
            MapEvent::MoveEnd { center, zoom } => self.view_changed(MapEventKind::MoveEnd, center, zoom),
            MapEvent::ClusterClick { generation, index } => {
                if let Err(e) = self.cluster_click(generation, index) {
                    tracing::warn!("cluster click ignored: {e}");
                }
            }
            MapEvent::MarkerClick { place_id } => {
                if let Err(e) = self.select_place(&place_id) {
                    tracing::warn!("marker click ignored: {e}");
                }
            }
            MapEvent::MapClick => {
                if self.group.unspiderfy() {
                    self.interaction = Interaction::Idle;
                }
            }
            MapEvent::FilterChange { category } => self.apply_filter(category),
        }

        self.take_frame()
    }

    fn view_changed(&mut self, kind: MapEventKind, center: LatLng, zoom: f64) {
        self.map.set_view(center, zoom);
        self.interaction = Interaction::Idle;
        if self.group.listens_to(&self.map, kind) {
            self.recompute();
        }
    }

    fn recompute(&mut self) {
        self.group.rebuild(&self.map, &self.markers);
        if matches!(self.interaction, Interaction::Spiderfied { .. }) {
            self.interaction = Interaction::Idle;
        }
    }

    fn cluster_click(&mut self, generation: u64, index: usize) -> Result<()> {
        if generation != self.group.generation() {
            anyhow::bail!(
                "stale frame {generation} (current {})",
                self.group.generation()
            );
        }
        let (centroid, first_member, singleton) = self
            .group
            .clusters()
            .get(index)
            .map(|c| (c.centroid, c.members[0], c.is_singleton()))
            .ok_or_else(|| anyhow::anyhow!("no cluster {index} in frame {generation}"))?;

        if singleton {
            let place_id = self.markers[first_member].place_id.clone();
            return self.select_place(&place_id);
        }

        let zoom = self.map.zoom();
        let max_zoom = self.map.max_zoom();
        if zoom < max_zoom {
            let target = self.map.layer_point_to_lat_lng(centroid);
            let target_zoom = (zoom + CLUSTER_ZOOM_STEP).min(max_zoom);
            let command = self.map.fly_to(target, target_zoom, CLUSTER_FLY_DURATION);
            self.pending.push(command);
            self.recompute();
            self.interaction = Interaction::Flying {
                target: self.map.center(),
                zoom: self.map.zoom(),
            };
        } else if self.group.spiderfy(&self.map, index, &self.markers).is_some() {
            self.interaction = Interaction::Spiderfied { cluster: index };
        }
        Ok(())
    }

    /// Makes `place_id` the active place, flies to it and fires its marker's select slot.
    pub fn select_place(&mut self, place_id: &str) -> Result<()> {
        let marker = self
            .markers
            .iter()
            .find(|m| m.place_id == place_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("place '{place_id}' is not visible"))?;
        let place = self
            .catalog
            .get(place_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown place '{place_id}'"))?;

        self.active = Some(place.id.clone());
        let zoom = self.map.zoom().max(MARKER_MIN_ZOOM);
        let command = self.map.fly_to(place.position(), zoom, MARKER_FLY_DURATION);
        self.pending.push(command);
        self.recompute();
        self.interaction = Interaction::Flying {
            target: self.map.center(),
            zoom: self.map.zoom(),
        };

        marker.select(&place);
        tracing::debug!(place = %place.id, "place selected");
        Ok(())
    }

    /// Replaces the visible marker set and refits the view.
    pub fn apply_filter(&mut self, filter: CategoryFilter) {
        self.filter = filter;
        let visible: Vec<Place> = self.catalog.filtered(filter).into_iter().cloned().collect();
        self.markers = visible
            .iter()
            .map(|place| Marker::new(place, self.on_select.clone()))
            .collect();

        let still_visible = self
            .active
            .as_deref()
            .is_some_and(|id| visible.iter().any(|p| p.id == id));
        if !still_visible {
            self.active = visible.first().map(|p| p.id.clone());
        }

        let all_bounds = self.catalog.bounds();
        let fit = card_fit_options();
        match (filter, visible.as_slice()) {
            (CategoryFilter::All, _) => {
                if let Some(bounds) = all_bounds {
                    self.pending.push(self.map.fit_bounds(&bounds, fit));
                }
            }
            (_, []) => {}
            (_, [only]) => {
                self.pending.push(self.map.fly_to(
                    only.position(),
                    SINGLE_FOCUS_ZOOM,
                    SINGLE_FOCUS_DURATION,
                ));
                if let Some(bounds) = all_bounds {
                    self.pending.push(self.map.fit_bounds(&bounds, fit));
                }
            }
            (_, many) => {
                if let Some(bounds) = LatLngBounds::from_points(many.iter().map(Place::position)) {
                    self.pending.push(self.map.fit_bounds(&bounds, fit));
                }
            }
        }

        self.interaction = Interaction::Idle;
        self.recompute();
        tracing::debug!(filter = %filter, visible = self.markers.len(), "category filter applied");
    }

    /// Applies a finished boundary load. Failures fall back to the fixed box.
    pub fn apply_boundary(&mut self, result: Result<FeatureCollection>) {
        if !self.is_mounted() {
            return;
        }

        match result {
            Ok(collection) => {
                let bounds = collection.bounds();
                let target = bounds
                    .map(|b| b.pad(BOUNDARY_PAD))
                    .unwrap_or_else(fallback_bounds);
                self.pending.push(self.map.fit_bounds(&target, FitOptions::default()));
                self.boundary = BoundaryState::Loaded {
                    feature_count: collection.features.len(),
                    bounds,
                    style: BoundaryStyle::default(),
                };
            }
            Err(e) => {
                tracing::debug!("boundary overlay unavailable, using fallback bounds: {e:#}");
                let bounds = fallback_bounds();
                self.pending.push(self.map.fit_bounds(&bounds, FitOptions::default()));
                self.boundary = BoundaryState::Fallback { bounds };
            }
        }
        self.recompute();
    }

    /// Snapshot of the current state, without draining pending view commands.
    pub fn frame(&self) -> MapFrame {
        self.build_frame(Vec::new())
    }

    /// Snapshot of the current state carrying the view commands issued since the last frame.
    pub fn take_frame(&mut self) -> MapFrame {
        let commands = std::mem::take(&mut self.pending);
        self.build_frame(commands)
    }

    fn build_frame(&self, commands: Vec<ViewCommand>) -> MapFrame {
        let layers = if self.is_mounted() {
            render_clusters(
                &self.map,
                self.group.clusters(),
                &self.markers,
                self.filter,
                self.active.as_deref(),
            )
        } else {
            Vec::new()
        };

        MapFrame {
            generation: self.group.generation(),
            mounted: self.is_mounted(),
            view: self.map.state(),
            filter: self.filter,
            interaction: self.interaction,
            layers,
            spider: self.group.spider().cloned(),
            active: self.active_place().map(InfoCard::from),
            boundary: self.boundary.clone(),
            commands,
        }
    }
}

impl Drop for MapWidget {
    fn drop(&mut self) {
        self.unmount();
    }
}
