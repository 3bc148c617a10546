//! Greedy screen-space clustering.
//!
//! One pass over the markers in insertion order: each point joins the first
//! cluster (in creation order) whose running centroid lies within the radius,
//! otherwise it starts a new cluster. Not nearest-fit; the result depends on
//! input order. Centroids drift as members join, so early members may end up
//! farther than the radius from the final centroid.

use crate::constants::{DEFAULT_MAX_CLUSTER_RADIUS, DEFAULT_SPIDERFY_MULTIPLIER, SPIDERFY_BASE_RADIUS};
use crate::geo::Point;
use crate::map_view::{ListenerId, MapEventKind, MapView};
use crate::marker::Marker;
use crate::spiderfy::{self, SpiderLayer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    pub max_cluster_radius: f64,
    pub spiderfy_distance_multiplier: f64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            max_cluster_radius: DEFAULT_MAX_CLUSTER_RADIUS,
            spiderfy_distance_multiplier: DEFAULT_SPIDERFY_MULTIPLIER,
        }
    }
}

impl ClusterOptions {
    /// Spider circle radius in pixels; a non-positive multiplier counts as 1.
    pub fn spider_radius(&self) -> f64 {
        let multiplier = if self.spiderfy_distance_multiplier > 0.0 {
            self.spiderfy_distance_multiplier
        } else {
            1.0
        };
        SPIDERFY_BASE_RADIUS * multiplier
    }
}

/// Markers grouped by one pass. `members` index into the pass input.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub centroid: Point,
    pub members: Vec<usize>,
}

impl Cluster {
    fn singleton(index: usize, point: Point) -> Self {
        Cluster {
            centroid: point,
            members: vec![index],
        }
    }

    fn insert(&mut self, index: usize, point: Point) {
        let n = self.members.len() as f64;
        self.centroid = Point::new(
            (self.centroid.x * n + point.x) / (n + 1.0),
            (self.centroid.y * n + point.y) / (n + 1.0),
        );
        self.members.push(index);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Clusters already-projected points.
pub fn cluster_points(points: &[Point], radius: f64) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for (index, &point) in points.iter().enumerate() {
        match clusters
            .iter_mut()
            .find(|cluster| cluster.centroid.distance_to(point) <= radius)
        {
            Some(cluster) => cluster.insert(index, point),
            None => clusters.push(Cluster::singleton(index, point)),
        }
    }

    clusters
}

/// Projects `items` and clusters them.
pub fn cluster_by<T, F>(items: &[T], radius: f64, project: F) -> Vec<Cluster>
where
    F: Fn(&T) -> Point,
{
    let points: Vec<Point> = items.iter().map(project).collect();
    cluster_points(&points, radius)
}

/// Marker cluster group bound to one map view. Holds the cluster layer and
/// the spider layer for the current frame.
#[derive(Debug, Default)]
pub struct ClusterGroup {
    options: ClusterOptions,
    listeners: Vec<ListenerId>,
    clusters: Vec<Cluster>,
    spider: Option<SpiderLayer>,
    generation: u64,
}

impl ClusterGroup {
    pub fn new(options: ClusterOptions) -> Self {
        ClusterGroup {
            options,
            ..ClusterGroup::default()
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Subscribes to the view's zoom-end and move-end events.
    pub fn add_to(&mut self, map: &mut MapView) {
        if self.is_attached() {
            return;
        }
        self.listeners.push(map.on(MapEventKind::ZoomEnd));
        self.listeners.push(map.on(MapEventKind::MoveEnd));
    }

    /// Unsubscribes from `map` and drops both layers.
    pub fn remove(&mut self, map: &mut MapView) {
        for id in self.listeners.drain(..) {
            map.off(id);
        }
        self.clear_layers();
    }

    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Whether `kind` on `map` should trigger a rebuild of this group.
    pub fn listens_to(&self, map: &MapView, kind: MapEventKind) -> bool {
        self.listeners.iter().any(|&id| map.is_listening(id, kind))
    }

    pub fn clear_layers(&mut self) {
        self.clusters.clear();
        self.spider = None;
    }

    /// Recomputes clusters for `markers` under the current view. Both layers
    /// are cleared first; a detached group yields nothing.
    pub fn rebuild(&mut self, map: &MapView, markers: &[Marker]) -> &[Cluster] {
        self.clear_layers();
        self.generation += 1;

        if !self.is_attached() || map.is_destroyed() {
            return &self.clusters;
        }

        self.clusters = cluster_by(markers, self.options.max_cluster_radius, |marker| {
            map.lat_lng_to_layer_point(marker.position)
        });

        tracing::debug!(
            markers = markers.len(),
            clusters = self.clusters.len(),
            zoom = map.zoom(),
            "rebuilt marker clusters"
        );

        &self.clusters
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Incremented on every rebuild; cluster indices are only valid within one generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fans the members of cluster `index` out around its centroid, replacing
    /// any previous spider layer. Singletons are never spiderfied.
    pub fn spiderfy(&mut self, map: &MapView, index: usize, markers: &[Marker]) -> Option<&SpiderLayer> {
        let cluster = self.clusters.get(index)?;
        if cluster.is_singleton() {
            return None;
        }

        self.spider = None;
        let members: Vec<&Marker> = cluster
            .members
            .iter()
            .filter_map(|&i| markers.get(i))
            .collect();
        let center = map.layer_point_to_lat_lng(cluster.centroid);
        let layer = spiderfy::spiderfy(map, center, &members, self.options.spider_radius());
        self.spider = Some(layer);
        self.spider.as_ref()
    }

    pub fn spider(&self) -> Option<&SpiderLayer> {
        self.spider.as_ref()
    }

    pub fn unspiderfy(&mut self) -> bool {
        self.spider.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_view::MapOptions;
    use crate::places::krabi_places;

    fn line_of_points(count: usize, spacing: f64) -> Vec<Point> {
        (0..count)
            .map(|i| Point::new(100.0 + spacing * i as f64, 200.0))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(cluster_points(&[], 60.0).is_empty());
    }

    #[test]
    fn test_single_point() {
        let clusters = cluster_points(&[Point::new(5.0, 5.0)], 60.0);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].is_singleton());
        assert_eq!(clusters[0].centroid, Point::new(5.0, 5.0));
    }

    #[test]
    fn test_five_points_thirty_px_apart() {
        // Pentagon with 30px sides: neighbours are 30px apart
        let circumradius = 30.0 / (2.0 * (std::f64::consts::PI / 5.0).sin());
        let points: Vec<Point> = (0..5)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / 5.0;
                Point::new(300.0 + circumradius * angle.cos(), 300.0 + circumradius * angle.sin())
            })
            .collect();
        assert!((points[0].distance_to(points[1]) - 30.0).abs() < 1e-9);

        let clusters = cluster_points(&points, 60.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1, 2, 3, 4]);
        assert!(clusters[0].centroid.distance_to(Point::new(300.0, 300.0)) < 1e-9);
    }

    #[test]
    fn test_centroid_drift_splits_long_lines() {
        // The running centroid trails behind, so the fifth point of a straight line is out of reach
        let points = line_of_points(5, 30.0);
        let clusters = cluster_points(&points, 60.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![0, 1, 2, 3]);
        assert_eq!(clusters[0].centroid, Point::new(145.0, 200.0));
        assert_eq!(clusters[1].members, vec![4]);
    }

    #[test]
    fn test_far_points_stay_apart() {
        let points = vec![Point::new(0.0, 0.0), Point::new(200.0, 0.0), Point::new(0.0, 200.0)];
        let clusters = cluster_points(&points, 60.0);
        assert_eq!(clusters.len(), 3);
        assert!(clusters.iter().all(Cluster::is_singleton));
    }

    #[test]
    fn test_radius_is_inclusive() {
        let points = vec![Point::new(0.0, 0.0), Point::new(60.0, 0.0)];
        assert_eq!(cluster_points(&points, 60.0).len(), 1);
        let points = vec![Point::new(0.0, 0.0), Point::new(60.5, 0.0)];
        assert_eq!(cluster_points(&points, 60.0).len(), 2);
    }

    #[test]
    fn test_first_fit_not_nearest_fit() {
        // Point 2 is closer to cluster B but still within range of A, which was created first
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(55.0, 0.0),
        ];
        let clusters = cluster_points(&points, 60.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![0, 2]);
        assert_eq!(clusters[1].members, vec![1]);
    }

    #[test]
    fn test_insertion_invariant_and_partition() {
        // Pseudo-random but fixed scatter
        let points: Vec<Point> = (0..80)
            .map(|i| {
                let f = i as f64;
                Point::new((f * 37.0) % 400.0, (f * 91.0) % 300.0)
            })
            .collect();
        let radius = 60.0;
        let clusters = cluster_points(&points, radius);

        // Every index appears exactly once
        let mut seen: Vec<usize> = clusters.iter().flat_map(|c| c.members.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..points.len()).collect::<Vec<_>>());

        // Replay insertions: each member was within radius of the centroid at the time
        for cluster in &clusters {
            let mut centroid = points[cluster.members[0]];
            for (n, &index) in cluster.members.iter().enumerate().skip(1) {
                assert!(centroid.distance_to(points[index]) <= radius);
                let k = n as f64;
                centroid = Point::new(
                    (centroid.x * k + points[index].x) / (k + 1.0),
                    (centroid.y * k + points[index].y) / (k + 1.0),
                );
            }
            assert_eq!(centroid, cluster.centroid);
        }

        // Deterministic for unchanged input
        assert_eq!(cluster_points(&points, radius), clusters);
    }

    #[test]
    fn test_group_lifecycle() {
        let mut map = MapView::new(MapOptions::default());
        let places = krabi_places();
        let markers: Vec<Marker> = places.iter().map(|p| Marker::new(p, None)).collect();

        let mut group = ClusterGroup::new(ClusterOptions::default());
        assert!(group.rebuild(&map, &markers).is_empty());

        group.add_to(&mut map);
        group.add_to(&mut map);
        assert_eq!(map.listener_count(), 2);
        assert!(group.listens_to(&map, MapEventKind::ZoomEnd));
        assert!(group.listens_to(&map, MapEventKind::MoveEnd));

        let total: usize = group.rebuild(&map, &markers).iter().map(Cluster::len).sum();
        assert_eq!(total, markers.len());
        let generation = group.generation();

        group.remove(&mut map);
        assert_eq!(map.listener_count(), 0);
        assert!(group.clusters().is_empty());
        assert!(!group.listens_to(&map, MapEventKind::ZoomEnd));
        assert!(generation > 0);
    }

    #[test]
    fn test_spiderfy_skips_singletons() {
        let mut map = MapView::new(MapOptions::default());
        let places = krabi_places();
        let markers = vec![Marker::new(&places[0], None)];
        let mut group = ClusterGroup::new(ClusterOptions::default());
        group.add_to(&mut map);
        group.rebuild(&map, &markers);

        assert!(group.spiderfy(&map, 0, &markers).is_none());
        assert!(group.spiderfy(&map, 7, &markers).is_none());
        assert!(group.spider().is_none());
    }

    #[test]
    fn test_spider_radius_multiplier() {
        let mut options = ClusterOptions::default();
        assert_eq!(options.spider_radius(), 35.0);
        options.spiderfy_distance_multiplier = 2.0;
        assert_eq!(options.spider_radius(), 70.0);
        options.spiderfy_distance_multiplier = 0.0;
        assert_eq!(options.spider_radius(), 35.0);
    }
}
