use serde::Serialize;
use std::collections::BTreeMap;

use crate::cluster::Cluster;
use crate::constants::{DEFAULT_CLUSTER_COLOR, MIXED_CLUSTER_GRADIENT};
use crate::geo::{LatLng, Point};
use crate::map_view::MapView;
use crate::marker::Marker;
use crate::places::{Category, CategoryFilter};

const MARKER_ICON_SIZE: [u32; 2] = [28, 28];
const MARKER_ICON_ANCHOR: [u32; 2] = [14, 26];
const CLUSTER_ICON_SIZE: [u32; 2] = [40, 40];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerIcon {
    pub color: &'static str,
    pub active: bool,
    pub size: [u32; 2],
    pub anchor: [u32; 2],
}

impl MarkerIcon {
    pub fn for_category(category: Category, active: bool) -> Self {
        MarkerIcon {
            color: category.color(),
            active,
            size: MARKER_ICON_SIZE,
            anchor: MARKER_ICON_ANCHOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeFill {
    Gradient { colors: Vec<&'static str> },
    Solid { color: &'static str },
}

/// Drawable item for one cluster of the current pass.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedLayer {
    Marker {
        marker: Marker,
        icon: MarkerIcon,
    },
    Cluster {
        index: usize,
        position: LatLng,
        point: Point,
        count: usize,
        size: [u32; 2],
        fill: BadgeFill,
        members: Vec<String>,
    },
}

/// Most frequent category. Ties go to the category declared first.
pub fn dominant_category<I>(categories: I) -> Option<Category>
where
    I: IntoIterator<Item = Category>,
{
    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    for category in categories {
        *counts.entry(category).or_insert(0) += 1;
    }

    let mut best: Option<(Category, usize)> = None;
    for (category, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((category, count));
        }
    }
    best.map(|(category, _)| category)
}

pub fn badge_fill(categories: &[Category], filter: CategoryFilter) -> BadgeFill {
    let mixed = categories.iter().any(|c| Some(c) != categories.first());

    if filter == CategoryFilter::All && mixed {
        return BadgeFill::Gradient {
            colors: MIXED_CLUSTER_GRADIENT.to_vec(),
        };
    }

    let color = match dominant_category(categories.iter().copied()) {
        Some(Category::Unknown) | None => DEFAULT_CLUSTER_COLOR,
        Some(category) => category.color(),
    };
    BadgeFill::Solid { color }
}

/// Turns one clustering pass into drawable layers. Singletons become plain
/// markers, everything else a count badge at the centroid.
pub fn render_clusters(
    map: &MapView,
    clusters: &[Cluster],
    markers: &[Marker],
    filter: CategoryFilter,
    active: Option<&str>,
) -> Vec<RenderedLayer> {
    clusters
        .iter()
        .enumerate()
        .filter_map(|(index, cluster)| {
            let members: Vec<&Marker> = cluster
                .members
                .iter()
                .filter_map(|&i| markers.get(i))
                .collect();

            match members.as_slice() {
                [] => None,
                [marker] => Some(RenderedLayer::Marker {
                    icon: MarkerIcon::for_category(
                        marker.category,
                        active == Some(marker.place_id.as_str()),
                    ),
                    marker: (*marker).clone(),
                }),
                _ => {
                    let categories: Vec<Category> = members.iter().map(|m| m.category).collect();
                    Some(RenderedLayer::Cluster {
                        index,
                        position: map.layer_point_to_lat_lng(cluster.centroid),
                        point: cluster.centroid,
                        count: members.len(),
                        size: CLUSTER_ICON_SIZE,
                        fill: badge_fill(&categories, filter),
                        members: members.iter().map(|m| m.place_id.clone()).collect(),
                    })
                }
            }
        })
        .collect()
}
