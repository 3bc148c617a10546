//! Minimal GeoJSON reader for the boundary overlay. Positions are
//! `[lng, lat]` (extra ordinates ignored).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geo::{LatLng, LatLngBounds};

pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    fn collect_positions(&self, out: &mut Vec<LatLng>) {
        match self {
            Geometry::Point { coordinates } => push_position(out, coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                for pos in coordinates {
                    push_position(out, pos);
                }
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                for pos in coordinates.iter().flatten() {
                    push_position(out, pos);
                }
            }
            Geometry::MultiPolygon { coordinates } => {
                for pos in coordinates.iter().flatten().flatten() {
                    push_position(out, pos);
                }
            }
            Geometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.collect_positions(out);
                }
            }
        }
    }
}

fn push_position(out: &mut Vec<LatLng>, pos: &Position) {
    if let [lng, lat, ..] = pos.as_slice() {
        out.push(LatLng::new(*lat, *lng));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn parse(raw: &str) -> Result<Self> {
        let collection: FeatureCollection =
            serde_json::from_str(raw).context("Failed to parse GeoJSON")?;
        if collection.kind != "FeatureCollection" {
            anyhow::bail!("Expected a FeatureCollection, found '{}'", collection.kind);
        }
        Ok(collection)
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounds of every position in every feature, `None` if there are none.
    pub fn bounds(&self) -> Option<LatLngBounds> {
        let mut positions = Vec::new();
        for geometry in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            geometry.collect_positions(&mut positions);
        }
        LatLngBounds::from_points(positions)
    }
}
