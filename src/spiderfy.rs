use serde::Serialize;

use crate::constants::{SPIDER_LINE_COLOR, SPIDER_LINE_OPACITY, SPIDER_LINE_WEIGHT};
use crate::geo::{LatLng, Point};
use crate::map_view::MapView;
use crate::marker::Marker;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: &'static str,
    pub weight: f64,
    pub opacity: f64,
}

impl Default for LineStyle {
    fn default() -> Self {
        LineStyle {
            color: SPIDER_LINE_COLOR,
            weight: SPIDER_LINE_WEIGHT,
            opacity: SPIDER_LINE_OPACITY,
        }
    }
}

/// One fanned-out marker and the line tying it to the cluster center.
#[derive(Debug, Clone, Serialize)]
pub struct SpiderLeg {
    pub angle: f64,
    pub point: Point,
    pub line: [LatLng; 2],
    pub marker: Marker,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpiderLayer {
    pub center: LatLng,
    pub center_point: Point,
    pub radius: f64,
    pub line_style: LineStyle,
    pub legs: Vec<SpiderLeg>,
}

impl SpiderLayer {
    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn leg_for(&self, place_id: &str) -> Option<&SpiderLeg> {
        self.legs.iter().find(|leg| leg.marker.place_id == place_id)
    }
}

/// Lays `members` out on a circle of `radius` pixels around `center`, leg i
/// at angle `i * 2pi / n`. Each leg keeps its marker's popup and select slot.
pub fn spiderfy(map: &MapView, center: LatLng, members: &[&Marker], radius: f64) -> SpiderLayer {
    let center_point = map.lat_lng_to_layer_point(center);
    let step = std::f64::consts::TAU / members.len().max(1) as f64;

    let legs = members
        .iter()
        .enumerate()
        .map(|(index, marker)| {
            let angle = step * index as f64;
            let point = Point::new(
                center_point.x + radius * angle.cos(),
                center_point.y + radius * angle.sin(),
            );
            let position = map.layer_point_to_lat_lng(point);
            SpiderLeg {
                angle,
                point,
                line: [center, position],
                marker: marker.moved_to(position),
            }
        })
        .collect();

    SpiderLayer {
        center,
        center_point,
        radius,
        line_style: LineStyle::default(),
        legs,
    }
}
