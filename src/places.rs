use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::constants::{COLOR_BEACH, COLOR_ISLAND, COLOR_SNORKEL, COLOR_SUNSET, DEFAULT_MARKER_COLOR};
use crate::geo::{LatLng, LatLngBounds};

/// Place category. Declaration order is also the priority used to break
/// ties when picking a cluster's dominant category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Beach,
    Island,
    Snorkel,
    Sunset,
    #[serde(other)]
    Unknown,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Beach,
        Category::Island,
        Category::Snorkel,
        Category::Sunset,
    ];

    pub fn color(&self) -> &'static str {
        match self {
            Category::Beach => COLOR_BEACH,
            Category::Island => COLOR_ISLAND,
            Category::Snorkel => COLOR_SNORKEL,
            Category::Sunset => COLOR_SUNSET,
            Category::Unknown => DEFAULT_MARKER_COLOR,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Category::Beach => "beach",
            Category::Island => "island",
            Category::Snorkel => "snorkel",
            Category::Sunset => "sunset",
            Category::Unknown => "unknown",
        }
    }
}

/// Which places are visible on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(selected) => *selected == category,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Only(category) => category.key(),
        }
    }

    /// Filter buttons in display order.
    pub fn options() -> Vec<CategoryFilter> {
        std::iter::once(CategoryFilter::All)
            .chain(Category::ALL.into_iter().map(CategoryFilter::Only))
            .collect()
    }
}

impl FromStr for CategoryFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(CategoryFilter::All),
            "beach" => Ok(CategoryFilter::Only(Category::Beach)),
            "island" => Ok(CategoryFilter::Only(Category::Island)),
            "snorkel" => Ok(CategoryFilter::Only(Category::Snorkel)),
            "sunset" => Ok(CategoryFilter::Only(Category::Sunset)),
            other => anyhow::bail!("Unknown category filter '{other}'"),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for CategoryFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for CategoryFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// A point of interest shown on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub lat: f64,
    pub lng: f64,
    pub highlight_tag: String,
    pub short_description: String,
}

impl Place {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Immutable, insertion-ordered list of places.
#[derive(Debug, Clone)]
pub struct PlaceCatalog {
    places: Vec<Place>,
}

impl PlaceCatalog {
    pub fn new(places: Vec<Place>) -> Result<Self> {
        for (i, place) in places.iter().enumerate() {
            if places[..i].iter().any(|p| p.id == place.id) {
                anyhow::bail!("Duplicate place id '{}'", place.id);
            }
            if !(-90.0..=90.0).contains(&place.lat) || !(-180.0..=180.0).contains(&place.lng) {
                anyhow::bail!("Place '{}' has coordinates out of range", place.id);
            }
        }
        Ok(PlaceCatalog { places })
    }

    /// Loads a JSON array of places, e.g. a catalog override from settings.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read places file {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let places: Vec<Place> =
            serde_json::from_str(raw).context("Failed to parse places catalog")?;
        Self::new(places)
    }

    pub fn all(&self) -> &[Place] {
        &self.places
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    /// Places passing `filter`, in catalog order.
    pub fn filtered(&self, filter: CategoryFilter) -> Vec<&Place> {
        self.places
            .iter()
            .filter(|p| filter.matches(p.category))
            .collect()
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(self.places.iter().map(Place::position))
    }
}

impl Default for PlaceCatalog {
    fn default() -> Self {
        PlaceCatalog {
            places: krabi_places(),
        }
    }
}

fn place(
    id: &str,
    name: &str,
    category: Category,
    (lat, lng): (f64, f64),
    highlight_tag: &str,
    short_description: &str,
) -> Place {
    Place {
        id: id.to_string(),
        name: name.to_string(),
        category,
        lat,
        lng,
        highlight_tag: highlight_tag.to_string(),
        short_description: short_description.to_string(),
    }
}

/// Built-in Krabi highlights.
pub fn krabi_places() -> Vec<Place> {
    use Category::*;
    vec![
        place("ao-nang", "Ao Nang", Beach, (8.0404, 98.8222), "Starting Point",
            "Main beach and pier for most JoinJoy trips."),
        place("railay", "Railay Beach", Beach, (8.0117, 98.8395), "Cliff & Sunset",
            "Famous cliffs, sunset views, and chill beach vibes."),
        place("phi-phi", "Phi Phi Islands", Island, (7.7407, 98.7765), "Island Hopping",
            "Iconic islands with turquoise water and snorkeling."),
        place("hong", "Hong Island", Snorkel, (8.1089, 98.7021), "Lagoon",
            "Stunning lagoon with calm water and kayaking."),
        place("thale-waek", "Thale Waek", Snorkel, (7.99, 98.8144), "Sandbar",
            "Famous sandbar that appears at low tide."),
        place("ao-nang-sunset", "Ao Nang Beach Sunset", Sunset, (8.031669881889947, 98.8216320402158),
            "Sunset Point", "Iconic Ao Nang sunset with fire shows and a lively beachfront."),
        place("nopparat-sunset", "Nopparat Thara Beach Sunset", Sunset, (8.042996646771988, 98.80915062374889),
            "Sunset Point", "Quiet sunset spot near the Landmark night market with fewer crowds."),
        place("railay-west-sunset", "Railay West Sunset", Sunset, (8.011867631403003, 98.83779902910392),
            "Sunset Point", "Magical sunsets surrounded by dramatic limestone cliffs."),
        place("din-daeng-doi", "Din Daeng Doi Viewpoint", Sunset, (8.110198323318548, 98.78414908067876),
            "Viewpoint", "Hilltop viewpoint offering sunrise, sunset, and sea-fog scenes."),
        place("klong-muang-beach", "Klong Muang Beach Sunset", Sunset, (8.055302121766385, 98.75930705734284),
            "Sunset Point", "Peaceful beach with calm waves and a relaxed sunset atmosphere."),
        place("tub-kaek-sunset", "Tub Kaek Beach Sunset", Sunset, (8.091723042677, 98.74713314218624),
            "Sunset Point", "Stunning sunset view facing the Hong Islands in a serene setting."),
        place("khao-thong-hill", "Khao Thong Hill Sunset", Sunset, (8.172984889255703, 98.75259315296445),
            "Viewpoint Café", "Panoramic sunset viewpoint overlooking Hong Islands with café."),
        place("buffalo-nose-cape", "Buffalo Nose Cape", Sunset, (8.136152250559762, 98.7355327106346),
            "Adventure Spot", "Dramatic natural stone arches with a remote, scenic sunset view."),
        place("klong-khong-lanta", "Klong Khong Beach, Koh Lanta", Sunset, (7.641664479012308, 99.02819773848144),
            "Sunset Point", "One of Koh Lanta's best sunset beaches along a long peaceful shore."),
    ]
}
