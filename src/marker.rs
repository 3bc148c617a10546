use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::geo::LatLng;
use crate::places::{Category, Place};

/// Callback fired when a place marker is selected.
pub type SelectHandler = Arc<dyn Fn(&Place) + Send + Sync>;

/// Popup text bound to a marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub title: String,
    pub body: String,
}

/// Map marker for one place. The select slot is fixed at creation and travels
/// with every copy, so spiderfied duplicates fire the same handler.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub place_id: String,
    pub position: LatLng,
    pub category: Category,
    pub popup: Popup,
    #[serde(skip)]
    on_select: Option<SelectHandler>,
}

impl Marker {
    pub fn new(place: &Place, on_select: Option<SelectHandler>) -> Self {
        Marker {
            place_id: place.id.clone(),
            position: place.position(),
            category: place.category,
            popup: Popup {
                title: place.name.clone(),
                body: place.short_description.clone(),
            },
            on_select,
        }
    }

    /// Same marker placed at another position.
    pub fn moved_to(&self, position: LatLng) -> Self {
        Marker {
            position,
            ..self.clone()
        }
    }

    #[cfg(test)]
    pub(crate) fn has_select_handler(&self) -> bool {
        self.on_select.is_some()
    }

    pub fn select(&self, place: &Place) {
        if let Some(handler) = &self.on_select {
            handler(place);
        }
    }

    #[cfg(test)]
    pub(crate) fn shares_handler_with(&self, other: &Marker) -> bool {
        match (&self.on_select, &other.on_select) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marker")
            .field("place_id", &self.place_id)
            .field("position", &self.position)
            .field("category", &self.category)
            .field("on_select", &self.on_select.is_some())
            .finish()
    }
}
