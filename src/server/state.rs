use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::boundary::BoundarySource;
use crate::i18n::Translations;
use crate::settings::Settings;
use crate::widget::MapWidget;
use super::events::MapUpdate;

// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub widget: Arc<Mutex<MapWidget>>,
    pub settings: Arc<Mutex<Settings>>,
    /// Where settings changes are persisted; `None` keeps them in memory.
    pub settings_path: Option<PathBuf>,
    pub translations: Arc<Translations>,
    pub boundary: Arc<dyn BoundarySource>,
    pub event_sender: broadcast::Sender<MapUpdate>,
}

impl AppState {
    pub fn widget(&self) -> MutexGuard<'_, MapWidget> {
        self.widget.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn settings(&self) -> MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }
}
