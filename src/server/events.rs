use serde::Serialize;
use tokio::sync::broadcast;

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::widget::{InfoCard, MapFrame};

// SSE event types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum MapUpdate {
    /// A new frame after an event or a finished boundary load.
    Frame(MapFrame),
    /// A place was selected through its marker.
    Selected(InfoCard),
    Locale { locale: String },
    Heartbeat { message: String },
}

pub fn event_channel() -> broadcast::Sender<MapUpdate> {
    let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    sender
}

/// Sends to every subscriber; having none is fine.
pub fn publish(sender: &broadcast::Sender<MapUpdate>, update: MapUpdate) {
    if sender.send(update).is_err() {
        tracing::trace!("no SSE subscribers for map update");
    }
}
