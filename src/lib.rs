//! JoinJoy Krabi map: marker clustering, spiderfy, category filtering and a
//! best-effort boundary overlay, driven over HTTP by a Leaflet front-end.

pub mod assets;
pub mod boundary;
pub mod cluster;
pub mod constants;
pub mod geo;
pub mod geojson;
pub mod i18n;
pub mod map_view;
pub mod marker;
pub mod places;
pub mod render;
pub mod server;
pub mod settings;
pub mod spiderfy;
pub mod utils;
pub mod widget;
