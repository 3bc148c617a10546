// Port configuration
pub const DEFAULT_PORT: u16 = 3001;
pub const ALTERNATIVE_PORT: u16 = 3002;
pub const PORTS_TO_CHECK: &[u16] = &[DEFAULT_PORT, ALTERNATIVE_PORT];

// Clustering
pub const DEFAULT_MAX_CLUSTER_RADIUS: f64 = 60.0;
pub const SPIDERFY_BASE_RADIUS: f64 = 35.0;
pub const DEFAULT_SPIDERFY_MULTIPLIER: f64 = 1.0;

// Initial map view (Krabi town area)
pub const INITIAL_CENTER: (f64, f64) = (8.0863, 98.9063);
pub const INITIAL_ZOOM: f64 = 10.0;
pub const MIN_ZOOM: f64 = 8.0;
pub const MAX_ZOOM: f64 = 17.0;
pub const DEFAULT_VIEWPORT: (f64, f64) = (1024.0, 640.0);

// Hardcoded fallback box used when the border file can't be loaded: [south-west, north-east]
pub const FALLBACK_BOUNDS: [(f64, f64); 2] = [(7.4, 98.55), (8.4, 99.1)];
pub const MAX_BOUNDS_PAD: f64 = 0.15;
pub const BOUNDARY_PAD: f64 = 0.08;

// Fly-to parameters (durations in seconds)
pub const CLUSTER_FLY_DURATION: f64 = 0.35;
pub const MARKER_FLY_DURATION: f64 = 0.6;
pub const SINGLE_FOCUS_DURATION: f64 = 1.0;
pub const MARKER_MIN_ZOOM: f64 = 11.0;
pub const SINGLE_FOCUS_ZOOM: f64 = 14.0;
pub const CLUSTER_ZOOM_STEP: f64 = 2.0;

// Fit-bounds padding leaves room for the info card at the bottom
pub const CARD_PADDING_TOP_LEFT: (f64, f64) = (50.0, 50.0);
pub const CARD_PADDING_BOTTOM_RIGHT: (f64, f64) = (50.0, 220.0);
pub const CARD_FIT_MAX_ZOOM: f64 = 12.0;

// Colors
pub const COLOR_BEACH: &str = "#ffb347";
pub const COLOR_ISLAND: &str = "#00b894";
pub const COLOR_SNORKEL: &str = "#0984e3";
pub const COLOR_SUNSET: &str = "#e17055";
pub const DEFAULT_MARKER_COLOR: &str = "#0b69c4";
pub const DEFAULT_CLUSTER_COLOR: &str = "#444444";
pub const MIXED_CLUSTER_GRADIENT: &[&str] = &[COLOR_SUNSET, COLOR_ISLAND, COLOR_SNORKEL, COLOR_BEACH];

// Spider legs
pub const SPIDER_LINE_COLOR: &str = "#666";
pub const SPIDER_LINE_WEIGHT: f64 = 1.0;
pub const SPIDER_LINE_OPACITY: f64 = 0.7;

// Boundary overlay style
pub const BOUNDARY_STROKE: &str = "#0099ff";
pub const BOUNDARY_WEIGHT: f64 = 2.0;
pub const BOUNDARY_FILL: &str = "#e6f4ff";
pub const BOUNDARY_FILL_OPACITY: f64 = 0.18;
pub const BOUNDARY_ASSET: &str = "krabi-border.geojson";

// Tile provider
pub const TILE_URL_TEMPLATE: &str =
    "https://{s}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}{r}.png";
pub const TILE_MAX_ZOOM: u8 = 19;
pub const TILE_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";

// Locales
pub const DEFAULT_LOCALE: &str = "en";

// SSE
pub const EVENT_CHANNEL_CAPACITY: usize = 100;
pub const HEARTBEAT_SECS: u64 = 30;
