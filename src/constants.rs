// Feed configuration
pub const DEFAULT_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_week.geojson";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Port configuration
pub const DEFAULT_PORT: u16 = 3001;

// Initial map view (North America)
pub const DEFAULT_CENTER_LAT: f64 = 48.10;
pub const DEFAULT_CENTER_LNG: f64 = -100.10;
pub const DEFAULT_ZOOM: u8 = 4;

// Background tiles
pub const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

// Circle styling. Radius is in meters, as Leaflet circles expect.
pub const RADIUS_PER_MAGNITUDE: f64 = 10_000.0;
pub const DEFAULT_MIN_RADIUS: f64 = 1_000.0;
pub const STROKE_COLOR: &str = "black";
pub const STROKE_WEIGHT: f64 = 0.5;
pub const FILL_OPACITY: f64 = 0.5;

pub const LEGEND_POSITION: &str = "bottomright";
