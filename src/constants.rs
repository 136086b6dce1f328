pub const OPEN_METEO_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const OPEN_METEO_CURRENT_FIELD: &str = "rain";

pub const GRID_MIN_LAT: f64 = 14.5;
pub const GRID_MAX_LAT: f64 = 32.75;
pub const GRID_MIN_LON: f64 = -118.0;
pub const GRID_MAX_LON: f64 = -86.5;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const IDW_POWER: i32 = 2;
pub const MIN_DISTANCE_KM: f64 = 1e-6;

pub const DEFAULT_GRID_SIZE: i64 = 15;
pub const DEFAULT_DENSITY: i64 = 50;
pub const MAX_GRID_SIZE: i64 = 50;
pub const MAX_DENSITY: i64 = 500;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_DATA_DIR: &str = "../../../Data/Data";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 15;
pub const DEFAULT_FALLBACK_DELAY_MS: u64 = 1000;
pub const DEFAULT_SAMPLER_WORKERS: usize = 4;
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 600;

pub const RAINMAP_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const ARCHIVE_JSON_DIR: &str = "JSON";
pub const ARCHIVE_MAPS_DIR: &str = "Mapas";
pub const STORM_SUMMARY_PREFIX: &str = "tormentas";
pub const STORM_DOCUMENT_PREFIX: &str = "tormenta_";
pub const GENERAL_MAP_PREFIX: &str = "mapa_";
