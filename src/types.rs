use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::archive::StormArchive;
use crate::cache::ResultCache;
use crate::pipeline::RainMapPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RainMapPipeline>,
    pub cache: Arc<ResultCache>,
    pub archive: Arc<StormArchive>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub coordinate: Coordinate,
    pub rain: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedCell {
    pub lat: f64,
    pub lon: f64,
    pub rain: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RainMap {
    pub timestamp: String,
    pub original_points: usize,
    pub interpolated_points: usize,
    pub data: Vec<InterpolatedCell>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub grid_size: i64,
    pub density: i64,
}

impl CacheKey {
    pub fn new(grid_size: i64, density: i64) -> Self {
        Self { grid_size, density }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.grid_size, self.density)
    }
}
