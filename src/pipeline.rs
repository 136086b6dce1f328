use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::cache::{Clock, ResultCache};
use crate::constants::{MAX_DENSITY, MAX_GRID_SIZE, RAINMAP_TIMESTAMP_FORMAT};
use crate::error::PipelineError;
use crate::fetcher::PointFetcher;
use crate::grid::generate_grid;
use crate::interpolate::{interpolate, Strategy};
use crate::sampler::sample;
use crate::types::{CacheKey, RainMap};

pub struct RainMapPipeline {
    fetcher: Arc<dyn PointFetcher>,
    workers: usize,
    strategy: Strategy,
    clock: Arc<dyn Clock>,
    max_grid_size: i64,
    max_density: i64,
}

impl RainMapPipeline {
    pub fn new(
        fetcher: Arc<dyn PointFetcher>,
        workers: usize,
        strategy: Strategy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            workers,
            strategy,
            clock,
            max_grid_size: MAX_GRID_SIZE,
            max_density: MAX_DENSITY,
        }
    }

    /// Caps `grid_size` and `density`. Larger requests are rejected as invalid.
    pub fn with_limits(mut self, max_grid_size: i64, max_density: i64) -> Self {
        self.max_grid_size = max_grid_size;
        self.max_density = max_density;
        self
    }

    /// Samples the grid and interpolates it. Inputs are checked before any
    /// upstream request goes out.
    pub async fn run(&self, key: CacheKey) -> Result<RainMap, PipelineError> {
        if key.density <= 0 {
            return Err(PipelineError::InvalidInput(format!(
                "density must be a positive integer, got {}",
                key.density
            )));
        }
        if key.grid_size > self.max_grid_size {
            return Err(PipelineError::InvalidInput(format!(
                "grid_size must be at most {}, got {}",
                self.max_grid_size, key.grid_size
            )));
        }
        if key.density > self.max_density {
            return Err(PipelineError::InvalidInput(format!(
                "density must be at most {}, got {}",
                self.max_density, key.density
            )));
        }
        let grid = generate_grid(key.grid_size)?;

        let started = Instant::now();
        let observations = sample(self.fetcher.as_ref(), &grid, self.workers).await;
        let sampled_in = started.elapsed();

        let original_points = observations.len();
        let density = key.density;
        let strategy = self.strategy;
        let data = tokio::task::spawn_blocking(move || interpolate(&observations, density, strategy))
            .await
            .map_err(|error| {
                PipelineError::Computation(format!("interpolation task failed: {error}"))
            })??;

        let expected = (density as usize).pow(2);
        if data.len() != expected {
            return Err(PipelineError::Computation(format!(
                "expected {expected} interpolated cells, produced {}",
                data.len()
            )));
        }

        info!(
            "Rain map {key}: {original_points} points sampled in {:.2?}, {} cells in {:.2?}",
            sampled_in,
            data.len(),
            started.elapsed() - sampled_in
        );

        Ok(RainMap {
            timestamp: self.clock.now().format(RAINMAP_TIMESTAMP_FORMAT).to_string(),
            original_points,
            interpolated_points: data.len(),
            data,
        })
    }
}

/// Serves `key` from the cache, running the pipeline on a miss.
pub async fn cached_rain_map(
    cache: &ResultCache,
    pipeline: &RainMapPipeline,
    key: CacheKey,
) -> Result<Arc<RainMap>, PipelineError> {
    let requested_at = cache.now();
    if let Some(map) = cache.get(key).await {
        info!("Rain map cache hit for {key}");
        return Ok(map);
    }

    info!("Rain map cache miss for {key}, recomputing");
    let map = pipeline.run(key).await?;
    Ok(cache.put(key, map, requested_at).await)
}
