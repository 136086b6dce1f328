use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::constants::{
    DEFAULT_CACHE_TTL_SECONDS, DEFAULT_DATA_DIR, DEFAULT_FALLBACK_DELAY_MS, DEFAULT_LISTEN_ADDR,
    DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_SAMPLER_WORKERS, MAX_DENSITY, MAX_GRID_SIZE,
    OPEN_METEO_FORECAST_URL,
};
use crate::interpolate::Strategy;

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: String,
    pub forecast_url: String,
    pub request_timeout: Duration,
    pub fallback_delay: Duration,
    pub sampler_workers: usize,
    pub cache_ttl: Duration,
    pub strategy: Strategy,
    pub max_grid_size: i64,
    pub max_density: i64,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = env_string("RAINMAP_LISTEN_ADDR", DEFAULT_LISTEN_ADDR);
        let forecast_url = trim_base_url(&env_string(
            "RAINMAP_FORECAST_URL",
            OPEN_METEO_FORECAST_URL,
        ));
        let request_timeout = Duration::from_secs(env_u64(
            "RAINMAP_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?);
        let fallback_delay = Duration::from_millis(env_u64(
            "RAINMAP_FALLBACK_DELAY_MS",
            DEFAULT_FALLBACK_DELAY_MS,
        )?);
        let sampler_workers = env_usize("RAINMAP_SAMPLER_WORKERS", DEFAULT_SAMPLER_WORKERS)?;
        if sampler_workers == 0 {
            bail!("RAINMAP_SAMPLER_WORKERS must be at least 1");
        }
        let cache_ttl = Duration::from_secs(env_u64(
            "RAINMAP_CACHE_TTL_SECONDS",
            DEFAULT_CACHE_TTL_SECONDS,
        )?);
        let strategy = match env_optional("RAINMAP_IDW_NEIGHBORS") {
            Some(value) => {
                let neighbors = value.trim().parse::<usize>().with_context(|| {
                    format!("Failed to parse RAINMAP_IDW_NEIGHBORS={value} as usize")
                })?;
                if neighbors == 0 {
                    bail!("RAINMAP_IDW_NEIGHBORS must be at least 1");
                }
                Strategy::Nearest(neighbors)
            }
            None => Strategy::Global,
        };
        let max_grid_size = env_limit("RAINMAP_MAX_GRID_SIZE", MAX_GRID_SIZE)?;
        let max_density = env_limit("RAINMAP_MAX_DENSITY", MAX_DENSITY)?;
        let data_dir = PathBuf::from(env_string("RAINMAP_DATA_DIR", DEFAULT_DATA_DIR));

        Ok(Self {
            listen_addr,
            forecast_url,
            request_timeout,
            fallback_delay,
            sampler_workers,
            cache_ttl,
            strategy,
            max_grid_size,
            max_density,
            data_dir,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            forecast_url: OPEN_METEO_FORECAST_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            fallback_delay: Duration::from_millis(DEFAULT_FALLBACK_DELAY_MS),
            sampler_workers: DEFAULT_SAMPLER_WORKERS,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            strategy: Strategy::Global,
            max_grid_size: MAX_GRID_SIZE,
            max_density: MAX_DENSITY,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {}={} as u64", name, value)),
        Err(_) => Ok(default),
    }
}

fn env_usize(name: &str, default: usize) -> Result<usize> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<usize>()
            .with_context(|| format!("Failed to parse {}={} as usize", name, value)),
        Err(_) => Ok(default),
    }
}

fn env_limit(name: &str, default: i64) -> Result<i64> {
    let value = match std::env::var(name) {
        Ok(value) => value
            .parse::<i64>()
            .with_context(|| format!("Failed to parse {}={} as i64", name, value))?,
        Err(_) => default,
    };
    if value < 1 {
        bail!("{name} must be at least 1");
    }
    Ok(value)
}

fn trim_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}
