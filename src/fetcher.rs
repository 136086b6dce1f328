use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::config::Config;
use crate::constants::OPEN_METEO_CURRENT_FIELD;
use crate::http_client::fetch_json;
use crate::types::{Coordinate, Observation};

/// Source of one precipitation reading per coordinate.
///
/// Implementations must not fail: a reading that cannot be obtained is
/// reported as zero rain.
#[async_trait]
pub trait PointFetcher: Send + Sync {
    async fn fetch(&self, coordinate: Coordinate) -> Observation;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    #[serde(default)]
    rain: Option<f64>,
}

/// Open-Meteo `current=rain` client with a fail-soft fallback.
pub struct OpenMeteoFetcher {
    http: Client,
    forecast_url: String,
    timeout: Duration,
    fallback_delay: Duration,
}

impl OpenMeteoFetcher {
    pub fn new(
        http: Client,
        forecast_url: impl Into<String>,
        timeout: Duration,
        fallback_delay: Duration,
    ) -> Self {
        Self {
            http,
            forecast_url: forecast_url.into(),
            timeout,
            fallback_delay,
        }
    }

    pub fn from_config(http: Client, cfg: &Config) -> Self {
        Self::new(
            http,
            cfg.forecast_url.clone(),
            cfg.request_timeout,
            cfg.fallback_delay,
        )
    }

    async fn current_rain(&self, coordinate: Coordinate) -> Result<f64> {
        let query = [
            ("latitude", coordinate.latitude.to_string()),
            ("longitude", coordinate.longitude.to_string()),
            ("current", OPEN_METEO_CURRENT_FIELD.to_string()),
        ];
        let payload: ForecastResponse =
            fetch_json(&self.http, &self.forecast_url, &query, self.timeout).await?;
        Ok(payload
            .current
            .and_then(|current| current.rain)
            .unwrap_or(0.0))
    }
}

#[async_trait]
impl PointFetcher for OpenMeteoFetcher {
    async fn fetch(&self, coordinate: Coordinate) -> Observation {
        match self.current_rain(coordinate).await {
            Ok(rain) => Observation { coordinate, rain },
            Err(error) => {
                warn!(
                    "Rain lookup failed at ({}, {}), using 0: {error:#}",
                    coordinate.latitude, coordinate.longitude
                );
                // Not a retry: the pause only spreads out bursts of failures.
                tokio::time::sleep(self.fallback_delay).await;
                Observation {
                    coordinate,
                    rain: 0.0,
                }
            }
        }
    }
}
