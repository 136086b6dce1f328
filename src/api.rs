use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{DEFAULT_DENSITY, DEFAULT_GRID_SIZE};
use crate::error::{ApiError, PipelineError};
use crate::pipeline::cached_rain_map;
use crate::types::{AppState, CacheKey};

#[derive(Debug, Deserialize)]
pub(crate) struct RealtimeQuery {
    #[serde(default)]
    grid_size: Option<i64>,
    #[serde(default)]
    density: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    message: &'static str,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Tropical storm monitoring and real-time rain map API",
    })
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn realtime(
    State(state): State<AppState>,
    Query(query): Query<RealtimeQuery>,
) -> Result<Response, ApiError> {
    let key = CacheKey::new(
        query.grid_size.unwrap_or(DEFAULT_GRID_SIZE),
        query.density.unwrap_or(DEFAULT_DENSITY),
    );

    let map = cached_rain_map(&state.cache, &state.pipeline, key)
        .await
        .inspect_err(|error| {
            if let PipelineError::Computation(_) = error {
                warn!("Rain map {key} failed: {error}");
            }
        })?;

    let mut response = (StatusCode::OK, Json(map.as_ref())).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}
