mod api;
mod archive;
mod cache;
mod config;
mod constants;
mod error;
mod fetcher;
mod grid;
mod http_client;
mod interpolate;
mod pipeline;
mod sampler;
mod storm_api;
mod types;
mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::archive::StormArchive;
use crate::cache::{ResultCache, SystemClock};
use crate::config::Config;
use crate::fetcher::OpenMeteoFetcher;
use crate::pipeline::RainMapPipeline;
use crate::types::AppState;
use crate::utils::{init_tracing, shutdown_signal};

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::root))
        .route("/healthz", get(api::healthz))
        .route("/api/rainmap/realtime", get(api::realtime))
        .route("/api/storms", get(storm_api::storms))
        .route("/api/storms/{storm_id}", get(storm_api::storm))
        .route("/api/date/{date}/storms", get(storm_api::storms_by_date))
        .route(
            "/api/date/{date}/storms/{storm_id}",
            get(storm_api::storm_by_date),
        )
        .route("/api/maps", get(storm_api::general_map))
        .route("/api/maps/{storm_id}", get(storm_api::storm_map))
        .route(
            "/api/date/{date}/maps/general/list",
            get(storm_api::general_maps_by_date),
        )
        .route(
            "/api/date/{date}/maps/general/{index}",
            get(storm_api::general_map_by_date),
        )
        .route(
            "/api/date/{date}/maps/{storm_id}/list",
            get(storm_api::storm_maps_by_date),
        )
        .route(
            "/api/date/{date}/maps/{storm_id}/{index}",
            get(storm_api::storm_map_by_date),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::from_env()?;

    let http = Client::builder()
        .user_agent("onrain-rainmap/1.0")
        .pool_max_idle_per_host(cfg.sampler_workers)
        .build()
        .context("Failed to build reqwest client")?;

    let clock = Arc::new(SystemClock);
    let fetcher = Arc::new(OpenMeteoFetcher::from_config(http, &cfg));
    let state = AppState {
        pipeline: Arc::new(RainMapPipeline::new(
            fetcher,
            cfg.sampler_workers,
            cfg.strategy,
            clock.clone(),
        )
        .with_limits(cfg.max_grid_size, cfg.max_density)),
        cache: Arc::new(ResultCache::new(cfg.cache_ttl, clock)),
        archive: Arc::new(StormArchive::new(cfg.data_dir.clone())),
    };

    info!(
        "Rain map upstream {} ({} workers, {:?} interpolation, {}s cache); storm archive at {}",
        cfg.forecast_url,
        cfg.sampler_workers,
        cfg.strategy,
        cfg.cache_ttl.as_secs(),
        state.archive.data_dir().display()
    );

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen_addr))?;

    info!("Rain map service listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}
