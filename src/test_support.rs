use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use tower::ServiceExt;

use crate::archive::StormArchive;
use crate::build_router;
use crate::cache::{Clock, ResultCache};
use crate::config::Config;
use crate::fetcher::PointFetcher;
use crate::pipeline::RainMapPipeline;
use crate::types::{AppState, Coordinate, Observation};

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Constant-rain fetcher that counts its calls.
pub struct CountingFetcher {
    rain: f64,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(rain: f64) -> Self {
        Self {
            rain,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PointFetcher for CountingFetcher {
    async fn fetch(&self, coordinate: Coordinate) -> Observation {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Observation {
            coordinate,
            rain: self.rain,
        }
    }
}

/// Serves `app` on an ephemeral port and returns its forecast URL.
pub async fn spawn_upstream(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1/forecast")
}

/// A forecast URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v1/forecast")
}

/// App state on a manual clock, sampling through `fetcher`.
pub fn test_state(fetcher: Arc<CountingFetcher>, data_dir: PathBuf) -> AppState {
    let clock = Arc::new(ManualClock::default());
    let cfg = Config::default();
    AppState {
        pipeline: Arc::new(RainMapPipeline::new(
            fetcher,
            cfg.sampler_workers,
            cfg.strategy,
            clock.clone(),
        )
        .with_limits(cfg.max_grid_size, cfg.max_density)),
        cache: Arc::new(ResultCache::new(cfg.cache_ttl, clock)),
        archive: Arc::new(StormArchive::new(data_dir)),
    }
}

/// Issues `GET uri` against the full router.
pub async fn send(state: AppState, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = build_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}
