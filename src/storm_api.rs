use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::extract::{Path as UrlPath, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs;

use crate::archive::{is_dir, is_file, MapFilter};
use crate::error::ApiError;
use crate::types::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct DatedStorms {
    date: String,
    directory: String,
    total_files: usize,
    data: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DatedStorm {
    date: String,
    storm_id: String,
    file: String,
    data: Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct MapImage {
    index: usize,
    filename: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct MapListing {
    date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    storm_id: Option<String>,
    total_images: usize,
    images: Vec<MapImage>,
}

fn validate_id(kind: &str, value: &str) -> Result<(), ApiError> {
    let unsafe_id = value.is_empty()
        || value.contains("..")
        || value.contains(['/', '\\', '\0']);
    if unsafe_id {
        return Err(ApiError::BadRequest(format!("Invalid {kind}: {value:?}")));
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

async fn read_json(path: &Path) -> anyhow::Result<Value> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

async fn png_response(path: &Path) -> Result<Response, ApiError> {
    let bytes = fs::read(path)
        .await
        .map_err(|error| ApiError::Internal(format!("Failed to read {}: {error}", path.display())))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

async fn latest_run(state: &AppState) -> Result<PathBuf, ApiError> {
    state
        .archive
        .latest_directory()
        .await?
        .ok_or_else(|| ApiError::NotFound("No storm data has been generated yet.".to_string()))
}

async fn dated_json_dir(state: &AppState, date: &str) -> Result<PathBuf, ApiError> {
    let run = state
        .archive
        .directory_by_date(date)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No data found for date {date}.")))?;
    let json_dir = state.archive.json_dir(&run);
    if !is_dir(&json_dir).await {
        return Err(ApiError::NotFound(format!(
            "No JSON folder found for date {date}."
        )));
    }
    Ok(run)
}

fn listing(date: String, storm_id: Option<String>, images: &[PathBuf]) -> MapListing {
    MapListing {
        date,
        storm_id,
        total_images: images.len(),
        images: images
            .iter()
            .enumerate()
            .map(|(index, path)| MapImage {
                index,
                filename: file_name(path),
            })
            .collect(),
    }
}

fn pick_index(images: &[PathBuf], index: i64) -> Result<&PathBuf, ApiError> {
    usize::try_from(index)
        .ok()
        .and_then(|index| images.get(index))
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Index {index} out of range. Total images: {}",
                images.len()
            ))
        })
}

pub async fn storms(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let run = latest_run(&state).await?;
    let summary = state
        .archive
        .summary_document(&run)
        .await?
        .ok_or_else(|| ApiError::NotFound("No general storm JSON was found.".to_string()))?;
    Ok(Json(read_json(&summary).await?))
}

pub async fn storm(
    State(state): State<AppState>,
    UrlPath(storm_id): UrlPath<String>,
) -> Result<Json<Value>, ApiError> {
    validate_id("storm id", &storm_id)?;
    let run = latest_run(&state).await?;
    let path = state.archive.storm_document(&run, &storm_id);
    if !is_file(&path).await {
        return Err(ApiError::NotFound(format!(
            "No JSON file found for storm {storm_id}."
        )));
    }
    Ok(Json(read_json(&path).await?))
}

pub async fn storms_by_date(
    State(state): State<AppState>,
    UrlPath(date): UrlPath<String>,
) -> Result<Json<DatedStorms>, ApiError> {
    let run = dated_json_dir(&state, &date).await?;
    let documents = state.archive.json_documents(&run).await?;
    if documents.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No JSON files found for date {date}."
        )));
    }

    let mut data = Map::new();
    for path in &documents {
        let value = match read_json(path).await {
            Ok(value) => value,
            Err(error) => serde_json::json!({
                "error": format!("Could not load file: {error:#}")
            }),
        };
        data.insert(file_stem(path), value);
    }

    Ok(Json(DatedStorms {
        directory: file_name(&run),
        total_files: documents.len(),
        date,
        data,
    }))
}

pub async fn storm_by_date(
    State(state): State<AppState>,
    UrlPath((date, storm_id)): UrlPath<(String, String)>,
) -> Result<Json<DatedStorm>, ApiError> {
    validate_id("storm id", &storm_id)?;
    let run = dated_json_dir(&state, &date).await?;
    let path = state
        .archive
        .find_storm_document(&run, &storm_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No JSON file found for storm {storm_id} on {date}."
            ))
        })?;

    Ok(Json(DatedStorm {
        file: file_name(&path),
        data: read_json(&path).await?,
        date,
        storm_id,
    }))
}

pub async fn general_map(State(state): State<AppState>) -> Result<Response, ApiError> {
    let run = latest_run(&state).await?;
    let path = state
        .archive
        .general_map(&run)
        .await?
        .ok_or_else(|| ApiError::NotFound("No general map was found.".to_string()))?;
    png_response(&path).await
}

pub async fn storm_map(
    State(state): State<AppState>,
    UrlPath(storm_id): UrlPath<String>,
) -> Result<Response, ApiError> {
    validate_id("storm id", &storm_id)?;
    let run = latest_run(&state).await?;
    let path = state.archive.storm_map(&run, &storm_id);
    if !is_file(&path).await {
        return Err(ApiError::NotFound(format!(
            "No map found for storm {storm_id}."
        )));
    }
    png_response(&path).await
}

async fn dated_maps(
    state: &AppState,
    date: &str,
    filter: MapFilter<'_>,
) -> Result<Vec<PathBuf>, ApiError> {
    let images = state.archive.map_images_by_date(date, filter).await?;
    if images.is_empty() {
        let message = match filter {
            MapFilter::General => format!("No maps found for date {date}."),
            MapFilter::Storm(storm_id) => {
                format!("No maps of storm '{storm_id}' found for date {date}.")
            }
        };
        return Err(ApiError::NotFound(message));
    }
    Ok(images)
}

pub async fn general_maps_by_date(
    State(state): State<AppState>,
    UrlPath(date): UrlPath<String>,
) -> Result<Json<MapListing>, ApiError> {
    let images = dated_maps(&state, &date, MapFilter::General).await?;
    Ok(Json(listing(date, None, &images)))
}

pub async fn general_map_by_date(
    State(state): State<AppState>,
    UrlPath((date, index)): UrlPath<(String, i64)>,
) -> Result<Response, ApiError> {
    let images = dated_maps(&state, &date, MapFilter::General).await?;
    png_response(pick_index(&images, index)?).await
}

pub async fn storm_maps_by_date(
    State(state): State<AppState>,
    UrlPath((date, storm_id)): UrlPath<(String, String)>,
) -> Result<Json<MapListing>, ApiError> {
    validate_id("storm id", &storm_id)?;
    let images = dated_maps(&state, &date, MapFilter::Storm(&storm_id)).await?;
    Ok(Json(listing(date, Some(storm_id), &images)))
}

pub async fn storm_map_by_date(
    State(state): State<AppState>,
    UrlPath((date, storm_id, index)): UrlPath<(String, String, i64)>,
) -> Result<Response, ApiError> {
    validate_id("storm id", &storm_id)?;
    let images = dated_maps(&state, &date, MapFilter::Storm(&storm_id)).await?;
    png_response(pick_index(&images, index)?).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::test_support::{send, test_state, CountingFetcher};

    async fn write(path: PathBuf, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, contents).await.unwrap();
    }

    async fn archive_fixture() -> (TempDir, AppState) {
        let root = tempdir().unwrap();
        let old = root.path().join("run_2025-09-01");
        write(old.join("JSON/tormentas_2025-09-01.json"), br#"{"count": 1}"#).await;
        write(old.join("JSON/tormenta_AL05.json"), br#"{"id": "AL05", "wind_kt": 65}"#).await;
        write(old.join("JSON/broken.json"), b"{not json").await;
        write(old.join("Mapas/mapa_0600.png"), b"png-0600").await;
        write(old.join("Mapas/mapa_1200.png"), b"png-1200").await;
        write(old.join("Mapas/AL05_track.png"), b"png-al05").await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        let new = root.path().join("run_2025-09-02");
        write(new.join("JSON/tormentas_2025-09-02.json"), br#"{"count": 2}"#).await;
        write(new.join("JSON/tormenta_EP12.json"), br#"{"id": "EP12"}"#).await;
        write(new.join("Mapas/mapa_0000.png"), b"png-latest").await;
        write(new.join("Mapas/EP12.png"), b"png-ep12").await;

        let state = test_state(
            Arc::new(CountingFetcher::new(0.0)),
            root.path().to_path_buf(),
        );
        (root, state)
    }

    fn json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn latest_storm_documents_are_served() {
        let (_root, state) = archive_fixture().await;

        let (status, _, body) = send(state.clone(), "/api/storms").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["count"], 2);

        let (status, _, body) = send(state.clone(), "/api/storms/EP12").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["id"], "EP12");

        let (status, _, body) = send(state, "/api/storms/AL05").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json(&body)["detail"].as_str().unwrap().contains("AL05"));
    }

    #[tokio::test]
    async fn dated_storms_bundle_every_document() {
        let (_root, state) = archive_fixture().await;

        let (status, _, body) = send(state.clone(), "/api/date/2025-09-01/storms").await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["directory"], "run_2025-09-01");
        assert_eq!(body["total_files"], 3);
        assert_eq!(body["data"]["tormenta_AL05"]["wind_kt"], 65);
        assert!(body["data"]["broken"]["error"].is_string());

        let (status, _, body) = send(state.clone(), "/api/date/2025-09-01/storms/AL05").await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["file"], "tormenta_AL05.json");
        assert_eq!(body["storm_id"], "AL05");
        assert_eq!(body["data"]["id"], "AL05");

        let (status, _, _) = send(state, "/api/date/1999-01-01/storms").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn latest_maps_are_png() {
        let (_root, state) = archive_fixture().await;

        let (status, headers, body) = send(state.clone(), "/api/maps").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(body, b"png-latest");

        let (status, _, body) = send(state, "/api/maps/EP12").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"png-ep12");
    }

    #[tokio::test]
    async fn dated_map_listings_are_indexed() {
        let (_root, state) = archive_fixture().await;

        let (status, _, body) = send(state.clone(), "/api/date/2025-09-01/maps/general/list").await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["total_images"], 2);
        assert_eq!(body["images"][0]["filename"], "mapa_0600.png");
        assert_eq!(body["images"][1]["index"], 1);
        assert!(body.get("storm_id").is_none());

        let (status, _, body) = send(state.clone(), "/api/date/2025-09-01/maps/general/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"png-1200");

        let (status, _, body) = send(state.clone(), "/api/date/2025-09-01/maps/general/2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json(&body)["detail"]
            .as_str()
            .unwrap()
            .contains("Total images: 2"));

        let (status, _, body) = send(state.clone(), "/api/date/2025-09-01/maps/AL05/list").await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["storm_id"], "AL05");
        assert_eq!(body["images"][0]["filename"], "AL05_track.png");

        let (status, _, body) = send(state.clone(), "/api/date/2025-09-01/maps/AL05/0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"png-al05");

        let (status, _, _) = send(state, "/api/date/2025-09-01/maps/AL05/-1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_archive_reports_not_found() {
        let root = tempdir().unwrap();
        let state = test_state(
            Arc::new(CountingFetcher::new(0.0)),
            root.path().to_path_buf(),
        );
        for uri in ["/api/storms", "/api/maps", "/api/date/2025-09-01/maps/general/list"] {
            let (status, _, _) = send(state.clone(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[test]
    fn ids_with_path_components_are_rejected() {
        assert!(validate_id("storm id", "AL05").is_ok());
        assert!(validate_id("storm id", "..").is_err());
        assert!(validate_id("storm id", "a\\b").is_err());
        assert!(validate_id("storm id", "").is_err());
    }
}
