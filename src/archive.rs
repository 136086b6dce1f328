use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::debug;

use crate::constants::{
    ARCHIVE_JSON_DIR, ARCHIVE_MAPS_DIR, GENERAL_MAP_PREFIX, STORM_DOCUMENT_PREFIX,
    STORM_SUMMARY_PREFIX,
};

/// Which map images a date search returns.
#[derive(Clone, Copy, Debug)]
pub enum MapFilter<'a> {
    /// `mapa_*.png`
    General,
    /// `*<storm_id>*.png`
    Storm(&'a str),
}

impl MapFilter<'_> {
    fn matches(&self, file_name: &str) -> bool {
        if !file_name.ends_with(".png") {
            return false;
        }
        match self {
            Self::General => file_name.starts_with(GENERAL_MAP_PREFIX),
            Self::Storm(storm_id) => file_name.contains(storm_id),
        }
    }
}

/// Read-only view over the storm run directories produced by the tracker.
///
/// Every run directory holds a `JSON/` folder of storm documents and a
/// `Mapas/` folder of rendered PNG maps.
pub struct StormArchive {
    data_dir: PathBuf,
}

impl StormArchive {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub async fn latest_directory(&self) -> Result<Option<PathBuf>> {
        self.newest_run_directory(|_| true).await
    }

    /// Newest run directory whose name contains `date`.
    pub async fn directory_by_date(&self, date: &str) -> Result<Option<PathBuf>> {
        self.newest_run_directory(|name| name.contains(date)).await
    }

    async fn newest_run_directory(&self, accept: impl Fn(&str) -> bool) -> Result<Option<PathBuf>> {
        if !fs::try_exists(&self.data_dir).await.unwrap_or(false) {
            return Ok(None);
        }

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for path in subdirectories(&self.data_dir).await? {
            let accepted = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(&accept);
            if !accepted {
                continue;
            }
            let modified = fs::metadata(&path)
                .await
                .and_then(|metadata| metadata.modified())
                .with_context(|| format!("Failed to stat {}", path.display()))?;
            if newest.as_ref().map_or(true, |(best, _)| modified > *best) {
                newest = Some((modified, path));
            }
        }

        debug!(
            "Newest run directory under {}: {:?}",
            self.data_dir.display(),
            newest.as_ref().map(|(_, path)| path)
        );
        Ok(newest.map(|(_, path)| path))
    }

    /// Newest general summary (`tormentas*.json`) of a run, by file name.
    pub async fn summary_document(&self, run_dir: &Path) -> Result<Option<PathBuf>> {
        let files = list_files(&run_dir.join(ARCHIVE_JSON_DIR), |name| {
            name.starts_with(STORM_SUMMARY_PREFIX) && name.ends_with(".json")
        })
        .await?;
        Ok(files.into_iter().last())
    }

    pub fn storm_document(&self, run_dir: &Path, storm_id: &str) -> PathBuf {
        run_dir
            .join(ARCHIVE_JSON_DIR)
            .join(format!("{STORM_DOCUMENT_PREFIX}{storm_id}.json"))
    }

    /// `tormenta_<id>.json`, else the first JSON file mentioning the id.
    pub async fn find_storm_document(
        &self,
        run_dir: &Path,
        storm_id: &str,
    ) -> Result<Option<PathBuf>> {
        let exact = self.storm_document(run_dir, storm_id);
        if is_file(&exact).await {
            return Ok(Some(exact));
        }
        let files = list_files(&run_dir.join(ARCHIVE_JSON_DIR), |name| {
            name.contains(storm_id) && name.ends_with(".json")
        })
        .await?;
        Ok(files.into_iter().next())
    }

    pub fn json_dir(&self, run_dir: &Path) -> PathBuf {
        run_dir.join(ARCHIVE_JSON_DIR)
    }

    pub async fn json_documents(&self, run_dir: &Path) -> Result<Vec<PathBuf>> {
        list_files(&run_dir.join(ARCHIVE_JSON_DIR), |name| name.ends_with(".json")).await
    }

    /// Newest general map (`mapa_*.png`) of a run, by file name.
    pub async fn general_map(&self, run_dir: &Path) -> Result<Option<PathBuf>> {
        let files = list_files(&run_dir.join(ARCHIVE_MAPS_DIR), |name| {
            MapFilter::General.matches(name)
        })
        .await?;
        Ok(files.into_iter().last())
    }

    pub fn storm_map(&self, run_dir: &Path, storm_id: &str) -> PathBuf {
        run_dir.join(ARCHIVE_MAPS_DIR).join(format!("{storm_id}.png"))
    }

    /// Map images from every `Mapas/` folder, at any depth, whose parent
    /// directory name contains `date`. Sorted by full path.
    pub async fn map_images_by_date(&self, date: &str, filter: MapFilter<'_>) -> Result<Vec<PathBuf>> {
        if !fs::try_exists(&self.data_dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut images = Vec::new();
        let mut pending = vec![self.data_dir.clone()];
        while let Some(dir) = pending.pop() {
            for child in subdirectories(&dir).await? {
                let dated = child
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.contains(date));
                if dated {
                    let maps_dir = child.join(ARCHIVE_MAPS_DIR);
                    images.extend(list_files(&maps_dir, |name| filter.matches(name)).await?);
                }
                pending.push(child);
            }
        }

        images.sort();
        debug!("Found {} map images for {date}", images.len());
        Ok(images)
    }
}

pub async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

pub async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

async fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read {}", dir.display()))?;

    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Sorted regular files in `dir` whose names pass `accept`. A missing
/// directory yields nothing.
async fn list_files(dir: &Path, accept: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => {
            return Err(error).with_context(|| format!("Failed to read {}", dir.display()))
        }
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let accepted = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(&accept);
        if accepted {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
