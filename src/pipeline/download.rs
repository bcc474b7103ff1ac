// src/pipeline/download.rs

//! Manifest persistence and the download stage.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Config, DownloadSummary, ManifestRow};
use crate::services::BulkDownloader;
use crate::storage::LocalStorage;
use crate::utils::http::HttpTransport;

/// Save a manifest as pretty JSON, creating parent directories.
pub async fn save_manifest(path: &Path, rows: &[ManifestRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(rows)?;
    tokio::fs::write(path, bytes).await?;
    log::info!("Saved {} manifest rows to {}", rows.len(), path.display());
    Ok(())
}

/// Load a manifest saved by [`save_manifest`].
pub async fn load_manifest(path: &Path) -> Result<Vec<ManifestRow>> {
    let bytes = tokio::fs::read(path).await?;
    let rows: Vec<ManifestRow> = serde_json::from_slice(&bytes)?;
    log::info!("Loaded {} manifest rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Download every manifest row into the configured output tree.
pub async fn run_download(
    config: &Config,
    transport: Arc<dyn HttpTransport>,
    rows: Vec<ManifestRow>,
) -> Result<DownloadSummary> {
    let storage = LocalStorage::new(&config.download.output_dir, config.download.layout);
    let downloader = BulkDownloader::new(transport, storage, &config.download);
    downloader.download_all(rows).await
}
