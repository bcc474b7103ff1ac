// src/pipeline/pipeline.rs

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Config, DownloadSummary, ManifestRow};
use crate::utils::http::HttpTransport;
use crate::utils::log::{header, step, summary};

use super::download::run_download;
use super::harvest::run_harvest;
use super::index::build_manifest;
use super::package::run_package;

/// What a full run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub manifest_rows: usize,
    pub downloads: DownloadSummary,
    /// Bundle size, when packaging ran
    pub package_bytes: Option<u64>,
}

/// Harvest the collections and build the download manifest.
pub async fn run_index(
    config: &Config,
    transport: Arc<dyn HttpTransport>,
    api_key: &str,
) -> Result<Vec<ManifestRow>> {
    let harvest = run_harvest(config, transport, api_key).await?;
    Ok(build_manifest(
        &harvest.candidates,
        &harvest.attachments,
        &harvest.applications,
        &harvest.jobs,
    ))
}

/// Run the full pipeline.
pub async fn run_pipeline(
    config: &Config,
    transport: Arc<dyn HttpTransport>,
    api_key: &str,
    skip_package: bool,
) -> Result<PipelineReport> {
    header("Résumé harvest starting");

    let package = config.package.enabled && !skip_package;
    let total_steps = if package { 3 } else { 2 };

    step(1, total_steps, "Index - Fetching collections and building manifest");
    let rows = run_index(config, Arc::clone(&transport), api_key).await?;
    let manifest_rows = rows.len();

    step(2, total_steps, "Download - Fetching résumé files");
    let downloads = run_download(config, transport, rows).await?;

    let package_bytes = if package {
        step(3, total_steps, "Package - Zipping output");
        Some(run_package(config).await?)
    } else {
        None
    };

    let mut items = vec![
        ("Manifest rows", manifest_rows.to_string()),
        ("Attempted", downloads.attempted.to_string()),
        ("Succeeded", downloads.succeeded.to_string()),
        ("Failed", downloads.failed.to_string()),
        ("Output", config.download.output_dir.display().to_string()),
    ];
    if let Some(bytes) = package_bytes {
        items.push((
            "Bundle",
            format!("{} ({} bytes)", config.package_path().display(), bytes),
        ));
    }
    summary("Résumé harvest complete", &items);

    Ok(PipelineReport {
        manifest_rows,
        downloads,
        package_bytes,
    })
}
