// src/services/downloader.rs

//! Bounded-concurrency résumé downloader.
//!
//! A fixed number of workers drain one shared queue. Each claimed row is
//! probed for a file extension, streamed to its planned destination, hashed
//! and recorded in the audit log. A failed row is logged and skipped; it
//! never stops the other workers.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{DownloadConfig, DownloadSummary, ManifestRow, TransferRecord};
use crate::storage::{LocalStorage, PlannedPath, TransferAuditLog, plan_paths, sha256_file};
use crate::utils::http::{HttpRequest, HttpTransport};
use crate::utils::retry::RetryPolicy;
use crate::utils::url::extension_from_url;

/// File extension for a `content-type` value, ignoring parameters and case.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "application/pdf" => Some("pdf"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "application/rtf" => Some("rtf"),
        "text/plain" => Some("txt"),
        _ => None,
    }
}

type WorkQueue = Mutex<VecDeque<(ManifestRow, PlannedPath)>>;

/// Shared state for one download run.
struct RunState {
    queue: WorkQueue,
    audit: TransferAuditLog,
    total: usize,
    claimed: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

/// Service for downloading every row of a manifest.
pub struct BulkDownloader {
    transport: Arc<dyn HttpTransport>,
    storage: LocalStorage,
    concurrency: usize,
    default_extension: String,
    probe_policy: RetryPolicy,
    transfer_policy: RetryPolicy,
}

impl BulkDownloader {
    /// Create a downloader writing into `storage`.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        storage: LocalStorage,
        config: &DownloadConfig,
    ) -> Self {
        Self {
            transport,
            storage,
            concurrency: config.concurrency.max(1),
            default_extension: config.default_extension.trim_start_matches('.').to_string(),
            probe_policy: config.probe_policy(),
            transfer_policy: config.transfer_policy(),
        }
    }

    /// Download every row, returning attempted/succeeded/failed counts.
    ///
    /// Only failing to open the audit log is fatal.
    pub async fn download_all(&self, rows: Vec<ManifestRow>) -> Result<DownloadSummary> {
        let total = rows.len();
        let audit = TransferAuditLog::open(self.storage.audit_path(), self.storage.with_job()).await?;
        let planned = plan_paths(self.storage.layout(), &rows);
        let workers = self.concurrency.min(total).max(1);

        log::info!(
            "Downloading {} résumés into {} with {} workers",
            total,
            self.storage.root().display(),
            workers
        );

        let state = RunState {
            queue: Mutex::new(rows.into_iter().zip(planned).collect()),
            audit,
            total,
            claimed: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        };

        let worker_futures = (1..=workers).map(|worker_id| self.worker(worker_id, &state));
        future::join_all(worker_futures).await;

        let summary = DownloadSummary {
            attempted: state.claimed.load(Ordering::SeqCst),
            succeeded: state.succeeded.load(Ordering::SeqCst),
            failed: state.failed.load(Ordering::SeqCst),
        };
        log::info!(
            "Download complete: {} attempted, {} succeeded, {} failed. Audit log at {}",
            summary.attempted,
            summary.succeeded,
            summary.failed,
            state.audit.path().display()
        );
        Ok(summary)
    }

    async fn worker(&self, worker_id: usize, state: &RunState) {
        loop {
            // Claim exactly one row; the guard drops before any I/O.
            let Some((row, planned)) = state.queue.lock().await.pop_front() else {
                break;
            };
            let index = state.claimed.fetch_add(1, Ordering::SeqCst) + 1;

            match self.process(&row, &planned, &state.audit).await {
                Ok(record) => {
                    state.succeeded.fetch_add(1, Ordering::SeqCst);
                    log::info!(
                        "({}/{}) [W{}] {} ({} bytes)",
                        index,
                        state.total,
                        worker_id,
                        record.local_path,
                        record.file_size
                    );
                }
                Err(e) => {
                    state.failed.fetch_add(1, Ordering::SeqCst);
                    log::error!(
                        "({}/{}) [W{}] candidate={}: {}",
                        index,
                        state.total,
                        worker_id,
                        row.candidate_id,
                        e
                    );
                }
            }
        }
    }

    async fn process(
        &self,
        row: &ManifestRow,
        planned: &PlannedPath,
        audit: &TransferAuditLog,
    ) -> Result<TransferRecord> {
        let extension = self.resolve_extension(&row.resume_url).await;
        let local_path = planned.relative(&extension);
        let path = self.storage.resolve(&local_path);

        if let Err(e) = self.transfer(&row.resume_url, &path).await {
            if let Err(cleanup) = self.storage.remove_partial(&path).await {
                log::warn!("Could not remove partial file {}: {}", path.display(), cleanup);
            }
            return Err(AppError::transfer(&row.candidate_id, e));
        }

        let file_size = tokio::fs::metadata(&path).await?.len();
        let sha256 = sha256_file(&path).await?;
        let record = TransferRecord {
            candidate_id: row.candidate_id.to_string(),
            full_name: row.full_name.clone(),
            job_name: Some(row.job_name.clone()),
            uploaded_at: row.uploaded_at.clone(),
            url: row.resume_url.clone(),
            local_path,
            file_size,
            sha256,
        };
        audit.append(&record).await?;
        Ok(record)
    }

    /// Extension from the URL, else from a HEAD probe's content-type, else
    /// the configured default.
    pub async fn resolve_extension(&self, url: &str) -> String {
        if let Some(ext) = extension_from_url(url) {
            return ext;
        }
        match self.probe_content_type(url).await {
            Ok(Some(content_type)) => extension_for_content_type(&content_type)
                .map(String::from)
                .unwrap_or_else(|| self.default_extension.clone()),
            Ok(None) => self.default_extension.clone(),
            Err(e) => {
                log::debug!("HEAD probe failed for {url}: {e}");
                self.default_extension.clone()
            }
        }
    }

    async fn probe_content_type(&self, url: &str) -> Result<Option<String>> {
        let transport = &self.transport;
        self.probe_policy
            .run("probe", |_| async move {
                let response = transport
                    .send(HttpRequest::head(url))
                    .await?
                    .error_for_status(url)?;
                Ok::<_, AppError>(response.header("content-type").map(String::from))
            })
            .await
    }

    /// GET `url` into `path` under the transfer retry policy.
    async fn transfer(&self, url: &str, path: &Path) -> Result<u64> {
        let transport = &self.transport;
        let storage = &self.storage;
        self.transfer_policy
            .run("download", |_| async move {
                let response = transport
                    .send(HttpRequest::get(url))
                    .await?
                    .error_for_status(url)?;
                storage.write_stream(path, response.body).await
            })
            .await
    }
}
