//! Local filesystem storage for downloaded résumés.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── flat/                     # Layout::Flat
//! │   ├── resumes_flat.csv      # Audit log
//! │   └── ada_lovelace_7_70.pdf
//! ├── resumes.csv               # Layout::Partitioned audit log
//! └── 2024/                     # Layout::Partitioned
//!     └── 03/
//!         └── data engineer/
//!             └── ada_lovelace_7_70.pdf
//! ```

use std::path::{Path, PathBuf};

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{AppError, Result};
use crate::models::Layout;
use crate::utils::http::BodyStream;

const HASH_BUFFER: usize = 64 * 1024;

/// Output tree for one layout.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    layout: Layout,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, layout: Layout) -> Self {
        Self {
            root_dir: root_dir.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Whether audit rows carry a job name.
    pub fn with_job(&self) -> bool {
        self.layout == Layout::Partitioned
    }

    /// Audit log location for this layout.
    pub fn audit_path(&self) -> PathBuf {
        match self.layout {
            Layout::Flat => self.root_dir.join("flat").join("resumes_flat.csv"),
            Layout::Partitioned => self.root_dir.join("resumes.csv"),
        }
    }

    /// Absolute path for a root-relative, `/`-separated path.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root_dir.clone(), |path, part| path.join(part))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Stream a response body into `path`, returning the bytes written.
    /// Any existing file is truncated.
    pub async fn write_stream(&self, path: &Path, mut body: BodyStream) -> Result<u64> {
        Self::ensure_dir(path).await?;

        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }

    /// Remove a file left behind by a failed transfer.
    pub async fn remove_partial(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// Hex SHA-256 of a file, read in fixed-size chunks.
pub async fn sha256_file(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUFFER];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
