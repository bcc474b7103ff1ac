// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod entity;
mod manifest;

// Re-export all public types
pub use config::{ApiConfig, Config, DownloadConfig, FetchConfig, Layout, PackageConfig};
pub use entity::{Application, Attachment, Candidate, Entity, EntityId, Job, parse_timestamp};
pub use manifest::{ManifestRow, TransferRecord, sort_manifest};

/// Counts reported at the end of a download run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}
