//! Download manifest and audit records.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntityId;

/// One résumé to download, tied to a single application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub resume_url: String,
    pub full_name: String,
    pub uploaded_at: String,
    pub candidate_id: EntityId,
    pub application_id: EntityId,
    pub job_name: String,
    #[serde(default)]
    pub applied_at: Option<String>,
    /// Applied-at if parseable, else the résumé upload time.
    #[serde(default)]
    pub sort_key: Option<DateTime<Utc>>,
}

impl ManifestRow {
    /// Newest first; rows without a key go last.
    pub fn cmp_recency(&self, other: &Self) -> Ordering {
        match (&self.sort_key, &other.sort_key) {
            (Some(a), Some(b)) => b.cmp(a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Sort rows newest first, keeping the relative order of rows without a key.
pub fn sort_manifest(rows: &mut [ManifestRow]) {
    rows.sort_by(ManifestRow::cmp_recency);
}

/// One completed transfer, as written to the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub candidate_id: String,
    pub full_name: String,
    /// Present only for job-partitioned layouts.
    pub job_name: Option<String>,
    pub uploaded_at: String,
    pub url: String,
    pub local_path: String,
    pub file_size: u64,
    pub sha256: String,
}

impl TransferRecord {
    pub const HEADER_FLAT: &'static [&'static str] = &[
        "candidate_id",
        "full_name",
        "uploaded_at",
        "url",
        "local_path",
        "file_size",
        "sha256",
    ];

    pub const HEADER_PARTITIONED: &'static [&'static str] = &[
        "candidate_id",
        "full_name",
        "job_name",
        "uploaded_at",
        "url",
        "local_path",
        "file_size",
        "sha256",
    ];

    pub fn header(with_job: bool) -> &'static [&'static str] {
        if with_job {
            Self::HEADER_PARTITIONED
        } else {
            Self::HEADER_FLAT
        }
    }

    /// Field values in header order.
    pub fn fields(&self, with_job: bool) -> Vec<String> {
        let mut fields = vec![self.candidate_id.clone(), self.full_name.clone()];
        if with_job {
            fields.push(self.job_name.clone().unwrap_or_default());
        }
        fields.extend([
            self.uploaded_at.clone(),
            self.url.clone(),
            self.local_path.clone(),
            self.file_size.to_string(),
            self.sha256.clone(),
        ]);
        fields
    }
}
