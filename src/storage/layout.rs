// src/storage/layout.rs

//! Destination naming for downloaded résumés.
//!
//! ```text
//! flat:         {root}/flat/{name}_{candidate}_{application}.{ext}
//! partitioned:  {root}/{YYYY}/{MM}/{job}/{name}_{candidate}_{application}.{ext}
//! ```
//!
//! Every row of a manifest is planned up front so that no two rows share a
//! destination, whatever order the workers finish in.

use std::collections::HashSet;

use chrono::Datelike;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::{Layout, ManifestRow, parse_timestamp};

const MAX_NAME_GRAPHEMES: usize = 120;
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn strip_unsafe(raw: &str) -> String {
    raw.chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .collect()
}

/// Strip path-hostile characters, collapse whitespace and cap the length.
/// Returns `unnamed` when nothing is left.
pub fn sanitize(raw: &str) -> String {
    let stripped = strip_unsafe(raw);
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.graphemes(true).take(MAX_NAME_GRAPHEMES).collect();
    let capped = capped.trim();
    if capped.is_empty() {
        "unnamed".to_string()
    } else {
        capped.to_string()
    }
}

/// Lower-cased, underscore-separated form of a display name.
pub fn safe_name(full_name: &str) -> String {
    sanitize(full_name).to_lowercase().replace(' ', "_")
}

/// Directory name for a job in the partitioned layout.
///
/// Blank names and names made only of dots map to `unknown_job`.
pub fn job_dir_name(job_name: &str) -> String {
    let dir = sanitize(&job_name.to_lowercase());
    if job_name.trim().is_empty() || dir.chars().all(|c| c == '.') {
        "unknown_job".to_string()
    } else {
        dir
    }
}

/// `(YYYY, MM)` of an upload timestamp in UTC, `("0000", "00")` when unparseable.
pub fn year_month(uploaded_at: &str) -> (String, String) {
    match parse_timestamp(uploaded_at) {
        Some(ts) => (format!("{:04}", ts.year()), format!("{:02}", ts.month())),
        None => ("0000".to_string(), "00".to_string()),
    }
}

/// Planned destination for one row, minus the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPath {
    /// Directory components below the output root
    pub dirs: Vec<String>,
    /// File name without extension
    pub stem: String,
}

impl PlannedPath {
    /// Root-relative, `/`-separated path of the file.
    pub fn relative(&self, extension: &str) -> String {
        let mut parts = self.dirs.clone();
        parts.push(format!("{}.{}", self.stem, extension));
        parts.join("/")
    }
}

/// Hands out destinations that are unique within one run.
#[derive(Debug)]
pub struct PathPlanner {
    layout: Layout,
    taken: HashSet<String>,
}

impl PathPlanner {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            taken: HashSet::new(),
        }
    }

    fn dirs_for(&self, row: &ManifestRow) -> Vec<String> {
        match self.layout {
            Layout::Flat => vec!["flat".to_string()],
            Layout::Partitioned => {
                let (year, month) = year_month(&row.uploaded_at);
                vec![year, month, job_dir_name(&row.job_name)]
            }
        }
    }

    /// Plan the next row; a taken stem gets `-2`, `-3`, ... appended.
    pub fn plan(&mut self, row: &ManifestRow) -> PlannedPath {
        let dirs = self.dirs_for(row);
        let base = format!(
            "{}_{}",
            safe_name(&row.full_name),
            strip_unsafe(&format!("{}_{}", row.candidate_id, row.application_id))
        );

        let mut stem = base.clone();
        let mut n = 1;
        while !self.taken.insert(format!("{}/{}", dirs.join("/"), stem)) {
            n += 1;
            stem = format!("{base}-{n}");
        }
        PlannedPath { dirs, stem }
    }
}

/// Plan destinations for a whole manifest, in row order.
pub fn plan_paths(layout: Layout, rows: &[ManifestRow]) -> Vec<PlannedPath> {
    let mut planner = PathPlanner::new(layout);
    rows.iter().map(|row| planner.plan(row)).collect()
}
