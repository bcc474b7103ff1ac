//! Download manifest generation.
//!
//! Joins the four harvested collections into one row per application whose
//! candidate has a résumé on file. Only each candidate's most recent
//! résumé is used, so every application of the same candidate points at
//! the same file.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{
    Application, Attachment, Candidate, EntityId, Job, ManifestRow, parse_timestamp,
    sort_manifest,
};

/// A candidate's current résumé.
#[derive(Debug, Clone)]
struct LatestResume<'a> {
    url: &'a str,
    created_at: &'a str,
    parsed: DateTime<Utc>,
}

/// Builder for the download manifest.
pub struct IndexBuilder<'a> {
    candidates: HashMap<&'a EntityId, &'a Candidate>,
    jobs: HashMap<&'a EntityId, &'a Job>,
    resumes: HashMap<&'a EntityId, LatestResume<'a>>,
}

impl<'a> IndexBuilder<'a> {
    /// Index candidates and jobs by id.
    pub fn new(candidates: &'a [Candidate], jobs: &'a [Job]) -> Self {
        Self {
            candidates: candidates.iter().map(|c| (&c.id, c)).collect(),
            jobs: jobs.iter().map(|j| (&j.id, j)).collect(),
            resumes: HashMap::new(),
        }
    }

    /// Keep the newest usable résumé per candidate.
    ///
    /// An attachment counts only if it is a résumé with a URL, a candidate
    /// and a parseable `created_at`. Equal timestamps keep the first seen.
    pub fn add_attachments(&mut self, attachments: &'a [Attachment]) -> &mut Self {
        for attachment in attachments.iter().filter(|a| a.is_resume()) {
            let (Some(url), Some(candidate_id), Some(created_at)) = (
                attachment.url.as_deref(),
                attachment.candidate_id.as_ref(),
                attachment.created_at.as_deref(),
            ) else {
                continue;
            };
            if url.is_empty() {
                continue;
            }
            let Some(parsed) = parse_timestamp(created_at) else {
                log::debug!("Skipping attachment {}: bad created_at {created_at:?}", attachment.id);
                continue;
            };

            let newer = self
                .resumes
                .get(candidate_id)
                .is_none_or(|current| parsed > current.parsed);
            if newer {
                self.resumes.insert(
                    candidate_id,
                    LatestResume {
                        url,
                        created_at,
                        parsed,
                    },
                );
            }
        }
        self
    }

    /// Number of candidates with a résumé.
    pub fn resume_count(&self) -> usize {
        self.resumes.len()
    }

    fn full_name(&self, candidate_id: &EntityId) -> String {
        let name = self
            .candidates
            .get(candidate_id)
            .map(|c| {
                [c.first_name.as_deref(), c.last_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        if name.is_empty() {
            format!("Candidate {candidate_id}")
        } else {
            name
        }
    }

    fn job_name(&self, job_id: Option<&EntityId>) -> String {
        let name = job_id
            .and_then(|id| self.jobs.get(id))
            .and_then(|j| j.name.as_deref())
            .map(str::trim)
            .unwrap_or_default();
        match (name.is_empty(), job_id) {
            (false, _) => name.to_string(),
            (true, Some(id)) => format!("Job {id}"),
            (true, None) => "Job unknown".to_string(),
        }
    }

    /// One row per application with a résumé, newest first.
    pub fn build(&self, applications: &[Application]) -> Vec<ManifestRow> {
        let mut rows: Vec<ManifestRow> = applications
            .iter()
            .filter_map(|application| {
                let candidate_id = application.candidate_id.as_ref()?;
                let resume = self.resumes.get(candidate_id)?;
                let sort_key = application
                    .applied_at
                    .as_deref()
                    .and_then(parse_timestamp)
                    .or(Some(resume.parsed));

                Some(ManifestRow {
                    resume_url: resume.url.to_string(),
                    full_name: self.full_name(candidate_id),
                    uploaded_at: resume.created_at.to_string(),
                    candidate_id: candidate_id.clone(),
                    application_id: application.id.clone(),
                    job_name: self.job_name(application.job_id.as_ref()),
                    applied_at: application.applied_at.clone(),
                    sort_key,
                })
            })
            .collect();

        sort_manifest(&mut rows);
        rows
    }
}

/// Build the download manifest from the four collections.
pub fn build_manifest(
    candidates: &[Candidate],
    attachments: &[Attachment],
    applications: &[Application],
    jobs: &[Job],
) -> Vec<ManifestRow> {
    let mut builder = IndexBuilder::new(candidates, jobs);
    builder.add_attachments(attachments);
    let rows = builder.build(applications);
    log::info!(
        "Manifest: {} rows from {} applications ({} candidates with a résumé)",
        rows.len(),
        applications.len(),
        builder.resume_count()
    );
    rows
}
