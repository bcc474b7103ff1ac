//! Harvest API entity records.
//!
//! Each collection is fetched with a field-selection list, so every field
//! other than `id` is optional and the index builder documents its fallback.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Record identifier, either numeric or textual depending on the API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Str(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{n}"),
            EntityId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Int(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Str(s.to_string())
    }
}

/// A record type served by one paginated collection.
pub trait Entity: DeserializeOwned + Send {
    /// Resource path relative to the API base URL.
    const RESOURCE: &'static str;

    /// Field-selection list requested from the API.
    const FIELDS: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: EntityId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl Entity for Candidate {
    const RESOURCE: &'static str = "candidates";
    const FIELDS: &'static [&'static str] = &["id", "first_name", "last_name"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
}

impl Entity for Job {
    const RESOURCE: &'static str = "jobs";
    const FIELDS: &'static [&'static str] = &["id", "name"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: EntityId,
    #[serde(default)]
    pub candidate_id: Option<EntityId>,
    #[serde(default)]
    pub job_id: Option<EntityId>,
    #[serde(default)]
    pub applied_at: Option<String>,
}

impl Entity for Application {
    const RESOURCE: &'static str = "applications";
    const FIELDS: &'static [&'static str] = &["id", "candidate_id", "job_id", "applied_at"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: EntityId,
    #[serde(default)]
    pub application_id: Option<EntityId>,
    #[serde(default)]
    pub candidate_id: Option<EntityId>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Attachment {
    pub const RESUME: &'static str = "resume";

    pub fn is_resume(&self) -> bool {
        self.kind.as_deref() == Some(Self::RESUME)
    }
}

impl Entity for Attachment {
    const RESOURCE: &'static str = "attachments";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "application_id",
        "candidate_id",
        "url",
        "type",
        "created_at",
    ];
}

/// Parse an API timestamp.
///
/// Accepts RFC 3339, naive date-times (taken as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_accepts_numbers_and_strings() {
        let ids: Vec<EntityId> = serde_json::from_str(r#"[42, "abc"]"#).unwrap();
        assert_eq!(ids, vec![EntityId::Int(42), EntityId::Str("abc".into())]);
        assert_eq!(ids[0].to_string(), "42");
        assert_ne!(EntityId::Int(42), EntityId::Str("42".into()));
        assert_eq!(EntityId::from(42), ids[0]);
        assert_eq!(EntityId::from("abc"), ids[1]);
    }

    #[test]
    fn test_attachment_type_field() {
        let a: Attachment = serde_json::from_str(
            r#"{"id": 1, "candidate_id": 7, "url": "https://f/x.pdf", "type": "resume", "created_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(a.is_resume());
        assert_eq!(a.candidate_id, Some(EntityId::Int(7)));
    }

    #[test]
    fn test_missing_optional_fields() {
        let app: Application = serde_json::from_str(r#"{"id": 9}"#).unwrap();
        assert!(app.candidate_id.is_none());
        assert!(app.applied_at.is_none());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2024-03-05T10:00:00Z").unwrap();
        let b = parse_timestamp("2024-03-05T12:00:00+02:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("2024-01-01").is_some());
        assert!(parse_timestamp("2024-01-01T08:30:00.123").is_some());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
