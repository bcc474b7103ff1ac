//! Append-only CSV audit trail of completed transfers.
//!
//! The header is written only when the file is first created, so rerunning
//! into the same output tree keeps extending one log. Each row goes out in a
//! single `write_all` under the log's mutex; concurrent workers never
//! interleave lines.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::TransferRecord;

/// One CSV line, standard quoting, LF terminated.
fn encode_row<I, T>(fields: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer.into_inner().map_err(|e| AppError::Io(e.into_error()))
}

pub struct TransferAuditLog {
    path: PathBuf,
    with_job: bool,
    file: Mutex<tokio::fs::File>,
}

impl TransferAuditLog {
    /// Open `path` for appending, creating it with a header if missing.
    pub async fn open(path: impl Into<PathBuf>, with_job: bool) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if !tokio::fs::try_exists(&path).await? {
            let header = encode_row(TransferRecord::header(with_job))?;
            tokio::fs::write(&path, header).await?;
            log::debug!("Created audit log {}", path.display());
        }

        let file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            with_job,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    pub async fn append(&self, record: &TransferRecord) -> Result<()> {
        let line = encode_row(record.fields(self.with_job))?;
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn record(name: &str) -> TransferRecord {
        TransferRecord {
            candidate_id: "7".into(),
            full_name: name.into(),
            job_name: Some("Engineer, Data".into()),
            uploaded_at: "2024-01-01T00:00:00Z".into(),
            url: "https://f/x.pdf".into(),
            local_path: "flat/x_7_1.pdf".into(),
            file_size: 42,
            sha256: "abc".into(),
        }
    }

    #[tokio::test]
    async fn test_header_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flat").join("resumes_flat.csv");

        let log = TransferAuditLog::open(&path, false).await.unwrap();
        log.append(&record("Ada")).await.unwrap();
        drop(log);

        let log = TransferAuditLog::open(&path, false).await.unwrap();
        log.append(&record("Grace")).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "candidate_id,full_name,uploaded_at,url,local_path,file_size,sha256",
                "7,Ada,2024-01-01T00:00:00Z,https://f/x.pdf,flat/x_7_1.pdf,42,abc",
                "7,Grace,2024-01-01T00:00:00Z,https://f/x.pdf,flat/x_7_1.pdf,42,abc",
            ]
        );
        assert!(!content.contains('\r'));
    }

    #[tokio::test]
    async fn test_partitioned_row_quotes_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resumes.csv");

        let log = TransferAuditLog::open(&path, true).await.unwrap();
        log.append(&record("O\"Neil, Shaq")).await.unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[2], "job_name");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "O\"Neil, Shaq");
        assert_eq!(&rows[0][2], "Engineer, Data");
        assert_eq!(&rows[0][6], "42");
    }

    #[tokio::test]
    async fn test_concurrent_appends_do_not_interleave() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resumes.csv");
        let log = TransferAuditLog::open(&path, true).await.unwrap();

        let names: Vec<String> = (0..50).map(|i| format!("Person {i}")).collect();
        let appends = names.iter().map(|name| {
            let log = &log;
            async move { log.append(&record(name)).await }
        });
        for result in futures::future::join_all(appends).await {
            result.unwrap();
        }

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let count = reader.records().filter(|r| r.as_ref().unwrap().len() == 8).count();
        assert_eq!(count, 50);
    }
}
