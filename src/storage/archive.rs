//! Zip packaging of the output tree.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{AppError, Result};

/// Zip everything under `src` into `dest`, returning the archive size in bytes.
///
/// Entry names are relative to `src` and `/`-separated. Runs on a blocking
/// thread.
pub async fn zip_directory(src: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Result<u64> {
    let src = src.into();
    let dest = dest.into();
    tokio::task::spawn_blocking(move || zip_directory_blocking(&src, &dest))
        .await
        .map_err(|e| AppError::Io(io::Error::other(e)))?
}

fn entry_name(src: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(src).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn zip_directory_blocking(src: &Path, dest: &Path) -> Result<u64> {
    if !src.is_dir() {
        return Err(AppError::validation(format!(
            "{} is not a directory",
            src.display()
        )));
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut zip = ZipWriter::new(BufWriter::new(File::create(dest)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let dest_abs = dest.canonicalize().ok();

    let mut files = 0usize;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| AppError::Io(io::Error::other(e)))?;
        let Some(name) = entry_name(src, entry.path()) else {
            continue;
        };
        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            // The bundle may live inside the tree it packs.
            if dest_abs.is_some() && entry.path().canonicalize().ok() == dest_abs {
                continue;
            }
            zip.start_file(name, options)?;
            let mut input = File::open(entry.path())?;
            io::copy(&mut input, &mut zip)?;
            files += 1;
        }
    }

    let mut writer = zip.finish()?;
    io::Write::flush(&mut writer)?;
    drop(writer);

    let size = std::fs::metadata(dest)?.len();
    log::info!(
        "Packaged {} files from {} into {} ({} bytes)",
        files,
        src.display(),
        dest.display(),
        size
    );
    Ok(size)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_zip_directory_includes_nested_files() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("output");
        std::fs::create_dir_all(src.join("2024/03/engineer")).unwrap();
        std::fs::write(src.join("resumes.csv"), "candidate_id\n").unwrap();
        std::fs::write(src.join("2024/03/engineer/ada_7_70.pdf"), b"%PDF-1.4").unwrap();

        let dest = dir.path().join("resumes_export.zip");
        let size = zip_directory(&src, &dest).await.unwrap();
        assert_eq!(size, std::fs::metadata(&dest).unwrap().len());
        assert!(size > 0);

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut content = String::new();
        archive
            .by_name("2024/03/engineer/ada_7_70.pdf")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "%PDF-1.4");
        assert!(archive.by_name("resumes.csv").is_ok());
    }

    #[tokio::test]
    async fn test_zip_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = zip_directory(dir.path().join("nope"), dir.path().join("out.zip")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
