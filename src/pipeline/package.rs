// src/pipeline/package.rs

use crate::error::Result;
use crate::models::Config;
use crate::storage::zip_directory;

/// Zip the output tree into the configured bundle path, returning its size.
pub async fn run_package(config: &Config) -> Result<u64> {
    let dest = config.package_path();
    let bytes = zip_directory(&config.download.output_dir, &dest).await?;
    log::info!("ZIP: {} ({} bytes)", dest.display(), bytes);
    Ok(bytes)
}
