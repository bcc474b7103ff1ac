//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::retry::RetryPolicy;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Harvest API endpoints and request settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Pagination behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Bulk download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Archive packaging settings
    #[serde(default)]
    pub package: PackageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.api.per_page == 0 {
            return Err(AppError::validation("api.per_page must be > 0"));
        }
        url::Url::parse(&self.api.base_url)
            .map_err(|e| AppError::validation(format!("api.base_url is invalid: {e}")))?;
        url::Url::parse(&self.api.auth_url)
            .map_err(|e| AppError::validation(format!("api.auth_url is invalid: {e}")))?;
        if self.download.concurrency == 0 {
            return Err(AppError::validation("download.concurrency must be > 0"));
        }
        if self.download.default_extension.trim().is_empty() {
            return Err(AppError::validation("download.default_extension is empty"));
        }
        Ok(())
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(AppError::config(format!(
                "missing {} in environment",
                self.api.api_key_env
            ))),
        }
    }

    /// Where the zip bundle is written.
    pub fn package_path(&self) -> PathBuf {
        self.package.path.clone().unwrap_or_else(|| {
            let output = &self.download.output_dir;
            output
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("resumes_export.zip")
        })
    }
}

/// Harvest API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL that resource paths are joined onto
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Token exchange endpoint
    #[serde(default = "defaults::auth_url")]
    pub auth_url: String,

    /// Environment variable holding the API key
    #[serde(default = "defaults::api_key_env")]
    pub api_key_env: String,

    /// Page size requested from every collection
    #[serde(default = "defaults::per_page")]
    pub per_page: u32,

    /// Status filter for jobs (e.g. "open")
    #[serde(default = "defaults::job_status")]
    pub job_status: Option<String>,

    /// Status filter for applications (e.g. "active")
    #[serde(default = "defaults::application_status")]
    pub application_status: Option<String>,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            auth_url: defaults::auth_url(),
            api_key_env: defaults::api_key_env(),
            per_page: defaults::per_page(),
            job_status: defaults::job_status(),
            application_status: defaults::application_status(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Pagination settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Cap on the total time one fetch may spend sleeping on 429s.
    /// Unset means the server-provided reset times are honored without limit.
    #[serde(default)]
    pub max_rate_limit_wait_secs: Option<u64>,
}

impl FetchConfig {
    pub fn max_rate_limit_wait(&self) -> Option<Duration> {
        self.max_rate_limit_wait_secs.map(Duration::from_secs)
    }
}

/// On-disk arrangement of downloaded résumés.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Every file in one `flat/` directory
    #[default]
    Flat,
    /// `YYYY/MM/<job>/` directories
    Partitioned,
}

impl FromStr for Layout {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(Layout::Flat),
            "partitioned" => Ok(Layout::Partitioned),
            other => Err(AppError::config(format!("unknown layout '{other}'"))),
        }
    }
}

/// Bulk download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Number of concurrent download workers
    #[serde(default = "defaults::concurrency")]
    pub concurrency: usize,

    /// Output root directory
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Directory layout
    #[serde(default)]
    pub layout: Layout,

    /// Extension used when neither URL nor content-type identify the file
    #[serde(default = "defaults::default_extension")]
    pub default_extension: String,

    /// Retries for the HEAD probe used to sniff content-type
    #[serde(default = "defaults::probe_retries")]
    pub probe_retries: u32,

    /// Base backoff for the HEAD probe in milliseconds
    #[serde(default = "defaults::probe_backoff")]
    pub probe_backoff_ms: u64,

    /// Retries for the file transfer itself
    #[serde(default = "defaults::transfer_retries")]
    pub transfer_retries: u32,

    /// Base backoff for the file transfer in milliseconds
    #[serde(default = "defaults::transfer_backoff")]
    pub transfer_backoff_ms: u64,
}

impl DownloadConfig {
    pub fn probe_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.probe_retries,
            Duration::from_millis(self.probe_backoff_ms),
        )
    }

    pub fn transfer_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.transfer_retries,
            Duration::from_millis(self.transfer_backoff_ms),
        )
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::concurrency(),
            output_dir: defaults::output_dir(),
            layout: Layout::default(),
            default_extension: defaults::default_extension(),
            probe_retries: defaults::probe_retries(),
            probe_backoff_ms: defaults::probe_backoff(),
            transfer_retries: defaults::transfer_retries(),
            transfer_backoff_ms: defaults::transfer_backoff(),
        }
    }
}

/// Archive packaging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Zip the output directory after downloading
    #[serde(default = "defaults::package_enabled")]
    pub enabled: bool,

    /// Bundle path (defaults to `resumes_export.zip` next to the output root)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::package_enabled(),
            path: None,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // API defaults
    pub fn base_url() -> String {
        "https://harvest.greenhouse.io/v3/".into()
    }
    pub fn auth_url() -> String {
        "https://harvest.greenhouse.io/auth/token".into()
    }
    pub fn api_key_env() -> String {
        "HARVEST_API_KEY".into()
    }
    pub fn per_page() -> u32 {
        500
    }
    pub fn job_status() -> Option<String> {
        Some("open".into())
    }
    pub fn application_status() -> Option<String> {
        Some("active".into())
    }
    pub fn user_agent() -> String {
        "harvester/0.1".into()
    }
    pub fn timeout() -> u64 {
        60
    }

    // Download defaults
    pub fn concurrency() -> usize {
        20
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("output")
    }
    pub fn default_extension() -> String {
        "pdf".into()
    }
    pub fn probe_retries() -> u32 {
        2
    }
    pub fn probe_backoff() -> u64 {
        400
    }
    pub fn transfer_retries() -> u32 {
        2
    }
    pub fn transfer_backoff() -> u64 {
        800
    }

    // Package defaults
    pub fn package_enabled() -> bool {
        true
    }
}
