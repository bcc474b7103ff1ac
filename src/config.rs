// src/config.rs

//! Configuration loading utilities.
//!
//! Reads the TOML file when it exists, layers command-line overrides on
//! top and validates the result.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{Config, Layout};

/// Values given on the command line; `None` keeps the file's value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub concurrency: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub layout: Option<Layout>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(concurrency) = self.concurrency {
            config.download.concurrency = concurrency;
        }
        if let Some(output_dir) = &self.output_dir {
            config.download.output_dir = output_dir.clone();
        }
        if let Some(layout) = self.layout {
            config.download.layout = layout;
        }
    }
}

/// Load `path` (defaults when the file is absent), apply overrides, validate.
///
/// A file that exists but does not parse is an error.
pub fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<Config> {
    let mut config = if path.exists() {
        log::info!("Loading configuration from {}", path.display());
        Config::load(path)?
    } else {
        log::info!("No configuration at {}, using defaults", path.display());
        Config::default()
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}
