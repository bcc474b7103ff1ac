//! Pipeline entry points for harvester operations.
//!
//! - `run_index`: Fetch the four collections and build the manifest
//! - `run_download`: Download a manifest into the output tree
//! - `run_package`: Zip the output tree
//! - `run_pipeline`: All of the above in order

pub mod download;
pub mod harvest;
pub mod index;
pub mod package;
pub mod pipeline;

pub use download::{load_manifest, run_download, save_manifest};
pub use harvest::{Harvest, run_harvest};
pub use index::{IndexBuilder, build_manifest};
pub use package::run_package;
pub use pipeline::{PipelineReport, run_index, run_pipeline};
