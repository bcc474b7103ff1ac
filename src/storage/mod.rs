//! Output tree: résumé files, audit log and the zip bundle.

pub mod archive;
pub mod audit;
pub mod layout;
pub mod local;

// Re-export for convenience
pub use archive::zip_directory;
pub use audit::TransferAuditLog;
pub use layout::{PathPlanner, PlannedPath, plan_paths};
pub use local::{LocalStorage, sha256_file};
