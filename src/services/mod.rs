//! Service layer for the harvester.
//!
//! - Token exchange (`exchange_token`)
//! - Paginated collection fetching (`PaginatedFetcher`)
//! - Bulk résumé downloading (`BulkDownloader`)

pub mod auth;
pub mod downloader;
pub mod fetcher;

pub use auth::exchange_token;
pub use downloader::BulkDownloader;
pub use fetcher::{FetchOutcome, PaginatedFetcher, ResourceQuery};
