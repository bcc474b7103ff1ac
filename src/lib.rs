// src/lib.rs

//! Résumé harvester library.
//!
//! Pulls candidates, jobs, applications and résumé attachments from the
//! Greenhouse Harvest API, joins them into a download manifest and
//! downloads every résumé into an audited local tree.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
