// src/pipeline/harvest.rs

//! Collection harvesting: token exchange plus the four paginated fetches.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Application, Attachment, Candidate, Config, Entity, Job};
use crate::services::{FetchOutcome, PaginatedFetcher, ResourceQuery, exchange_token};
use crate::utils::http::HttpTransport;

/// Everything the index builder needs.
#[derive(Debug, Default)]
pub struct Harvest {
    pub candidates: Vec<Candidate>,
    pub attachments: Vec<Attachment>,
    pub jobs: Vec<Job>,
    pub applications: Vec<Application>,
}

fn report<T: Entity>(outcome: &FetchOutcome<T>) {
    log::info!(
        "{}: {} unique from {} received over {} pages ({} duplicates, {} without id)",
        T::RESOURCE,
        outcome.unique(),
        outcome.received,
        outcome.pages,
        outcome.duplicates.len(),
        outcome.skipped
    );
    if !outcome.duplicates.is_empty() {
        log::debug!("{} duplicate ids: {:?}", T::RESOURCE, outcome.duplicates);
    }
}

async fn fetch<T: Entity>(fetcher: &PaginatedFetcher, query: ResourceQuery) -> Result<Vec<T>> {
    let outcome = fetcher.fetch_all::<T>(&query).await?;
    report(&outcome);
    Ok(outcome.records)
}

/// Exchange the API key for a token and fetch all four collections.
///
/// Collections are fetched one after another; any fetch failure is fatal.
pub async fn run_harvest(
    config: &Config,
    transport: Arc<dyn HttpTransport>,
    api_key: &str,
) -> Result<Harvest> {
    let api = &config.api;
    let token = exchange_token(transport.as_ref(), &api.auth_url, api_key).await?;

    let fetcher = PaginatedFetcher::new(transport, token)
        .with_max_rate_limit_wait(config.fetch.max_rate_limit_wait());

    let candidates: Vec<Candidate> = fetch(&fetcher, ResourceQuery::candidates(api)?).await?;
    let attachments: Vec<Attachment> = fetch(&fetcher, ResourceQuery::attachments(api)?).await?;
    let jobs: Vec<Job> = fetch(&fetcher, ResourceQuery::jobs(api)?).await?;
    let applications: Vec<Application> = fetch(&fetcher, ResourceQuery::applications(api)?).await?;

    Ok(Harvest {
        candidates,
        attachments,
        jobs,
        applications,
    })
}
