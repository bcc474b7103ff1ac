// src/services/fetcher.rs

//! Paginated collection fetcher.
//!
//! Follows `Link: <...>; rel="next"` cursors from the first page until the
//! server stops sending one, keeping the first record seen for every id.
//! A 429 sleeps for the server-provided interval and retries the same URL.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::HeaderMap;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, Application, Attachment, Candidate, Entity, EntityId, Job};
use crate::utils::http::{HttpRequest, HttpTransport};
use crate::utils::url::{next_link, resource_url};

/// First-page URL for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    url: Url,
}

impl ResourceQuery {
    /// Build a query for `T`'s collection with page size, filters and the
    /// entity's field-selection list.
    pub fn new<T: Entity>(api: &ApiConfig, filters: &[(&str, String)]) -> Result<Self> {
        let mut params: Vec<(&str, String)> = vec![("per_page", api.per_page.to_string())];
        params.extend(filters.iter().cloned());
        params.push(("fields", T::FIELDS.join(",")));

        let url = resource_url(&api.base_url, T::RESOURCE, &params)?;
        Ok(Self { url })
    }

    pub fn candidates(api: &ApiConfig) -> Result<Self> {
        Self::new::<Candidate>(api, &[])
    }

    pub fn attachments(api: &ApiConfig) -> Result<Self> {
        Self::new::<Attachment>(api, &[("type", Attachment::RESUME.to_string())])
    }

    pub fn jobs(api: &ApiConfig) -> Result<Self> {
        Self::new::<Job>(api, &status_filter(&api.job_status))
    }

    pub fn applications(api: &ApiConfig) -> Result<Self> {
        Self::new::<Application>(api, &status_filter(&api.application_status))
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

fn status_filter(status: &Option<String>) -> Vec<(&'static str, String)> {
    status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| vec![("status", s.to_string())])
        .unwrap_or_default()
}

/// Records of one collection plus pagination diagnostics.
#[derive(Debug)]
pub struct FetchOutcome<T> {
    /// Unique records in the order they were first received
    pub records: Vec<T>,
    /// Pages successfully read
    pub pages: usize,
    /// Items carrying an id, repeats included
    pub received: usize,
    /// Items dropped for a null or missing id
    pub skipped: usize,
    /// Ids seen again after their first occurrence
    pub duplicates: Vec<EntityId>,
    /// Total time slept on rate limits
    pub rate_limit_wait: Duration,
}

impl<T> FetchOutcome<T> {
    pub fn unique(&self) -> usize {
        self.records.len()
    }
}

/// Drives every collection through the same cursor loop.
#[derive(Clone)]
pub struct PaginatedFetcher {
    transport: Arc<dyn HttpTransport>,
    token: String,
    max_rate_limit_wait: Option<Duration>,
}

impl PaginatedFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, token: impl Into<String>) -> Self {
        Self {
            transport,
            token: token.into(),
            max_rate_limit_wait: None,
        }
    }

    /// Fail a fetch once its cumulative rate-limit sleeping would exceed `cap`.
    pub fn with_max_rate_limit_wait(mut self, cap: Option<Duration>) -> Self {
        self.max_rate_limit_wait = cap;
        self
    }

    /// Fetch every page of `query`, deduplicated by id.
    pub async fn fetch_all<T: Entity>(&self, query: &ResourceQuery) -> Result<FetchOutcome<T>> {
        let label = T::RESOURCE.to_uppercase();
        let mut outcome = FetchOutcome {
            records: Vec::new(),
            pages: 0,
            received: 0,
            skipped: 0,
            duplicates: Vec::new(),
            rate_limit_wait: Duration::ZERO,
        };
        let mut seen: HashSet<EntityId> = HashSet::new();
        let mut next = Some(query.url().to_string());

        while let Some(url) = next.take() {
            let request = HttpRequest::get(&url)
                .header("accept", "application/json")
                .bearer(&self.token);
            let response = self
                .transport
                .send(request)
                .await
                .map_err(|e| AppError::fetch(&url, e))?;

            if response.status == 429 {
                let wait = rate_limit_wait(&response.headers, Utc::now().timestamp()).ok_or_else(
                    || AppError::fetch(&url, "HTTP 429 without a usable retry-after or x-ratelimit-reset"),
                )?;
                outcome.rate_limit_wait = outcome.rate_limit_wait.saturating_add(wait);
                match self.max_rate_limit_wait {
                    Some(cap) if outcome.rate_limit_wait > cap => {
                        return Err(AppError::fetch(
                            &url,
                            format!(
                                "rate-limit wait of {:?} exceeds the {:?} cap",
                                outcome.rate_limit_wait, cap
                            ),
                        ));
                    }
                    _ => {}
                }
                log::warn!("{label} - rate limited, sleeping {wait:?} before retrying {url}");
                tokio::time::sleep(wait).await;
                next = Some(url);
                continue;
            }

            if !response.is_success() {
                return Err(AppError::fetch(&url, format!("HTTP status {}", response.status)));
            }

            let link = next_link(response.header("link"));
            let body = response.bytes().await.map_err(|e| AppError::fetch(&url, e))?;
            let page: Value = serde_json::from_slice(&body).map_err(|e| AppError::fetch(&url, e))?;
            let items = match page {
                Value::Array(items) => items,
                _ => Vec::new(),
            };

            outcome.pages += 1;
            let page_len = items.len();
            for item in items {
                let id = match item.get("id") {
                    None | Some(Value::Null) => {
                        outcome.skipped += 1;
                        continue;
                    }
                    Some(raw) => serde_json::from_value::<EntityId>(raw.clone())
                        .map_err(|e| AppError::fetch(&url, e))?,
                };
                outcome.received += 1;
                if !seen.insert(id.clone()) {
                    outcome.duplicates.push(id);
                    continue;
                }
                let record: T = serde_json::from_value(item).map_err(|e| AppError::fetch(&url, e))?;
                outcome.records.push(record);
            }

            log::info!(
                "{label} - page {}: received={}, unique={}, duplicates={}",
                outcome.pages,
                page_len,
                outcome.unique(),
                outcome.duplicates.len()
            );

            next = link;
        }

        Ok(outcome)
    }
}

/// How long a 429 asks us to wait, given the current epoch second.
///
/// `retry-after` (positive seconds) wins; otherwise `x-ratelimit-reset`
/// (epoch seconds) counts if it lies in the future. A value too large for a
/// `Duration` saturates to `Duration::MAX`, which exceeds any cap.
pub fn rate_limit_wait(headers: &HeaderMap, now_epoch_secs: i64) -> Option<Duration> {
    let number = |name: &str| -> Option<f64> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite())
    };

    let seconds = |secs: f64| Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);

    if let Some(secs) = number("retry-after").filter(|s| *s > 0.0) {
        return Some(seconds(secs));
    }
    number("x-ratelimit-reset")
        .map(|reset| reset - now_epoch_secs as f64)
        .filter(|remaining| *remaining > 0.0)
        .map(seconds)
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;
    use serde_json::json;

    use super::*;
    use crate::utils::http::mock::{MockResponse, MockTransport};

    const PAGE1: &str = "https://h.io/v3/candidates?per_page=2";
    const PAGE2: &str = "https://h.io/v3/candidates?cursor=b";
    const PAGE3: &str = "https://h.io/v3/candidates?cursor=c";

    fn query(url: &str) -> ResourceQuery {
        ResourceQuery {
            url: Url::parse(url).unwrap(),
        }
    }

    fn fetcher(mock: &Arc<MockTransport>) -> PaginatedFetcher {
        let transport: Arc<dyn HttpTransport> = mock.clone();
        PaginatedFetcher::new(transport, "tok")
    }

    fn next(url: &str) -> String {
        format!("<{url}>; rel=\"next\"")
    }

    #[test]
    fn test_resource_queries_carry_filters_and_fields() {
        let api = ApiConfig {
            base_url: "https://harvest.greenhouse.io/v3/".into(),
            ..ApiConfig::default()
        };
        assert_eq!(
            ResourceQuery::candidates(&api).unwrap().url(),
            "https://harvest.greenhouse.io/v3/candidates?per_page=500&fields=id%2Cfirst_name%2Clast_name"
        );
        assert_eq!(
            ResourceQuery::attachments(&api).unwrap().url(),
            "https://harvest.greenhouse.io/v3/attachments?per_page=500&type=resume&fields=id%2Capplication_id%2Ccandidate_id%2Curl%2Ctype%2Ccreated_at"
        );
        assert!(
            ResourceQuery::jobs(&api)
                .unwrap()
                .url()
                .contains("jobs?per_page=500&status=open&fields=id%2Cname")
        );

        let unfiltered = ApiConfig {
            application_status: None,
            ..api
        };
        assert!(!ResourceQuery::applications(&unfiltered).unwrap().url().contains("status"));
    }

    #[tokio::test]
    async fn test_fetch_follows_links_and_dedups() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            PAGE1,
            MockResponse::json(json!([{"id": 1, "first_name": "Ada"}, {"id": 2}, {"id": null}]))
                .with_header("link", &next(PAGE2)),
        )
        .on_get(
            PAGE2,
            MockResponse::json(json!([{"id": 2, "first_name": "Dup"}, {"id": "x3"}]))
                .with_header("link", &next(PAGE3)),
        )
        .on_get(PAGE3, MockResponse::json(json!([{"id": 1}])));

        let outcome = fetcher(&mock)
            .fetch_all::<Candidate>(&query(PAGE1))
            .await
            .unwrap();

        assert_eq!(outcome.pages, 3);
        assert_eq!(outcome.received, 5);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.unique(), 3);
        assert_eq!(outcome.duplicates, vec![EntityId::Int(2), EntityId::Int(1)]);
        assert_eq!(outcome.duplicates.len(), outcome.received - outcome.unique());

        // First occurrence wins.
        assert_eq!(outcome.records[1].first_name, None);
        assert_eq!(outcome.records[2].id, EntityId::Str("x3".into()));

        let first = &mock.calls()[0];
        assert!(first.headers.contains(&("accept".into(), "application/json".into())));
        assert!(first.headers.contains(&("authorization".into(), "Bearer tok".into())));
    }

    #[tokio::test]
    async fn test_non_array_body_is_empty_page() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(PAGE1, MockResponse::json(json!({"error": "nope"})));

        let outcome = fetcher(&mock).fetch_all::<Job>(&query(PAGE1)).await.unwrap();
        assert_eq!(outcome.pages, 1);
        assert!(outcome.records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retries_same_url() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(PAGE1, MockResponse::status(429).with_header("retry-after", "3"))
            .on_get(PAGE1, MockResponse::json(json!([{"id": 1}])));

        let started = tokio::time::Instant::now();
        let outcome = fetcher(&mock)
            .fetch_all::<Candidate>(&query(PAGE1))
            .await
            .unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(outcome.pages, 1);
        assert_eq!(outcome.unique(), 1);
        assert_eq!(outcome.rate_limit_wait, Duration::from_secs(3));
        assert_eq!(mock.count(&reqwest::Method::GET, PAGE1), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_without_headers_fails() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(PAGE1, MockResponse::status(429));

        let err = fetcher(&mock)
            .fetch_all::<Candidate>(&query(PAGE1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch { ref url, .. } if url == PAGE1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_cap_exceeded_fails() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(PAGE1, MockResponse::status(429).with_header("retry-after", "30"));

        let err = fetcher(&mock)
            .with_max_rate_limit_wait(Some(Duration::from_secs(60)))
            .fetch_all::<Candidate>(&query(PAGE1))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Fetch { .. }));
        // 30s + 30s fits the cap, the third 429 does not.
        assert_eq!(mock.count(&reqwest::Method::GET, PAGE1), 3);
    }

    #[tokio::test]
    async fn test_huge_retry_after_hits_cap() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(PAGE1, MockResponse::status(429).with_header("retry-after", "1e20"));

        let err = fetcher(&mock)
            .with_max_rate_limit_wait(Some(Duration::from_secs(60)))
            .fetch_all::<Candidate>(&query(PAGE1))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Fetch { ref url, .. } if url == PAGE1));
        assert_eq!(mock.count(&reqwest::Method::GET, PAGE1), 1);
    }

    #[tokio::test]
    async fn test_error_status_aborts_with_url() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(
            PAGE1,
            MockResponse::json(json!([{"id": 1}])).with_header("link", &next(PAGE2)),
        )
        .on_get(PAGE2, MockResponse::status(500));

        let err = fetcher(&mock)
            .fetch_all::<Candidate>(&query(PAGE1))
            .await
            .unwrap_err();
        match err {
            AppError::Fetch { url, message } => {
                assert_eq!(url, PAGE2);
                assert!(message.contains("500"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_aborts() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get(PAGE1, MockResponse::ok("[{\"id\": 1,"));

        let err = fetcher(&mock)
            .fetch_all::<Candidate>(&query(PAGE1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
    }

    #[test]
    fn test_rate_limit_wait_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(rate_limit_wait(&headers, 1_000), None);

        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1010"));
        assert_eq!(rate_limit_wait(&headers, 1_000), Some(Duration::from_secs(10)));
        assert_eq!(rate_limit_wait(&headers, 2_000), None);

        headers.insert("retry-after", HeaderValue::from_static("0"));
        assert_eq!(rate_limit_wait(&headers, 1_000), Some(Duration::from_secs(10)));

        headers.insert("retry-after", HeaderValue::from_static("2"));
        assert_eq!(rate_limit_wait(&headers, 1_000), Some(Duration::from_secs(2)));

        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(rate_limit_wait(&headers, 1_000), Some(Duration::from_secs(10)));

        headers.insert("retry-after", HeaderValue::from_static("1e20"));
        assert_eq!(rate_limit_wait(&headers, 1_000), Some(Duration::MAX));

        headers.remove("retry-after");
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1e300"));
        assert_eq!(rate_limit_wait(&headers, 1_000), Some(Duration::MAX));
    }
}
