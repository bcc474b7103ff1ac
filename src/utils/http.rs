// src/utils/http.rs

//! HTTP client utilities.
//!
//! Every network call goes through [`HttpTransport`], which hands back the
//! status, headers and a streaming body without judging the status. Callers
//! decide what a 429 or a 5xx means for them.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::ApiConfig;

/// Streaming response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", format!("Bearer {token}"))
    }
}

/// Response with an unread body.
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Turn a non-2xx answer into [`AppError::Status`].
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(AppError::status(url, self.status))
        }
    }

    /// Collect the whole body.
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf)
    }

    /// Collect and deserialize a JSON body.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Asynchronous HTTP seam used by the fetcher, token exchange and downloader.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Create a configured asynchronous HTTP client.
///
/// `timeout_secs` bounds connecting and each read, not the whole transfer,
/// so a large résumé on a slow link keeps streaming while bytes arrive.
pub fn create_async_client(config: &ApiConfig) -> Result<reqwest::Client> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()?;
    Ok(client)
}

/// Production transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(AppError::from));

        Ok(HttpResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{MockResponse, MockTransport};
    use super::*;

    #[tokio::test]
    async fn test_mock_repeats_last_response() {
        let transport = MockTransport::new();
        transport
            .on_get("https://x/a", MockResponse::status(503))
            .on_get("https://x/a", MockResponse::ok("done"));

        let first = transport.send(HttpRequest::get("https://x/a")).await.unwrap();
        assert_eq!(first.status, 503);

        for _ in 0..2 {
            let next = transport.send(HttpRequest::get("https://x/a")).await.unwrap();
            assert_eq!(next.status, 200);
            assert_eq!(next.bytes().await.unwrap(), b"done");
        }
        assert_eq!(transport.count(&Method::GET, "https://x/a"), 3);
    }

    #[tokio::test]
    async fn test_error_for_status() {
        let transport = MockTransport::new();
        let response = transport.send(HttpRequest::get("https://x/missing")).await.unwrap();
        let err = response.error_for_status("https://x/missing").err().unwrap();
        assert_eq!(err.http_status(), Some(404));
    }

    #[test]
    fn test_client_builds_from_config() {
        let config = ApiConfig {
            timeout_secs: 1,
            ..ApiConfig::default()
        };
        assert!(create_async_client(&config).is_ok());
        assert!(ReqwestTransport::new(&ApiConfig::default()).is_ok());
    }

    #[test]
    fn test_request_builder_headers() {
        let request = HttpRequest::get("https://x").bearer("tok");
        assert_eq!(
            request.headers,
            vec![("authorization".to_string(), "Bearer tok".to_string())]
        );
    }
}
