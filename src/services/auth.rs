// src/services/auth.rs

//! API key to bearer token exchange.

use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::utils::http::{HttpRequest, HttpTransport};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// `Basic` credential for an API key used as the username with no password.
pub fn basic_credential(api_key: &str) -> String {
    format!("Basic {}", general_purpose::STANDARD.encode(format!("{api_key}:")))
}

/// Exchange `api_key` for a bearer token at `auth_url`.
pub async fn exchange_token(
    transport: &dyn HttpTransport,
    auth_url: &str,
    api_key: &str,
) -> Result<String> {
    let request = HttpRequest::post(auth_url)
        .header("accept", "application/json")
        .header("content-type", "application/json")
        .header("authorization", basic_credential(api_key));

    let response = transport
        .send(request)
        .await
        .map_err(|e| AppError::auth(format!("token request to {auth_url} failed: {e}")))?;
    if !response.is_success() {
        return Err(AppError::auth(format!(
            "token request to {auth_url} returned HTTP {}",
            response.status
        )));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| AppError::auth(format!("unreadable token response: {e}")))?;

    match body.access_token {
        Some(token) if !token.trim().is_empty() => {
            log::info!("Obtained access token");
            Ok(token)
        }
        _ => Err(AppError::auth("token response has no access_token")),
    }
}
