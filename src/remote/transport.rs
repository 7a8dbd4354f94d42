//! HTTP transport for the prompt-tools API.
//!
//! [`Transport`] is the only seam between the workflow and the network:
//! [`HttpTransport`] is the reqwest implementation used in production, and
//! tests swap in scripted stubs. Status classification and audit logging
//! live one level up in [`super::RemoteClient`], so every transport gets
//! them for free.

use crate::audit::HttpMethod;
use crate::config::ApiConfig;
use crate::error::SummarizeError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Header carrying the application identifier.
pub const APP_ID_HEADER: &str = "X-Generated-App-ID";

/// A request to one API endpoint, relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Endpoint path without leading slash, e.g. `return_data/document_summary`.
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            path: path.into(),
            body: None,
        }
    }
}

/// A response that arrived, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body. A non-JSON body is kept as a JSON string; an empty
    /// body is `Null`.
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received (connect failure, timeout, broken body).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends [`ApiRequest`]s to the remote service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Absolute URL for `path`, as recorded in the audit log.
    fn url(&self, path: &str) -> String;

    /// Issue the request. Non-2xx statuses are `Ok`; only a missing
    /// response is an error.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// reqwest-backed transport with the fixed JSON/bearer/app-id headers.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpTransport {
    pub fn new(config: ApiConfig) -> Result<Self, SummarizeError> {
        let headers = default_headers(&config)?;
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SummarizeError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

fn default_headers(config: &ApiConfig) -> Result<HeaderMap, SummarizeError> {
    let invalid = |what: &str| {
        SummarizeError::InvalidConfig(format!("{what} contains characters not allowed in a header"))
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
        .map_err(|_| invalid("API token"))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    headers.insert(
        HeaderName::from_static("x-generated-app-id"),
        HeaderValue::from_str(&config.app_id).map_err(|_| invalid("app id"))?,
    );
    Ok(headers)
}

#[async_trait]
impl Transport for HttpTransport {
    fn url(&self, path: &str) -> String {
        self.config.endpoint(path)
    }

    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url(&request.path);
        debug!("{} {}", request.method, url);

        let builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };
        let builder = match request.body {
            Some(ref body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError(format!(
                    "request timed out after {}s",
                    self.config.timeout_secs
                ))
            } else {
                TransportError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError(format!("failed to read response body: {e}")))?;
        debug!("{} {} -> {} ({} bytes)", request.method, url, status, text.len());

        Ok(ApiResponse {
            status,
            body: parse_body(&text),
        })
    }
}

/// Parse a response body, keeping non-JSON text as a JSON string.
pub(crate) fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
