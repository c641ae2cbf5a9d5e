//! Wire boundary to the remote forms service.
//!
//! The coordinator talks to a [`Transport`] trait object, never to reqwest
//! directly: production uses [`HttpTransport`], tests use an in-process stub.
//! Requests and responses on this seam already carry the external
//! (snake_case) convention; the coordinator transcodes on either side.

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{FormError, Result};

const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1/";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// One request to the forms service, external convention throughout.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Flat query object, keys already snake_case.
    pub params: Option<Value>,
}

/// A response as observed on the wire: status, declared content type, and
/// the decoded JSON body (Null when the body was empty or not JSON).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only JSON bodies go through case transcoding; multipart and friends
    /// bypass it.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"))
    }
}

/// Transport seam between the coordinator and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        (**self).execute(request).await
    }
}

/// Where the remote forms service lives. Read from `QUIKAPPLY_API_URL`,
/// falling back to the local development host.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let raw = std::env::var("QUIKAPPLY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let base_url = Url::parse(&raw).with_context(|| format!("invalid API url: {raw}"))?;
        Ok(Self { base_url })
    }
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(ApiConfig::from_env()?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|e| FormError::operation(format!("invalid request path: {e}"), None))?;
        debug!(method = %request.method, %url, "issuing request");

        let mut builder = match request.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
            Method::Put => self.http.put(url),
            Method::Patch => self.http.patch(url),
            Method::Delete => self.http.delete(url),
        };
        if let Some(params) = &request.params {
            builder = builder.query(&query_pairs(params));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let is_json = content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"));
        let bytes = response.bytes().await?;
        let body = decode_body(request.method, &request.path, status, is_json, &bytes)?;

        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Decode a response body. Non-JSON and empty bodies become `Null`; a body
/// the service declared as JSON but that does not parse is an error, not a
/// silently empty response.
fn decode_body(
    method: Method,
    path: &str,
    status: u16,
    is_json: bool,
    bytes: &[u8],
) -> Result<Value> {
    if !is_json || bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| {
        FormError::operation(
            format!("invalid JSON from {method} {path}: {e}"),
            Some(status),
        )
    })
}

impl From<reqwest::Error> for FormError {
    fn from(error: reqwest::Error) -> Self {
        FormError::operation(
            format!("request failed: {error}"),
            error.status().map(|s| s.as_u16()),
        )
    }
}

fn query_pairs(params: &Value) -> Vec<(String, String)> {
    match params {
        Value::Object(entries) => entries
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect(),
        _ => Vec::new(),
    }
}
