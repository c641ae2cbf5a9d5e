//! Test support: an in-process transport that answers from canned
//! wire-convention (snake_case) responses and records every request it saw.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use quikapply_core::error::{FormError, Result};
use quikapply_core::transport::{ApiRequest, ApiResponse, Method, Transport};

#[derive(Default)]
pub struct StubTransport {
    responses: Mutex<HashMap<(Method, String), VecDeque<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response for `method path`. Responses for the same
    /// endpoint are consumed in the order they were stubbed.
    pub fn stub_json(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push(
            method,
            path,
            ApiResponse {
                status,
                content_type: Some("application/json; charset=utf-8".to_string()),
                body,
            },
        );
    }

    /// Queue a body-less response (e.g. a bare 200 on delete, or an error
    /// status with no JSON payload).
    pub fn stub_empty(&self, method: Method, path: &str, status: u16) {
        self.push(
            method,
            path,
            ApiResponse {
                status,
                content_type: None,
                body: Value::Null,
            },
        );
    }

    pub fn recorded_requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(&self, method: Method, path: &str, response: ApiResponse) {
        self.responses
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let key = (request.method, request.path.clone());
        let response = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front());
        response.ok_or_else(|| {
            FormError::operation(
                format!("no stubbed response for {} {}", request.method, request.path),
                None,
            )
        })
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
