//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Default whole-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Retry with exponential backoff, driven by the caller's [`RetryPolicy`]
/// - `multipart/form-data` encoding of [`MultipartForm`] bodies
/// - Per-request timeouts
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(1)
            .user_agent(concat!("airframe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }

    /// Convert bridge multipart form to a reqwest form
    fn convert_form(form: MultipartForm) -> Result<reqwest::multipart::Form> {
        let mut converted = reqwest::multipart::Form::new();

        for part in form.parts {
            let mut reqwest_part = reqwest::multipart::Part::bytes(part.data.to_vec());
            if let Some(file_name) = part.file_name {
                reqwest_part = reqwest_part.file_name(file_name);
            }
            if let Some(content_type) = part.content_type {
                reqwest_part = reqwest_part.mime_str(&content_type).map_err(|e| {
                    BridgeError::OperationFailed(format!(
                        "Invalid multipart content type '{}': {}",
                        content_type, e
                    ))
                })?;
            }
            converted = converted.part(part.field, reqwest_part);
        }

        Ok(converted)
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder> {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        // Multipart takes precedence over a raw body
        if let Some(form) = request.multipart {
            req = req.multipart(Self::convert_form(form)?);
        } else if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        Ok(req)
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Send `request` until it yields a final response or attempts run out.
    ///
    /// Retryable statuses (5xx, 429) are retried while attempts remain; the
    /// last response is returned as-is so callers can see the status.
    async fn send_with_policy(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let attempts = policy.max_attempts.max(1);
        // Query strings may carry credentials
        let endpoint = request.url.split('?').next().unwrap_or_default().to_string();

        for attempt in 1..=attempts {
            let last = attempt == attempts;
            debug!(attempt, attempts, method = ?request.method, url = %endpoint, "Sending HTTP request");

            match self.build_request(request.clone())?.send().await {
                Ok(response) => {
                    let response = Self::into_response(response).await?;
                    if last || !response.is_retryable() {
                        return Ok(response);
                    }
                    warn!(status = response.status, attempt, url = %endpoint, "Retryable HTTP status");
                }
                Err(e) if last => return Err(send_error(&e)),
                Err(e) => warn!(error = %e, attempt, url = %endpoint, "HTTP request failed"),
            }

            let delay = policy.backoff(attempt);
            debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
            sleep(delay).await;
        }

        Err(BridgeError::OperationFailed(
            "All retry attempts exhausted".to_string(),
        ))
    }
}

fn send_error(e: &reqwest::Error) -> BridgeError {
    if e.is_timeout() {
        BridgeError::OperationFailed("Request timed out".to_string())
    } else if e.is_connect() {
        BridgeError::OperationFailed(format!("Connection failed: {}", e))
    } else {
        BridgeError::OperationFailed(e.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    /// Sends with the default retry policy.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.send_with_policy(request, RetryPolicy::default()).await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.send_with_policy(request, policy).await
    }
}
