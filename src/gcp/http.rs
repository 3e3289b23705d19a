//! HTTP utilities for GCP REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// A non-2xx response from a Google API
#[derive(Debug, Clone, thiserror::Error)]
#[error("API request failed: {status} {message}")]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// `error.message` from the Google error envelope, or the raw body
    pub message: String,
}

impl ApiError {
    /// Build from a status and the raw response body
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| sanitize_for_log(body));

        Self { status, message }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }
}

/// True if the error chain carries an [`ApiError`] with status 404
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .chain()
        .find_map(|e| e.downcast_ref::<ApiError>())
        .map(ApiError::is_not_found)
        .unwrap_or(false)
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gcp-snippets/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        self.send(Method::GET, url, token, None).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, token: &str, body: Option<&Value>) -> Result<Value> {
        self.send(Method::POST, url, token, body).await
    }

    /// Make a PATCH request to a GCP API
    pub async fn patch(&self, url: &str, token: &str, body: &Value) -> Result<Value> {
        self.send(Method::PATCH, url, token, Some(body)).await
    }

    /// Make a PUT request to a GCP API
    pub async fn put(&self, url: &str, token: &str, body: &Value) -> Result<Value> {
        self.send(Method::PUT, url, token, Some(body)).await
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete(&self, url: &str, token: &str) -> Result<Value> {
        self.send(Method::DELETE, url, token, None).await
    }

    /// POST and return the response unread, for bodies consumed as a stream
    pub async fn post_stream(&self, url: &str, token: &str, body: &Value) -> Result<Response> {
        tracing::debug!("POST {} (streaming)", url);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let response_body = response
                .text()
                .await
                .context("Failed to read response body")?;
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(ApiError::from_body(status.as_u16(), &response_body).into());
        }

        Ok(response)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        tracing::debug!("{} {}", method, url);

        let mut request: RequestBuilder = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(ApiError::from_body(status.as_u16(), &response_body).into());
        }

        if response_body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_body).context("Failed to parse response JSON")
    }
}

/// Format a GCP API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    if let Some(api) = error.chain().find_map(|e| e.downcast_ref::<ApiError>()) {
        return match api.status {
            401 => {
                "Authentication failed. Run 'gcloud auth application-default login'.".to_string()
            }
            403 => "Permission denied. Check your GCP IAM permissions.".to_string(),
            404 => "Resource not found.".to_string(),
            409 => "Resource conflict. The resource may already exist or be in use.".to_string(),
            429 => "Rate limit exceeded. Please try again later.".to_string(),
            400 => format!("Invalid request: {}", truncate(&api.message, 120)),
            500 | 503 => "GCP service temporarily unavailable. Please try again.".to_string(),
            _ => format!("Request failed ({}).", api.status),
        };
    }

    // Show the outermost context plus the root cause, trimmed
    let root = error.root_cause().to_string();
    let top = error.to_string();
    let message = if top == root {
        top
    } else {
        format!("{}: {}", top, root)
    };
    truncate(&message, 160)
}

fn truncate(message: &str, max: usize) -> String {
    let sanitized: String = message
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(max)
        .collect();

    if sanitized.len() < message.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
