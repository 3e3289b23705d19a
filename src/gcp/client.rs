//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication,
//! HTTP functionality, per-service endpoints and the LRO poll policy.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use super::operation::PollPolicy;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Root URLs of the Google APIs used by the snippets.
///
/// By default every service resolves to its public host. Setting a base URL
/// (an emulator, a proxy or a mock server) routes every service to that host
/// while keeping each API's path prefix.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    base: Option<String>,
}

impl Endpoints {
    /// Route every service to `base` (e.g. `http://127.0.0.1:8085`)
    pub fn with_base_url(base: &str) -> Self {
        Self {
            base: Some(base.trim_end_matches('/').to_string()),
        }
    }

    fn host(&self, default_host: &str) -> String {
        match &self.base {
            Some(base) => base.clone(),
            None => format!("https://{}", default_host),
        }
    }

    pub fn compute(&self) -> String {
        format!("{}/compute/v1", self.host("compute.googleapis.com"))
    }

    pub fn iam_v1(&self) -> String {
        format!("{}/v1", self.host("iam.googleapis.com"))
    }

    pub fn iam_v2(&self) -> String {
        format!("{}/v2", self.host("iam.googleapis.com"))
    }

    pub fn resourcemanager(&self) -> String {
        format!("{}/v1", self.host("cloudresourcemanager.googleapis.com"))
    }

    pub fn pubsub(&self) -> String {
        format!("{}/v1", self.host("pubsub.googleapis.com"))
    }

    /// Pub/Sub Lite admin API is served from a regional host
    pub fn pubsublite_admin(&self, region: &str) -> String {
        format!(
            "{}/v1/admin",
            self.host(&format!("{}-pubsublite.googleapis.com", region))
        )
    }

    pub fn cloudiot(&self) -> String {
        format!("{}/v1", self.host("cloudiot.googleapis.com"))
    }

    pub fn storagetransfer(&self) -> String {
        format!("{}/v1", self.host("storagetransfer.googleapis.com"))
    }

    pub fn translate(&self) -> String {
        format!("{}/v3", self.host("translation.googleapis.com"))
    }

    /// Vertex AI is served from a regional host
    pub fn aiplatform(&self, location: &str) -> String {
        format!(
            "{}/v1",
            self.host(&format!("{}-aiplatform.googleapis.com", location))
        )
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub endpoints: Endpoints,
    pub poll: PollPolicy,
}

impl GcpClient {
    /// Create a new GCP client using Application Default Credentials
    pub async fn new() -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(credentials)
    }

    /// Create a client from explicit credentials
    pub fn with_credentials(credentials: GcpCredentials) -> Result<Self> {
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            endpoints: Endpoints::default(),
            poll: PollPolicy::default(),
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.post(url, &token, body).await
    }

    /// Make a POST request whose response body is read as a stream
    pub async fn post_stream(&self, url: &str, body: &Value) -> Result<reqwest::Response> {
        let token = self.get_token().await?;
        self.http.post_stream(url, &token, body).await
    }

    /// Make a PATCH request to a GCP API
    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.patch(url, &token, body).await
    }

    /// Make a PUT request to a GCP API
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.put(url, &token, body).await
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.delete(url, &token).await
    }

    /// GET and deserialize into `T`
    pub async fn get_as<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let value = self.get(url).await?;
        serde_json::from_value(value).context("Unexpected response shape")
    }

    /// POST and deserialize into `T`
    pub async fn post_as<T: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let value = self.post(url, body).await?;
        serde_json::from_value(value).context("Unexpected response shape")
    }

    /// PATCH and deserialize into `T`
    pub async fn patch_as<T: DeserializeOwned>(&self, url: &str, body: &Value) -> Result<T> {
        let value = self.patch(url, body).await?;
        serde_json::from_value(value).context("Unexpected response shape")
    }

    // =========================================================================
    // Compute Engine API helpers
    // =========================================================================

    /// Build Compute Engine API URL
    pub fn compute_url(&self, project: &str, path: &str) -> String {
        format!("{}/projects/{}/{}", self.endpoints.compute(), project, path)
    }

    /// Build zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, project: &str, zone: &str, resource: &str) -> String {
        self.compute_url(project, &format!("zones/{}/{}", zone, resource))
    }

    /// Build regional Compute Engine API URL
    pub fn compute_regional_url(&self, project: &str, region: &str, resource: &str) -> String {
        self.compute_url(project, &format!("regions/{}/{}", region, resource))
    }

    /// Build global Compute Engine API URL
    pub fn compute_global_url(&self, project: &str, resource: &str) -> String {
        self.compute_url(project, &format!("global/{}", resource))
    }

    /// Build aggregated Compute Engine API URL (all zones)
    pub fn compute_aggregated_url(&self, project: &str, resource: &str) -> String {
        self.compute_url(project, &format!("aggregated/{}", resource))
    }

    // =========================================================================
    // IAM / Resource Manager API helpers
    // =========================================================================

    /// Build IAM v1 API URL
    pub fn iam_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.iam_v1(), path)
    }

    /// Build IAM v2 API URL (deny policies)
    pub fn iam_v2_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.iam_v2(), path)
    }

    /// Build Resource Manager API URL
    pub fn resourcemanager_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.resourcemanager(), path)
    }

    // =========================================================================
    // Pub/Sub API helpers
    // =========================================================================

    /// Build Pub/Sub API URL
    pub fn pubsub_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.pubsub(), path)
    }

    /// Build Pub/Sub Lite admin URL for the region of `location` (zone or region)
    pub fn pubsublite_url(&self, location: &str, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoints.pubsublite_admin(&region_of(location)),
            path
        )
    }

    // =========================================================================
    // Other services
    // =========================================================================

    /// Build Cloud IoT Core API URL
    pub fn cloudiot_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.cloudiot(), path)
    }

    /// Build Storage Transfer API URL
    pub fn storagetransfer_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.storagetransfer(), path)
    }

    /// Build Cloud Translation v3 API URL
    pub fn translate_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoints.translate(), path)
    }

    /// Build Vertex AI API URL for a location
    pub fn aiplatform_url(&self, location: &str, path: &str) -> String {
        format!("{}/{}", self.endpoints.aiplatform(location), path)
    }
}

/// Region of a zone (`us-central1-a` -> `us-central1`); regions pass through
pub fn region_of(location: &str) -> String {
    let parts: Vec<&str> = location.split('-').collect();
    if parts.len() == 3 && parts[2].len() == 1 {
        format!("{}-{}", parts[0], parts[1])
    } else {
        location.to_string()
    }
}

/// Append query parameters to a URL, percent-encoding values
pub fn with_query(url: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut parsed = url::Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    {
        let mut pairs = parsed.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(parsed.to_string())
}

/// Format a GCP API error for display
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    super::http::format_gcp_error(error)
}
