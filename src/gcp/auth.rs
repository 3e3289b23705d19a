//! GCP Authentication
//!
//! Handles authentication using Application Default Credentials (ADC),
//! service account keys, gcloud CLI credentials, or a pre-minted access token.

use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Environment variable holding a pre-minted access token
/// (e.g. the output of `gcloud auth print-access-token`)
pub const ACCESS_TOKEN_ENV: &str = "GCP_ACCESS_TOKEN";

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
enum TokenSource {
    Provider(Arc<dyn TokenProvider>),
    Static(String),
}

/// GCP credentials holder with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    source: TokenSource,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    /// Create credentials from Application Default Credentials, unless
    /// `GCP_ACCESS_TOKEN` is set, in which case that token is used as-is.
    pub async fn new() -> Result<Self> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                return Ok(Self::from_token(token.trim()));
            }
        }

        let provider = gcp_auth::provider().await.context(
            "Failed to initialize GCP authentication. Run 'gcloud auth application-default login'",
        )?;

        Ok(Self {
            source: TokenSource::Provider(provider),
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Credentials that always present the given bearer token
    pub fn from_token(token: &str) -> Self {
        Self {
            source: TokenSource::Static(token.to_string()),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> Result<String> {
        let provider = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Provider(provider) => provider,
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = provider
            .token(DEFAULT_SCOPES)
            .await
            .context("Failed to get access token")?;

        let token_str = token.as_str().to_string();
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }

    /// Project ID attached to the credentials (service account key or metadata server)
    pub async fn project_id(&self) -> Option<String> {
        match &self.source {
            TokenSource::Static(_) => None,
            TokenSource::Provider(provider) => provider
                .project_id()
                .await
                .ok()
                .map(|p| p.to_string())
                .filter(|p| validate_project_id(p)),
        }
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }

    // Default to ~/.config/gcloud on Linux/macOS
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
pub fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }

    match project.chars().next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }

    if project.ends_with('-') {
        return false;
    }

    project.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Read a `key = value` entry from a section of the active gcloud configuration
fn read_active_config_value(section: &str, key: &str) -> Option<String> {
    let config_dir = get_gcloud_config_dir()?;
    let active_config = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let config_name = active_config.trim();

    // Security: Validate config name to prevent path traversal
    if !config_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        tracing::warn!("Invalid characters in active_config name");
        return None;
    }

    let config_path = config_dir
        .join("configurations")
        .join(format!("config_{}", config_name));
    let content = std::fs::read_to_string(config_path).ok()?;

    parse_ini_value(&content, section, key)
}

/// Find `key` inside `[section]` of a gcloud-style INI file
pub fn parse_ini_value(content: &str, section: &str, key: &str) -> Option<String> {
    let header = format!("[{}]", section);
    let mut in_section = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_section = line == header;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                return Some(v.trim().to_string());
            }
        }
    }

    None
}

/// Read the default project from the environment or the gcloud configuration
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    read_active_config_value("core", "project").filter(|p| validate_project_id(p))
}

/// Get the default zone from the environment or the gcloud configuration
pub fn get_default_zone() -> Option<String> {
    if let Ok(zone) = std::env::var("CLOUDSDK_COMPUTE_ZONE") {
        return Some(zone);
    }
    read_active_config_value("compute", "zone")
}

/// Get the default region from the environment or the gcloud configuration
pub fn get_default_region() -> Option<String> {
    if let Ok(region) = std::env::var("CLOUDSDK_COMPUTE_REGION") {
        return Some(region);
    }
    read_active_config_value("compute", "region")
}

/// Location used by regional AI endpoints
pub fn get_default_location() -> Option<String> {
    std::env::var("GOOGLE_CLOUD_LOCATION").ok().filter(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_id() {
        assert!(validate_project_id("my-project-123"));
        assert!(!validate_project_id("short"));
        assert!(!validate_project_id("1starts-with-digit"));
        assert!(!validate_project_id("ends-with-hyphen-"));
        assert!(!validate_project_id("Has-Upper-Case"));
    }

    #[test]
    fn test_parse_ini_value_reads_section() {
        let content = "[core]\naccount = me@example.com\nproject = my-project-1\n\n[compute]\nzone = europe-west1-b\n";
        assert_eq!(parse_ini_value(content, "core", "project").as_deref(), Some("my-project-1"));
        assert_eq!(parse_ini_value(content, "compute", "zone").as_deref(), Some("europe-west1-b"));
        assert_eq!(parse_ini_value(content, "compute", "project"), None);
    }

    #[test]
    fn test_parse_ini_value_skips_comments() {
        let content = "[core]\n# project = commented-out\nproject = real-project\n";
        assert_eq!(parse_ini_value(content, "core", "project").as_deref(), Some("real-project"));
    }

    #[tokio::test]
    async fn test_static_token_is_returned() {
        let creds = GcpCredentials::from_token("abc");
        assert_eq!(creds.get_token().await.unwrap(), "abc");
        assert_eq!(creds.clone().get_token().await.unwrap(), "abc");
        assert!(creds.project_id().await.is_none());
    }
}
