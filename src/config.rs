//! Configuration Management
//!
//! Persistent defaults for gcp-snippets, stored as JSON under the user's
//! config directory. Resolution order for every setting is
//! command line > config file > gcloud / environment > built-in default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ZONE: &str = "us-central1-a";
pub const DEFAULT_LOCATION: &str = "us-central1";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Default project ID
    #[serde(default)]
    pub project_id: Option<String>,
    /// Default Compute Engine zone
    #[serde(default)]
    pub zone: Option<String>,
    /// Default region (IoT, Pub/Sub Lite reservations)
    #[serde(default)]
    pub region: Option<String>,
    /// Default Vertex AI location
    #[serde(default)]
    pub location: Option<String>,
    /// Base URL replacing every Google API host (emulators, proxies)
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcp-snippets").join("config.json"))
    }

    /// Load configuration from disk. A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Effective project (CLI > config > gcloud/env). Empty if none is known.
    pub fn effective_project(&self, cli: Option<&str>) -> String {
        cli.map(String::from)
            .or_else(|| self.project_id.clone())
            .or_else(crate::gcp::auth::get_default_project)
            .unwrap_or_default()
    }

    /// Effective zone (CLI > config > gcloud > us-central1-a)
    pub fn effective_zone(&self, cli: Option<&str>) -> String {
        cli.map(String::from)
            .or_else(|| self.zone.clone())
            .or_else(crate::gcp::auth::get_default_zone)
            .unwrap_or_else(|| DEFAULT_ZONE.to_string())
    }

    /// Effective region (CLI > config > gcloud > region of the effective zone)
    pub fn effective_region(&self, cli: Option<&str>, zone: &str) -> String {
        cli.map(String::from)
            .or_else(|| self.region.clone())
            .or_else(crate::gcp::auth::get_default_region)
            .unwrap_or_else(|| crate::gcp::client::region_of(zone))
    }

    /// Effective Vertex AI location (CLI > config > GOOGLE_CLOUD_LOCATION > us-central1)
    pub fn effective_location(&self, cli: Option<&str>) -> String {
        cli.map(String::from)
            .or_else(|| self.location.clone())
            .or_else(crate::gcp::auth::get_default_location)
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string())
    }

    /// Endpoint override (CLI > config)
    pub fn effective_endpoint(&self, cli: Option<&str>) -> Option<String> {
        cli.map(String::from).or_else(|| self.endpoint.clone())
    }

    /// Set project and save
    pub fn set_project(&mut self, project_id: &str) -> Result<()> {
        self.project_id = Some(project_id.to_string());
        self.save()
    }

    /// Set zone and save
    pub fn set_zone(&mut self, zone: &str) -> Result<()> {
        self.zone = Some(zone.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            project_id: Some("my-project".to_string()),
            zone: Some("europe-west1-b".to_string()),
            endpoint: Some("http://localhost:8085".to_string()),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_missing_or_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(Config::load_from(&path), Config::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config {
            project_id: Some("from-config".to_string()),
            zone: Some("asia-east1-a".to_string()),
            location: Some("europe-west4".to_string()),
            endpoint: Some("http://config".to_string()),
            ..Default::default()
        };

        assert_eq!(config.effective_project(Some("from-cli")), "from-cli");
        assert_eq!(config.effective_project(None), "from-config");
        assert_eq!(config.effective_zone(None), "asia-east1-a");
        assert_eq!(config.effective_location(Some("us-east4")), "us-east4");
        assert_eq!(config.effective_location(None), "europe-west4");
        assert_eq!(config.effective_endpoint(None).as_deref(), Some("http://config"));
        assert_eq!(config.effective_endpoint(Some("http://cli")).as_deref(), Some("http://cli"));
    }

    #[test]
    fn test_region_from_config() {
        let config = Config {
            region: Some("us-west2".to_string()),
            ..Default::default()
        };
        assert_eq!(config.effective_region(None, "us-central1-a"), "us-west2");
        assert_eq!(config.effective_region(Some("asia-south1"), "us-central1-a"), "asia-south1");
    }
}
