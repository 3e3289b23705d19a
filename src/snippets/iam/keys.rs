//! Service account keys

use super::models::ServiceAccountKey;
use super::service_accounts::account_resource;
use crate::gcp::client::GcpClient;
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;

/// Create a new key. The returned key carries `privateKeyData`, which is
/// never retrievable again.
pub async fn create_key(
    w: &mut dyn Write,
    client: &GcpClient,
    service_account_email: &str,
) -> Result<ServiceAccountKey> {
    let url = client.iam_url(&format!("{}/keys", account_resource(service_account_email)));
    let key: ServiceAccountKey = client
        .post_as(&url, Some(&json!({})))
        .await
        .context("Projects.ServiceAccounts.Keys.Create")?;

    writeln!(w, "Created key: {}", key.name)?;
    Ok(key)
}

/// List the keys of a service account
pub async fn list_keys(
    w: &mut dyn Write,
    client: &GcpClient,
    service_account_email: &str,
) -> Result<Vec<ServiceAccountKey>> {
    let url = client.iam_url(&format!("{}/keys", account_resource(service_account_email)));
    let response = client
        .get(&url)
        .await
        .context("Projects.ServiceAccounts.Keys.List")?;

    let keys: Vec<ServiceAccountKey> = match response.get("keys") {
        Some(keys) => serde_json::from_value(keys.clone()).context("Unexpected key shape")?,
        None => Vec::new(),
    };

    for key in &keys {
        writeln!(w, "Listing key: {}", key.name)?;
    }
    Ok(keys)
}

/// Delete a key by full name (`projects/p/serviceAccounts/e/keys/k`)
pub async fn delete_key(w: &mut dyn Write, client: &GcpClient, full_key_name: &str) -> Result<()> {
    client
        .delete(&client.iam_url(full_key_name))
        .await
        .context("Projects.ServiceAccounts.Keys.Delete")?;

    writeln!(w, "Deleted key: {}", full_key_name)?;
    Ok(())
}
