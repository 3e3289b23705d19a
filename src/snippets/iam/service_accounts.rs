//! Service accounts

use super::models::ServiceAccount;
use crate::gcp::client::GcpClient;
use crate::gcp::pager::list_all_as;
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;

/// Resource name of an account addressed by email. `-` lets the API infer the project.
pub(crate) fn account_resource(email: &str) -> String {
    format!("projects/-/serviceAccounts/{}", email)
}

/// Create a service account
pub async fn create_service_account(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    name: &str,
    display_name: &str,
) -> Result<ServiceAccount> {
    let url = client.iam_url(&format!("projects/{}/serviceAccounts", project_id));
    let body = json!({
        "accountId": name,
        "serviceAccount": { "displayName": display_name },
    });

    let account: ServiceAccount = client
        .post_as(&url, Some(&body))
        .await
        .context("Projects.ServiceAccounts.Create")?;

    writeln!(w, "Created service account: {}", account.email)?;
    Ok(account)
}

/// List the service accounts of a project
pub async fn list_service_accounts(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
) -> Result<Vec<ServiceAccount>> {
    let url = client.iam_url(&format!("projects/{}/serviceAccounts", project_id));
    let accounts: Vec<ServiceAccount> = list_all_as(client, &url, "accounts")
        .await
        .context("Projects.ServiceAccounts.List")?;

    for account in &accounts {
        writeln!(w, "Listing service account: {}", account.name)?;
    }
    Ok(accounts)
}

/// Change a service account's display name
pub async fn rename_service_account(
    w: &mut dyn Write,
    client: &GcpClient,
    email: &str,
    new_display_name: &str,
) -> Result<ServiceAccount> {
    let url = client.iam_url(&account_resource(email));

    // Fetch first so a missing account fails before the patch
    let _current: ServiceAccount = client
        .get_as(&url)
        .await
        .context("Projects.ServiceAccounts.Get")?;

    let body = json!({
        "serviceAccount": { "displayName": new_display_name },
        "updateMask": "displayName",
    });
    let account: ServiceAccount = client
        .patch_as(&url, &body)
        .await
        .context("Projects.ServiceAccounts.Patch")?;

    writeln!(w, "Updated service account: {}", account.email)?;
    Ok(account)
}

/// Disable a service account
pub async fn disable_service_account(
    w: &mut dyn Write,
    client: &GcpClient,
    email: &str,
) -> Result<()> {
    let url = client.iam_url(&format!("{}:disable", account_resource(email)));
    client
        .post(&url, Some(&json!({})))
        .await
        .context("Projects.ServiceAccounts.Disable")?;

    writeln!(w, "Disabled service account: {}", email)?;
    Ok(())
}

/// Enable a service account
pub async fn enable_service_account(
    w: &mut dyn Write,
    client: &GcpClient,
    email: &str,
) -> Result<()> {
    let url = client.iam_url(&format!("{}:enable", account_resource(email)));
    client
        .post(&url, Some(&json!({})))
        .await
        .context("Projects.ServiceAccounts.Enable")?;

    writeln!(w, "Enabled service account: {}", email)?;
    Ok(())
}

/// Delete a service account
pub async fn delete_service_account(
    w: &mut dyn Write,
    client: &GcpClient,
    email: &str,
) -> Result<()> {
    client
        .delete(&client.iam_url(&account_resource(email)))
        .await
        .context("Projects.ServiceAccounts.Delete")?;

    writeln!(w, "Deleted service account: {}", email)?;
    Ok(())
}
