//! getIamPolicy / setIamPolicy / testIamPermissions on topics and subscriptions

use crate::gcp::client::GcpClient;
use crate::gcp::iam_policy::Policy;
use anyhow::{Context, Result};
use serde_json::json;

/// `resource` is `projects/p/topics/t` or `projects/p/subscriptions/s`
pub(crate) async fn get_policy(client: &GcpClient, resource: &str) -> Result<Policy> {
    client
        .get_as(&client.pubsub_url(&format!("{}:getIamPolicy", resource)))
        .await
        .context("IAM.Policy")
}

pub(crate) async fn set_policy(
    client: &GcpClient,
    resource: &str,
    policy: &Policy,
) -> Result<Policy> {
    let body = json!({ "policy": policy });
    client
        .post_as(&client.pubsub_url(&format!("{}:setIamPolicy", resource)), Some(&body))
        .await
        .context("IAM.SetPolicy")
}

/// Subset of `permissions` the caller holds on `resource`
pub(crate) async fn test_permissions(
    client: &GcpClient,
    resource: &str,
    permissions: &[&str],
) -> Result<Vec<String>> {
    let body = json!({ "permissions": permissions });
    let response = client
        .post(
            &client.pubsub_url(&format!("{}:testIamPermissions", resource)),
            Some(&body),
        )
        .await
        .context("IAM.TestPermissions")?;

    Ok(response
        .get("permissions")
        .and_then(|v| v.as_array())
        .map(|perms| {
            perms
                .iter()
                .filter_map(|p| p.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default())
}
