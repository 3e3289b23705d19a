//! Project-level allow policy (read-modify-write)

use crate::gcp::client::GcpClient;
use crate::gcp::iam_policy::Policy;
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;

/// Fetch the project's allow policy
pub async fn get_project_policy(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
) -> Result<Policy> {
    let url = client.resourcemanager_url(&format!("projects/{}:getIamPolicy", project_id));
    let policy: Policy = client
        .post_as(&url, Some(&json!({})))
        .await
        .context("Projects.GetIamPolicy")?;

    for role in policy.roles() {
        writeln!(w, "{}: {}", role, policy.members(role).join(", "))?;
    }
    Ok(policy)
}

/// Replace the project's allow policy. The policy's etag guards against
/// concurrent edits.
pub async fn set_project_policy(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    policy: &Policy,
) -> Result<Policy> {
    let url = client.resourcemanager_url(&format!("projects/{}:setIamPolicy", project_id));
    let body = json!({ "policy": policy });
    let updated: Policy = client
        .post_as(&url, Some(&body))
        .await
        .context("Projects.SetIamPolicy")?;

    writeln!(w, "Policy set for project {}", project_id)?;
    Ok(updated)
}

/// Add a new binding granting `role` to `member`
pub async fn add_binding(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    member: &str,
    role: &str,
) -> Result<Policy> {
    let mut policy = get_project_policy(&mut std::io::sink(), client, project_id).await?;
    policy.add(member, role);
    let policy = set_project_policy(&mut std::io::sink(), client, project_id, &policy).await?;

    writeln!(w, "Added binding {} to {}", role, member)?;
    Ok(policy)
}

/// Add `member` to the existing binding for `role`
pub async fn add_member(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    member: &str,
    role: &str,
) -> Result<Policy> {
    let mut policy = get_project_policy(&mut std::io::sink(), client, project_id).await?;
    if !policy.roles().contains(&role) {
        anyhow::bail!("role {} is not bound in project {}", role, project_id);
    }
    policy.add(member, role);
    let policy = set_project_policy(&mut std::io::sink(), client, project_id, &policy).await?;

    writeln!(w, "Added member {} to {}", member, role)?;
    Ok(policy)
}

/// Remove `member` from the binding for `role`
pub async fn remove_member(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    member: &str,
    role: &str,
) -> Result<Policy> {
    let mut policy = get_project_policy(&mut std::io::sink(), client, project_id).await?;
    if !policy.remove(member, role) {
        writeln!(w, "Role {} not found in policy for {}", role, member)?;
        return Ok(policy);
    }
    let policy = set_project_policy(&mut std::io::sink(), client, project_id, &policy).await?;

    writeln!(w, "Removed member {} from {}", member, role)?;
    Ok(policy)
}
