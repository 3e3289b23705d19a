//! IAM v2 deny policies
//!
//! Deny policies hang off an attachment point, the URL-encoded full resource
//! name of the project. Every mutation returns a long-running operation.

use super::models::{DenyPolicy, DenyRule, Expr, PolicyRule};
use crate::gcp::client::GcpClient;
use crate::gcp::operation::{wait_operation, Operation};
use crate::gcp::pager::list_all_as;
use anyhow::{bail, Context, Result};
use std::io::Write;

/// `cloudresourcemanager.googleapis.com%2Fprojects%2F{project}`
pub fn attachment_point(project_id: &str) -> String {
    urlencoding::encode(&format!("cloudresourcemanager.googleapis.com/projects/{}", project_id))
        .into_owned()
}

fn policy_parent(project_id: &str) -> String {
    format!("policies/{}/denypolicies", attachment_point(project_id))
}

fn policy_path(project_id: &str, policy_id: &str) -> String {
    format!("{}/{}", policy_parent(project_id), policy_id)
}

/// Deny project deletion to everyone except the project admins group,
/// unless the project is tagged `test`.
pub fn sample_rule(condition: &str, title: &str) -> PolicyRule {
    PolicyRule {
        description: "block all principals from deleting projects".to_string(),
        deny_rule: Some(DenyRule {
            denied_principals: vec!["principalSet://goog/public:all".to_string()],
            exception_principals: vec![
                "principalSet://goog/group/project-admins@example.com".to_string(),
            ],
            denied_permissions: vec![
                "cloudresourcemanager.googleapis.com/projects.delete".to_string(),
            ],
            exception_permissions: Vec::new(),
            denial_condition: Some(Expr {
                expression: condition.to_string(),
                title: Some(title.to_string()),
            }),
        }),
    }
}

async fn finish(client: &GcpClient, op: Operation) -> Result<DenyPolicy> {
    let response = wait_operation(client, &client.endpoints.iam_v2(), op).await?;
    serde_json::from_value(response).context("Unexpected policy shape")
}

/// Create a deny policy with one rule
pub async fn create_deny_policy(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    policy_id: &str,
) -> Result<DenyPolicy> {
    let policy = DenyPolicy {
        display_name: "Restrict project deletion access".to_string(),
        rules: vec![sample_rule(
            "!resource.matchTag('12345678/env', 'test')",
            "Only for non-test projects",
        )],
        ..Default::default()
    };

    let url = crate::gcp::client::with_query(
        &client.iam_v2_url(&policy_parent(project_id)),
        &[("policyId", policy_id)],
    )?;
    let body = serde_json::to_value(&policy)?;
    let op: Operation = client
        .post_as(&url, Some(&body))
        .await
        .context("unable to create policy")?;
    let created = finish(client, op).await.context("unable to wait for the operation")?;

    writeln!(w, "Policy {} created", created.name)?;
    Ok(created)
}

/// Fetch a deny policy
pub async fn get_deny_policy(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    policy_id: &str,
) -> Result<DenyPolicy> {
    let policy: DenyPolicy = client
        .get_as(&client.iam_v2_url(&policy_path(project_id, policy_id)))
        .await
        .context("unable to get policy")?;

    writeln!(w, "Policy {} retrieved", policy.name)?;
    Ok(policy)
}

/// List the deny policies attached to a project
pub async fn list_deny_policies(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
) -> Result<Vec<DenyPolicy>> {
    let url = client.iam_v2_url(&policy_parent(project_id));
    let policies: Vec<DenyPolicy> = list_all_as(client, &url, "policies")
        .await
        .context("unable to list policies")?;

    for policy in &policies {
        writeln!(w, "- Policy {} found", policy.name)?;
    }
    Ok(policies)
}

/// Replace the rules of a deny policy. `etag` must match the stored policy.
pub async fn update_deny_policy(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    policy_id: &str,
    etag: &str,
) -> Result<DenyPolicy> {
    if etag.is_empty() {
        bail!("an etag is required to update a deny policy");
    }

    let name = format!("policies/{}/denypolicies/{}", attachment_point(project_id), policy_id);
    let policy = DenyPolicy {
        name: name.clone(),
        etag: Some(etag.to_string()),
        rules: vec![sample_rule(
            "!resource.matchTag('12345678/env', 'prod')",
            "Only for prod projects",
        )],
        ..Default::default()
    };

    let body = serde_json::to_value(&policy)?;
    let op: Operation = serde_json::from_value(
        client
            .put(&client.iam_v2_url(&name), &body)
            .await
            .context("unable to update policy")?,
    )
    .context("Unexpected operation shape")?;
    let updated = finish(client, op).await.context("unable to wait for the operation")?;

    writeln!(w, "Policy {} updated", updated.name)?;
    Ok(updated)
}

/// Delete a deny policy
pub async fn delete_deny_policy(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    policy_id: &str,
) -> Result<()> {
    let op: Operation = serde_json::from_value(
        client
            .delete(&client.iam_v2_url(&policy_path(project_id, policy_id)))
            .await
            .context("unable to delete policy")?,
    )
    .context("Unexpected operation shape")?;
    wait_operation(client, &client.endpoints.iam_v2(), op)
        .await
        .context("unable to wait for the operation")?;

    writeln!(w, "Policy {} deleted", policy_path(project_id, policy_id))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_point_is_url_encoded() {
        assert_eq!(
            attachment_point("my-project"),
            "cloudresourcemanager.googleapis.com%2Fprojects%2Fmy-project"
        );
    }

    #[test]
    fn test_policy_path() {
        assert_eq!(
            policy_path("p", "deny-1"),
            "policies/cloudresourcemanager.googleapis.com%2Fprojects%2Fp/denypolicies/deny-1"
        );
    }

    #[test]
    fn test_sample_rule_serializes_camel_case() {
        let value = serde_json::to_value(sample_rule("true", "t")).unwrap();
        let rule = &value["denyRule"];
        assert_eq!(rule["deniedPrincipals"][0], "principalSet://goog/public:all");
        assert_eq!(rule["denialCondition"]["expression"], "true");
        assert!(rule.get("exceptionPermissions").is_none());
    }
}
