//! Custom and predefined roles

use super::models::{Permission, Role};
use crate::gcp::client::GcpClient;
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::io::Write;

fn project_role(project_id: &str, role_id: &str) -> String {
    format!("projects/{}/roles/{}", project_id, role_id)
}

/// Collect every page of a POST-paginated query (`pageToken` travels in the body)
async fn query_all(
    client: &GcpClient,
    url: &str,
    mut body: Value,
    field: &str,
) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    loop {
        let response = client.post(url, Some(&body)).await?;
        if let Some(page) = response.get(field).and_then(|v| v.as_array()) {
            items.extend(page.iter().cloned());
        }
        match response.get("nextPageToken").and_then(|v| v.as_str()) {
            Some(token) if !token.is_empty() => body["pageToken"] = json!(token),
            _ => break,
        }
    }
    Ok(items)
}

/// Roles that can be granted on a resource
/// (e.g. `//cloudresourcemanager.googleapis.com/projects/my-project`)
pub async fn view_grantable_roles(
    w: &mut dyn Write,
    client: &GcpClient,
    full_resource_name: &str,
) -> Result<Vec<Role>> {
    let url = client.iam_url("roles:queryGrantableRoles");
    let items = query_all(client, &url, json!({ "fullResourceName": full_resource_name }), "roles")
        .await
        .context("QueryGrantableRoles")?;

    let roles: Vec<Role> = items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()
        .context("Unexpected role shape")?;

    for role in &roles {
        writeln!(w, "Title: {}", role.title)?;
        writeln!(w, "Name: {}", role.name)?;
        writeln!(w, "Description: {}", role.description)?;
        writeln!(w)?;
    }
    Ok(roles)
}

/// Permissions that can be tested on a resource
pub async fn query_testable_permissions(
    w: &mut dyn Write,
    client: &GcpClient,
    full_resource_name: &str,
) -> Result<Vec<Permission>> {
    let url = client.iam_url("permissions:queryTestablePermissions");
    let items = query_all(
        client,
        &url,
        json!({ "fullResourceName": full_resource_name }),
        "permissions",
    )
    .await
    .context("QueryTestablePermissions")?;

    let permissions: Vec<Permission> = items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()
        .context("Unexpected permission shape")?;

    for permission in &permissions {
        writeln!(w, "{}", permission.name)?;
    }
    Ok(permissions)
}

/// Get a role by full name (`roles/viewer` or `projects/p/roles/r`)
pub async fn get_role(w: &mut dyn Write, client: &GcpClient, name: &str) -> Result<Role> {
    let role: Role = client
        .get_as(&client.iam_url(name))
        .await
        .context("Roles.Get")?;

    writeln!(w, "{}", role.name)?;
    for permission in &role.included_permissions {
        writeln!(w, "{}", permission)?;
    }
    Ok(role)
}

/// Create a custom project role
#[allow(clippy::too_many_arguments)]
pub async fn create_role(
    w: &mut dyn Write,
    client: &GcpClient,
    role_id: &str,
    project_id: &str,
    title: &str,
    description: &str,
    permissions: &[String],
    stage: &str,
) -> Result<Role> {
    let url = client.iam_url(&format!("projects/{}/roles", project_id));
    let body = json!({
        "roleId": role_id,
        "role": {
            "title": title,
            "description": description,
            "includedPermissions": permissions,
            "stage": stage,
        },
    });

    let role: Role = client
        .post_as(&url, Some(&body))
        .await
        .context("Projects.Roles.Create")?;

    writeln!(w, "Created role: {}", role.name)?;
    Ok(role)
}

async fn patch_role(client: &GcpClient, resource: &str, role: &Role) -> Result<Role> {
    let body = serde_json::to_value(role)?;
    client
        .patch_as(&client.iam_url(resource), &body)
        .await
        .context("Projects.Roles.Patch")
}

/// Replace title, description, permissions and stage of a custom role
#[allow(clippy::too_many_arguments)]
pub async fn edit_role(
    w: &mut dyn Write,
    client: &GcpClient,
    role_id: &str,
    project_id: &str,
    new_title: &str,
    new_description: &str,
    new_permissions: &[String],
    new_stage: &str,
) -> Result<Role> {
    let resource = project_role(project_id, role_id);
    let mut role: Role = client
        .get_as(&client.iam_url(&resource))
        .await
        .context("Projects.Roles.Get")?;

    role.title = new_title.to_string();
    role.description = new_description.to_string();
    role.included_permissions = new_permissions.to_vec();
    role.stage = Some(new_stage.to_string());

    let role = patch_role(client, &resource, &role).await?;
    writeln!(w, "Updated role: {}", role.name)?;
    Ok(role)
}

/// Set a custom role's launch stage to DISABLED
pub async fn disable_role(
    w: &mut dyn Write,
    client: &GcpClient,
    role_id: &str,
    project_id: &str,
) -> Result<Role> {
    let resource = project_role(project_id, role_id);
    let mut role: Role = client
        .get_as(&client.iam_url(&resource))
        .await
        .context("Projects.Roles.Get")?;

    role.stage = Some("DISABLED".to_string());

    let role = patch_role(client, &resource, &role).await?;
    writeln!(w, "Disabled role: {}", role.name)?;
    Ok(role)
}

/// List custom roles of a project
pub async fn list_roles(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
) -> Result<Vec<Role>> {
    let url = client.iam_url(&format!("projects/{}/roles", project_id));
    let roles: Vec<Role> = crate::gcp::pager::list_all_as(client, &url, "roles")
        .await
        .context("Projects.Roles.List")?;

    for role in &roles {
        writeln!(w, "{}", role.name)?;
    }
    Ok(roles)
}

/// Soft-delete a custom role (it can be undeleted for 7 days)
pub async fn delete_role(
    w: &mut dyn Write,
    client: &GcpClient,
    role_id: &str,
    project_id: &str,
) -> Result<()> {
    client
        .delete(&client.iam_url(&project_role(project_id, role_id)))
        .await
        .context("Projects.Roles.Delete")?;

    writeln!(w, "Deleted role: {}", role_id)?;
    Ok(())
}

/// Restore a soft-deleted custom role
pub async fn undelete_role(
    w: &mut dyn Write,
    client: &GcpClient,
    role_id: &str,
    project_id: &str,
) -> Result<Role> {
    let url = client.iam_url(&format!("{}:undelete", project_role(project_id, role_id)));
    let role: Role = client
        .post_as(&url, Some(&json!({})))
        .await
        .context("Projects.Roles.Undelete")?;

    writeln!(w, "Undeleted role: {}", role.name)?;
    Ok(role)
}
