//! Device registries

use super::models::{DeviceRegistry, EventNotificationConfig};
use crate::gcp::client::GcpClient;
use crate::gcp::iam_policy::{Binding, Policy};
use crate::gcp::pager::list_all_as;
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Write;

pub(crate) fn registry_path(project_id: &str, region: &str, registry_id: &str) -> String {
    format!("projects/{}/locations/{}/registries/{}", project_id, region, registry_id)
}

/// Create a registry publishing device telemetry to `topic_name`
/// (`projects/p/topics/t`)
pub async fn create_registry(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    topic_name: &str,
) -> Result<DeviceRegistry> {
    let registry = DeviceRegistry {
        id: registry_id.to_string(),
        event_notification_configs: vec![EventNotificationConfig {
            pubsub_topic_name: topic_name.to_string(),
        }],
        ..Default::default()
    };
    let url =
        client.cloudiot_url(&format!("projects/{}/locations/{}/registries", project_id, region));
    let created: DeviceRegistry = client
        .post_as(&url, Some(&serde_json::to_value(&registry)?))
        .await
        .context("Registries.Create")?;

    writeln!(w, "Created registry:")?;
    writeln!(w, "\tID: {}", created.id)?;
    writeln!(
        w,
        "\tHTTP: {}",
        created.http_config.as_ref().map(|c| c.http_enabled_state.as_str()).unwrap_or_default()
    )?;
    writeln!(
        w,
        "\tMQTT: {}",
        created.mqtt_config.as_ref().map(|c| c.mqtt_enabled_state.as_str()).unwrap_or_default()
    )?;
    writeln!(w, "\tName: {}", created.name)?;
    Ok(created)
}

pub async fn delete_registry(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
) -> Result<()> {
    client
        .delete(&client.cloudiot_url(&registry_path(project_id, region, registry_id)))
        .await
        .context("Registries.Delete")?;

    writeln!(w, "Deleted registry")?;
    Ok(())
}

pub async fn get_registry(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
) -> Result<DeviceRegistry> {
    let registry: DeviceRegistry = client
        .get_as(&client.cloudiot_url(&registry_path(project_id, region, registry_id)))
        .await
        .context("Registries.Get")?;

    writeln!(w, "Got registry:")?;
    writeln!(w, "\tID: {}", registry.id)?;
    writeln!(w, "\tName: {}", registry.name)?;
    Ok(registry)
}

pub async fn list_registries(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
) -> Result<Vec<DeviceRegistry>> {
    let url =
        client.cloudiot_url(&format!("projects/{}/locations/{}/registries", project_id, region));
    let registries: Vec<DeviceRegistry> = list_all_as(client, &url, "deviceRegistries")
        .await
        .context("Registries.List")?;

    writeln!(w, "Registries:")?;
    for registry in &registries {
        writeln!(w, "\t{}", registry.name)?;
    }
    Ok(registries)
}

pub async fn get_registry_iam(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
) -> Result<Policy> {
    let url = client.cloudiot_url(&format!(
        "{}:getIamPolicy",
        registry_path(project_id, region, registry_id)
    ));
    let policy: Policy = client
        .post_as(&url, Some(&json!({})))
        .await
        .context("Registries.GetIamPolicy")?;

    writeln!(w, "Policy:")?;
    for binding in &policy.bindings {
        writeln!(w, "Role: {}", binding.role)?;
        for member in &binding.members {
            writeln!(w, "\tMember: {}", member)?;
        }
    }
    Ok(policy)
}

/// Replace the registry policy with a single binding
pub async fn set_registry_iam(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    member: &str,
    role: &str,
) -> Result<Policy> {
    let policy = Policy {
        bindings: vec![Binding {
            role: role.to_string(),
            members: vec![member.to_string()],
            condition: None,
        }],
        ..Default::default()
    };
    let url = client.cloudiot_url(&format!(
        "{}:setIamPolicy",
        registry_path(project_id, region, registry_id)
    ));
    let updated: Policy = client
        .post_as(&url, Some(&json!({ "policy": policy })))
        .await
        .context("Registries.SetIamPolicy")?;

    writeln!(w, "Set policy!")?;
    Ok(updated)
}
