//! Compute Engine instance lifecycle

use super::custom_machine_type::CustomMachineType;
use super::models::Instance;
use crate::gcp::client::{with_query, GcpClient};
use crate::gcp::operation::{short_name, wait_compute_operation, ComputeOperation};
use crate::gcp::pager::{list_aggregated, list_all_as};
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::io::Write;

/// Wait on an operation started against `zone`
async fn wait_zonal(
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    mut op: ComputeOperation,
) -> Result<ComputeOperation> {
    if op.zone.is_none() && op.region.is_none() {
        op.zone = Some(zone.to_string());
    }
    wait_compute_operation(client, project_id, op).await
}

fn instance_body(name: &str, machine_type: &str, source_image: &str, network: &str) -> Value {
    json!({
        "name": name,
        "machineType": machine_type,
        "disks": [{
            "initializeParams": {
                "diskSizeGb": "10",
                "sourceImage": source_image,
            },
            "autoDelete": true,
            "boot": true,
            "type": "PERSISTENT",
        }],
        "networkInterfaces": [{
            "network": network,
        }],
    })
}

async fn insert_instance(
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    body: &Value,
) -> Result<()> {
    let url = client.compute_zonal_url(project_id, zone, "instances");
    post_insert(client, project_id, zone, &url, body).await
}

async fn post_insert(
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    url: &str,
    body: &Value,
) -> Result<()> {
    let op: ComputeOperation = client
        .post_as(url, Some(body))
        .await
        .context("unable to create instance")?;
    wait_zonal(client, project_id, zone, op)
        .await
        .context("unable to wait for the operation")?;
    Ok(())
}

/// Create an instance with a 10 GB boot disk from `source_image`, attached to `network`
/// (e.g. `global/networks/default`).
#[allow(clippy::too_many_arguments)]
pub async fn create_instance(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
    machine_type: &str,
    source_image: &str,
    network: &str,
) -> Result<()> {
    let machine_type = format!("zones/{}/machineTypes/{}", zone, machine_type);
    let body = instance_body(instance_name, &machine_type, source_image, network);
    insert_instance(client, project_id, zone, &body).await?;

    writeln!(w, "Instance created")?;
    Ok(())
}

/// Create an instance using a custom machine shape
pub async fn create_instance_with_custom_machine_type(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
    machine_type: &CustomMachineType,
) -> Result<()> {
    if machine_type.zone() != zone {
        bail!(
            "machine type {} belongs to zone {}, not {}",
            machine_type.short_name(),
            machine_type.zone(),
            zone
        );
    }

    let body = instance_body(
        instance_name,
        &machine_type.uri(),
        "projects/debian-cloud/global/images/family/debian-12",
        "global/networks/default",
    );
    insert_instance(client, project_id, zone, &body).await?;

    writeln!(w, "Instance created with machine type {}", machine_type.short_name())?;
    Ok(())
}

/// Fetch an instance template as raw JSON
async fn get_instance_template(
    client: &GcpClient,
    project_id: &str,
    template_name: &str,
) -> Result<Value> {
    let url =
        client.compute_global_url(project_id, &format!("instanceTemplates/{}", template_name));
    client.get(&url).await.context("unable to get instance template")
}

fn template_self_link(template: &Value) -> Result<&str> {
    template
        .get("selfLink")
        .and_then(Value::as_str)
        .context("instance template has no selfLink")
}

/// Create an instance from a template, replacing its machine type and adding a
/// second 10 GB disk from `new_disk_source_image`.
///
/// Overriding `disks` replaces the template's list, so the template disks are
/// sent again with their disk types rewritten as zonal paths.
#[allow(clippy::too_many_arguments)]
pub async fn create_instance_from_template_with_overrides(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
    template_name: &str,
    machine_type: &str,
    new_disk_source_image: &str,
) -> Result<()> {
    let template = get_instance_template(client, project_id, template_name).await?;
    let self_link = template_self_link(&template)?;

    let mut disks: Vec<Value> = template
        .pointer("/properties/disks")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for disk in &mut disks {
        let disk_type = disk
            .pointer("/initializeParams/diskType")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(|t| format!("zones/{}/diskTypes/{}", zone, t));
        if let Some(disk_type) = disk_type {
            disk["initializeParams"]["diskType"] = Value::String(disk_type);
        }
    }
    disks.push(json!({
        "initializeParams": {
            "diskSizeGb": "10",
            "sourceImage": new_disk_source_image,
        },
        "autoDelete": true,
        "boot": false,
        "type": "PERSISTENT",
    }));

    let body = json!({
        "name": instance_name,
        "machineType": format!("zones/{}/machineTypes/{}", zone, machine_type),
        "disks": disks,
    });
    let url = with_query(
        &client.compute_zonal_url(project_id, zone, "instances"),
        &[("sourceInstanceTemplate", self_link)],
    )?;
    post_insert(client, project_id, zone, &url, &body).await?;

    writeln!(w, "Instance created")?;
    Ok(())
}

/// Create `count` instances from a template in one `bulkInsert` call, then list
/// them back by the `bulk_batch` label stamped on this batch.
///
/// `name_pattern` needs one run of `#` placeholders, e.g. `inst-####`.
pub async fn bulk_insert_instances(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    template_name: &str,
    count: u32,
    name_pattern: &str,
) -> Result<Vec<Instance>> {
    if count == 0 {
        bail!("count must be at least 1");
    }
    if !name_pattern.contains('#') {
        bail!("name pattern {} has no # placeholder", name_pattern);
    }

    let template = get_instance_template(client, project_id, template_name).await?;
    let batch = uuid::Uuid::new_v4().to_string();
    let body = json!({
        "sourceInstanceTemplate": template_self_link(&template)?,
        "count": count.to_string(),
        "minCount": count.to_string(),
        "namePattern": name_pattern,
        "instanceProperties": {
            "labels": {"bulk_batch": batch},
        },
    });

    let url = client.compute_zonal_url(project_id, zone, "instances/bulkInsert");
    let op: ComputeOperation = client
        .post_as(&url, Some(&body))
        .await
        .context("unable to bulk insert instances")?;
    wait_zonal(client, project_id, zone, op)
        .await
        .context("unable to wait for the operation")?;
    writeln!(w, "Bulk instance creation completed")?;

    let filter = format!("labels.bulk_batch = {}", batch);
    let url = with_query(
        &client.compute_zonal_url(project_id, zone, "instances"),
        &[("filter", filter.as_str())],
    )?;
    let instances: Vec<Instance> = list_all_as(client, &url, "items")
        .await
        .context("unable to list instances")?;
    for instance in &instances {
        writeln!(w, "- {}", instance.name)?;
    }
    Ok(instances)
}

/// Create a Windows Server instance with no external IP.
///
/// The subnet needs Private Google Access and a route to
/// `kms.windows.googlecloud.com` for the instance to activate.
#[allow(clippy::too_many_arguments)]
pub async fn create_windows_server_instance_internal_ip(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
    machine_type: &str,
    source_image_family: &str,
    network: &str,
    subnetwork: &str,
) -> Result<()> {
    let body = json!({
        "name": instance_name,
        "machineType": format!("zones/{}/machineTypes/{}", zone, machine_type),
        "disks": [{
            "initializeParams": {
                "diskSizeGb": "64",
                "sourceImage": format!(
                    "projects/windows-cloud/global/images/family/{}",
                    source_image_family
                ),
            },
            "autoDelete": true,
            "boot": true,
        }],
        "networkInterfaces": [{
            "network": network,
            "subnetwork": subnetwork,
        }],
    });
    insert_instance(client, project_id, zone, &body).await?;

    writeln!(w, "Instance created")?;
    Ok(())
}

/// Fetch one instance and print its status
pub async fn get_instance(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
) -> Result<Instance> {
    let url = client.compute_zonal_url(project_id, zone, &format!("instances/{}", instance_name));
    let instance: Instance = client.get_as(&url).await.context("unable to get instance")?;

    writeln!(
        w,
        "Instance {} is {} ({})",
        instance.name,
        instance.status,
        short_name(&instance.machine_type)
    )?;
    Ok(instance)
}

/// List the instances of one zone
pub async fn list_instances(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
) -> Result<Vec<Instance>> {
    let url = client.compute_zonal_url(project_id, zone, "instances");
    let instances: Vec<Instance> = list_all_as(client, &url, "items")
        .await
        .context("unable to list instances")?;

    writeln!(w, "Instances found in zone {}:", zone)?;
    for instance in &instances {
        writeln!(w, "- {} {}", instance.name, short_name(&instance.machine_type))?;
    }
    Ok(instances)
}

/// List instances across every zone, grouped by zone
pub async fn list_all_instances(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
) -> Result<Vec<Instance>> {
    let url = client.compute_aggregated_url(project_id, "instances");
    let grouped = list_aggregated(client, &url, "instances")
        .await
        .context("unable to list instances")?;

    let mut all = Vec::new();
    writeln!(w, "Instances found:")?;
    for (scope, items) in grouped {
        writeln!(w, "{}", scope)?;
        for item in items {
            let instance: Instance =
                serde_json::from_value(item).context("Unexpected instance shape")?;
            writeln!(w, " - {} {}", instance.name, short_name(&instance.machine_type))?;
            all.push(instance);
        }
    }
    Ok(all)
}

/// POST an instance action (`start`, `stop`, ...) and wait for it
async fn instance_action(
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
    action: &str,
) -> Result<()> {
    let url = client.compute_zonal_url(
        project_id,
        zone,
        &format!("instances/{}/{}", instance_name, action),
    );
    let op: ComputeOperation = client
        .post_as(&url, None)
        .await
        .with_context(|| format!("unable to {} instance", action))?;
    wait_zonal(client, project_id, zone, op)
        .await
        .context("unable to wait for the operation")?;
    Ok(())
}

/// Start a stopped instance
pub async fn start_instance(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
) -> Result<()> {
    instance_action(client, project_id, zone, instance_name, "start").await?;
    writeln!(w, "Instance started")?;
    Ok(())
}

/// Stop a running instance
pub async fn stop_instance(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
) -> Result<()> {
    instance_action(client, project_id, zone, instance_name, "stop").await?;
    writeln!(w, "Instance stopped")?;
    Ok(())
}

/// Hard-reset a running instance
pub async fn reset_instance(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
) -> Result<()> {
    instance_action(client, project_id, zone, instance_name, "reset").await?;
    writeln!(w, "Instance reset")?;
    Ok(())
}

/// Suspend a running instance (memory is preserved)
pub async fn suspend_instance(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
) -> Result<()> {
    instance_action(client, project_id, zone, instance_name, "suspend").await?;
    writeln!(w, "Instance suspended")?;
    Ok(())
}

/// Resume a suspended instance
pub async fn resume_instance(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
) -> Result<()> {
    let url = client.compute_zonal_url(project_id, zone, &format!("instances/{}", instance_name));
    let instance: Instance = client.get_as(&url).await.context("unable to get instance")?;

    if instance.status != "SUSPENDED" {
        bail!(
            "only suspended instances can be resumed, instance {} is in {} state",
            instance_name,
            instance.status
        );
    }

    instance_action(client, project_id, zone, instance_name, "resume").await?;
    writeln!(w, "Instance resumed")?;
    Ok(())
}

/// Delete an instance
pub async fn delete_instance(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    instance_name: &str,
) -> Result<()> {
    let url = client.compute_zonal_url(project_id, zone, &format!("instances/{}", instance_name));
    let op: ComputeOperation = serde_json::from_value(
        client.delete(&url).await.context("unable to delete instance")?,
    )
    .context("Unexpected response shape")?;
    wait_zonal(client, project_id, zone, op)
        .await
        .context("unable to wait for the operation")?;

    writeln!(w, "Instance deleted")?;
    Ok(())
}

/// Block until a zonal operation started elsewhere completes
pub async fn wait_for_operation(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    zone: &str,
    operation_name: &str,
) -> Result<()> {
    let op = ComputeOperation {
        name: operation_name.to_string(),
        zone: Some(zone.to_string()),
        ..Default::default()
    };
    wait_compute_operation(client, project_id, op)
        .await
        .context("unable to wait for the operation")?;

    writeln!(w, "Operation finished")?;
    Ok(())
}
