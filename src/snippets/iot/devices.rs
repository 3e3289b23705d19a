//! Devices: credentials, configuration and state

use super::models::{Device, DeviceConfig, DeviceCredential, DeviceState, PublicKeyCredential};
use super::registries::registry_path;
use crate::gcp::client::{with_query, GcpClient};
use crate::gcp::pager::list_all_as;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use std::io::Write;
use std::path::Path;

pub const ES256_PEM: &str = "ES256_PEM";
pub const RSA_X509_PEM: &str = "RSA_X509_PEM";

fn device_path(project_id: &str, region: &str, registry_id: &str, device_id: &str) -> String {
    format!("{}/devices/{}", registry_path(project_id, region, registry_id), device_id)
}

fn key_credential(format: &str, key_path: &Path) -> Result<DeviceCredential> {
    let key = std::fs::read_to_string(key_path)
        .with_context(|| format!("error reading key file: {}", key_path.display()))?;
    Ok(DeviceCredential {
        public_key: Some(PublicKeyCredential {
            format: format.to_string(),
            key,
        }),
        expiration_time: None,
    })
}

async fn create_device(
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device: &Device,
) -> Result<Device> {
    let url = client.cloudiot_url(&format!(
        "{}/devices",
        registry_path(project_id, region, registry_id)
    ));
    client
        .post_as(&url, Some(&serde_json::to_value(device)?))
        .await
        .context("Devices.Create")
}

/// Create a device authenticated with an ES256 public key
pub async fn create_es_device(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
    key_path: &Path,
) -> Result<Device> {
    let device = Device {
        id: device_id.to_string(),
        credentials: vec![key_credential(ES256_PEM, key_path)?],
        ..Default::default()
    };
    let created = create_device(client, project_id, region, registry_id, &device).await?;

    writeln!(w, "Successfully created device.")?;
    Ok(created)
}

/// Create a device authenticated with an RSA X.509 certificate
pub async fn create_rsa_device(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
    key_path: &Path,
) -> Result<Device> {
    let device = Device {
        id: device_id.to_string(),
        credentials: vec![key_credential(RSA_X509_PEM, key_path)?],
        ..Default::default()
    };
    let created = create_device(client, project_id, region, registry_id, &device).await?;

    writeln!(w, "Successfully created device.")?;
    Ok(created)
}

/// Create a device with no credentials
pub async fn create_unauth_device(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
) -> Result<Device> {
    let device = Device {
        id: device_id.to_string(),
        ..Default::default()
    };
    let created = create_device(client, project_id, region, registry_id, &device).await?;

    writeln!(w, "Successfully created device.")?;
    Ok(created)
}

pub async fn delete_device(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
) -> Result<()> {
    client
        .delete(&client.cloudiot_url(&device_path(project_id, region, registry_id, device_id)))
        .await
        .context("Devices.Delete")?;

    writeln!(w, "Deleted device!")?;
    Ok(())
}

/// Print a device with its credentials and activity timestamps
pub async fn get_device(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
) -> Result<Device> {
    let device: Device = client
        .get_as(&client.cloudiot_url(&device_path(project_id, region, registry_id, device_id)))
        .await
        .context("Devices.Get")?;

    let opt = |v: &Option<String>| v.clone().unwrap_or_default();

    writeln!(w, "\tId: {}", device.id)?;
    for credential in &device.credentials {
        writeln!(w, "\t\tCredential Expire: {}", opt(&credential.expiration_time))?;
        writeln!(
            w,
            "\t\tCredential Type: {}",
            credential.public_key.as_ref().map(|k| k.format.as_str()).unwrap_or_default()
        )?;
        writeln!(w, "\t\t--------")?;
    }
    writeln!(w, "\tLast Config Ack: {}", opt(&device.last_config_ack_time))?;
    writeln!(w, "\tLast Config Send: {}", opt(&device.last_config_send_time))?;
    writeln!(w, "\tLast Event Time: {}", opt(&device.last_event_time))?;
    writeln!(w, "\tLast Heartbeat Time: {}", opt(&device.last_heartbeat_time))?;
    writeln!(w, "\tLast State Time: {}", opt(&device.last_state_time))?;
    writeln!(w, "\tNumId: {}", opt(&device.num_id))?;
    Ok(device)
}

/// Recent configuration versions sent to a device
pub async fn get_device_configs(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
) -> Result<Vec<DeviceConfig>> {
    let url = client.cloudiot_url(&format!(
        "{}/configVersions",
        device_path(project_id, region, registry_id, device_id)
    ));
    let response = client.get(&url).await.context("Devices.ConfigVersions.List")?;
    let configs: Vec<DeviceConfig> = match response.get("deviceConfigs") {
        Some(configs) => {
            serde_json::from_value(configs.clone()).context("Unexpected config shape")?
        }
        None => Vec::new(),
    };

    for config in &configs {
        writeln!(w, "{} : {}", config.version, config.binary_data)?;
    }
    Ok(configs)
}

/// Recent states reported by a device
pub async fn get_device_states(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
) -> Result<Vec<DeviceState>> {
    let url = client.cloudiot_url(&format!(
        "{}/states",
        device_path(project_id, region, registry_id, device_id)
    ));
    let response = client.get(&url).await.context("Devices.States.List")?;
    let states: Vec<DeviceState> = match response.get("deviceStates") {
        Some(states) => serde_json::from_value(states.clone()).context("Unexpected state shape")?,
        None => Vec::new(),
    };

    writeln!(w, "Successfully retrieved device states!")?;
    for state in &states {
        writeln!(w, "{} : {}", state.update_time, state.binary_data)?;
    }
    Ok(states)
}

pub async fn list_devices(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
) -> Result<Vec<Device>> {
    let url = client.cloudiot_url(&format!(
        "{}/devices",
        registry_path(project_id, region, registry_id)
    ));
    let devices: Vec<Device> = list_all_as(client, &url, "devices")
        .await
        .context("Devices.List")?;

    writeln!(w, "Devices:")?;
    for device in &devices {
        writeln!(w, "\t{}", device.id)?;
    }
    Ok(devices)
}

async fn patch_credentials(
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
    credential: DeviceCredential,
) -> Result<Device> {
    let device = Device {
        id: device_id.to_string(),
        credentials: vec![credential],
        ..Default::default()
    };
    let url = with_query(
        &client.cloudiot_url(&device_path(project_id, region, registry_id, device_id)),
        &[("updateMask", "credentials")],
    )?;
    client
        .patch_as(&url, &serde_json::to_value(&device)?)
        .await
        .context("Devices.Patch")
}

/// Replace a device's credentials with an ES256 key
pub async fn patch_device_es(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
    key_path: &Path,
) -> Result<Device> {
    let credential = key_credential(ES256_PEM, key_path)?;
    let device =
        patch_credentials(client, project_id, region, registry_id, device_id, credential).await?;

    writeln!(w, "Successfully patched device.")?;
    Ok(device)
}

/// Replace a device's credentials with an RSA certificate
pub async fn patch_device_rsa(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
    key_path: &Path,
) -> Result<Device> {
    let credential = key_credential(RSA_X509_PEM, key_path)?;
    let device =
        patch_credentials(client, project_id, region, registry_id, device_id, credential).await?;

    writeln!(w, "Successfully patched device.")?;
    Ok(device)
}

/// Push a new configuration to a device
pub async fn set_config(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    registry_id: &str,
    device_id: &str,
    config_data: &str,
) -> Result<DeviceConfig> {
    let url = client.cloudiot_url(&format!(
        "{}:modifyCloudToDeviceConfig",
        device_path(project_id, region, registry_id, device_id)
    ));
    let body = json!({ "binaryData": STANDARD.encode(config_data.as_bytes()) });
    let config: DeviceConfig = client
        .post_as(&url, Some(&body))
        .await
        .context("Devices.ModifyCloudToDeviceConfig")?;

    writeln!(w, "Config set!\nVersion now: {}", config.version)?;
    Ok(config)
}
