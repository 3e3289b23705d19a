//! Device manager
//!
//! Maps `command arg...` argument vectors to the registry and device
//! snippets. Every command takes the project ID implicitly; the table only
//! lists the user-supplied arguments.

use super::{devices, registries};
use crate::gcp::client::GcpClient;
use anyhow::{anyhow, bail, Result};
use std::io::Write;
use std::path::Path;

/// Section a command is listed under in the usage text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Registry,
    Device,
}

impl Group {
    fn title(self) -> &'static str {
        match self {
            Group::Registry => "Registry Management",
            Group::Device => "Device Management",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Command {
    pub name: &'static str,
    pub group: Group,
    pub args: &'static [&'static str],
}

impl Command {
    /// `name <arg> <arg>`
    pub fn usage(&self) -> String {
        std::iter::once(self.name.to_string())
            .chain(self.args.iter().map(|arg| format!("<{}>", arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

const REGION_REGISTRY: [&str; 2] = ["cloud-region", "registry-id"];
const REGION_REGISTRY_DEVICE: [&str; 3] = ["cloud-region", "registry-id", "device-id"];
const WITH_KEYFILE: [&str; 4] = ["cloud-region", "registry-id", "device-id", "keyfile-path"];

pub const COMMANDS: &[Command] = &[
    Command {
        name: "createRegistry",
        group: Group::Registry,
        args: &["cloud-region", "registry-id", "pubsub-topic"],
    },
    Command {
        name: "deleteRegistry",
        group: Group::Registry,
        args: &REGION_REGISTRY,
    },
    Command {
        name: "getRegistry",
        group: Group::Registry,
        args: &REGION_REGISTRY,
    },
    Command {
        name: "listRegistries",
        group: Group::Registry,
        args: &["cloud-region"],
    },
    Command {
        name: "getRegistryIam",
        group: Group::Registry,
        args: &REGION_REGISTRY,
    },
    Command {
        name: "setRegistryIam",
        group: Group::Registry,
        args: &["cloud-region", "registry-id", "member", "role"],
    },
    Command {
        name: "createEs",
        group: Group::Device,
        args: &WITH_KEYFILE,
    },
    Command {
        name: "createRsa",
        group: Group::Device,
        args: &WITH_KEYFILE,
    },
    Command {
        name: "createUnauth",
        group: Group::Device,
        args: &REGION_REGISTRY_DEVICE,
    },
    Command {
        name: "deleteDevice",
        group: Group::Device,
        args: &REGION_REGISTRY_DEVICE,
    },
    Command {
        name: "getDevice",
        group: Group::Device,
        args: &REGION_REGISTRY_DEVICE,
    },
    Command {
        name: "getDeviceConfigs",
        group: Group::Device,
        args: &REGION_REGISTRY_DEVICE,
    },
    Command {
        name: "getDeviceStates",
        group: Group::Device,
        args: &REGION_REGISTRY_DEVICE,
    },
    Command {
        name: "listDevices",
        group: Group::Device,
        args: &REGION_REGISTRY,
    },
    Command {
        name: "patchDeviceEs",
        group: Group::Device,
        args: &WITH_KEYFILE,
    },
    Command {
        name: "patchDeviceRsa",
        group: Group::Device,
        args: &WITH_KEYFILE,
    },
    Command {
        name: "setConfig",
        group: Group::Device,
        args: &["cloud-region", "registry-id", "device-id", "config-data"],
    },
];

pub fn find_command(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|cmd| cmd.name == name)
}

/// Usage text, one section per group
pub fn usage(program: &str) -> String {
    let mut out = String::from("Usage:\n");
    for (i, group) in [Group::Registry, Group::Device].into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("\t{}\n\t-----\n", group.title()));
        for cmd in COMMANDS.iter().filter(|c| c.group == group) {
            out.push_str(&format!("\t{} {}\n", program, cmd.usage()));
        }
    }
    out
}

/// Run `args[0]` with `args[1..]`. Usage goes to `w` on an empty or
/// unknown command; arity mismatches fail with the command's usage.
pub async fn run(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    args: &[String],
) -> Result<()> {
    let Some((name, rest)) = args.split_first() else {
        write!(w, "{}", usage("manager"))?;
        bail!("no command given");
    };

    let Some(cmd) = find_command(name) else {
        write!(w, "{}", usage("manager"))?;
        bail!("Unknown command: {}", name);
    };

    if rest.len() != cmd.args.len() {
        bail!("Wrong number of arguments. Usage:\n\t{}", cmd.usage());
    }

    tracing::debug!("iot manager: command={}, args={:?}", cmd.name, rest);
    let a: Vec<&str> = rest.iter().map(String::as_str).collect();
    let p = project_id;

    match cmd.name {
        "createRegistry" => {
            registries::create_registry(w, client, p, a[0], a[1], a[2]).await?;
        }
        "deleteRegistry" => registries::delete_registry(w, client, p, a[0], a[1]).await?,
        "getRegistry" => {
            registries::get_registry(w, client, p, a[0], a[1]).await?;
        }
        "listRegistries" => {
            registries::list_registries(w, client, p, a[0]).await?;
        }
        "getRegistryIam" => {
            registries::get_registry_iam(w, client, p, a[0], a[1]).await?;
        }
        "setRegistryIam" => {
            registries::set_registry_iam(w, client, p, a[0], a[1], a[2], a[3]).await?;
        }
        "createEs" => {
            devices::create_es_device(w, client, p, a[0], a[1], a[2], Path::new(a[3])).await?;
        }
        "createRsa" => {
            devices::create_rsa_device(w, client, p, a[0], a[1], a[2], Path::new(a[3])).await?;
        }
        "createUnauth" => {
            devices::create_unauth_device(w, client, p, a[0], a[1], a[2]).await?;
        }
        "deleteDevice" => devices::delete_device(w, client, p, a[0], a[1], a[2]).await?,
        "getDevice" => {
            devices::get_device(w, client, p, a[0], a[1], a[2]).await?;
        }
        "getDeviceConfigs" => {
            devices::get_device_configs(w, client, p, a[0], a[1], a[2]).await?;
        }
        "getDeviceStates" => {
            devices::get_device_states(w, client, p, a[0], a[1], a[2]).await?;
        }
        "listDevices" => {
            devices::list_devices(w, client, p, a[0], a[1]).await?;
        }
        "patchDeviceEs" => {
            devices::patch_device_es(w, client, p, a[0], a[1], a[2], Path::new(a[3])).await?;
        }
        "patchDeviceRsa" => {
            devices::patch_device_rsa(w, client, p, a[0], a[1], a[2], Path::new(a[3])).await?;
        }
        "setConfig" => {
            devices::set_config(w, client, p, a[0], a[1], a[2], a[3]).await?;
        }
        other => return Err(anyhow!("Unknown command: {}", other)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_usage() {
        let cmd = find_command("setRegistryIam").unwrap();
        assert_eq!(
            cmd.usage(),
            "setRegistryIam <cloud-region> <registry-id> <member> <role>"
        );
        assert_eq!(
            find_command("listRegistries").unwrap().usage(),
            "listRegistries <cloud-region>"
        );
    }

    #[test]
    fn test_usage_groups_commands() {
        let text = usage("manager");
        let registry = text.find("Registry Management").unwrap();
        let device = text.find("Device Management").unwrap();
        let create_registry = text.find("manager createRegistry").unwrap();
        let create_es = text.find("manager createEs").unwrap();

        assert!(text.starts_with("Usage:\n"));
        assert!(registry < create_registry && create_registry < device);
        assert!(device < create_es);
        assert!(text.contains(
            "\tmanager setConfig <cloud-region> <registry-id> <device-id> <config-data>\n"
        ));
    }

    #[test]
    fn test_every_command_is_unique() {
        let mut names: Vec<&str> = COMMANDS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COMMANDS.len());
    }

    #[test]
    fn test_unknown_command_lookup() {
        assert!(find_command("rebootDevice").is_none());
    }
}
