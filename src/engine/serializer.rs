//! Config Serializer
//!
//! Renders a plan and the wizard settings into pc-sysinstall's line-oriented
//! config. The whole file is regenerated on every change.
//!
//! # Output Sections
//!
//! 1. Global: install mode and type, dist files, hostname, network, media
//! 2. Disks: one block per (disk, slice) group, each closed by `commitDiskLabel`
//! 3. Optional components
//! 4. Post-install: save-config hook, packages, variant commands, `newaliases`
//!
//! Disk blocks follow the grouped view in `engine::groups`, so the last
//! partition of every group goes out with size 0.

use crate::config_file::{GlobalSettings, Ipv6Settings, NetworkConfig, SystemSettings};
use crate::engine::groups::{group_layout, PlacedEntry, SliceGroup};
use crate::inventory::Inventory;
use crate::layout::{LayoutPlan, Role};
use crate::types::{Component, OsVariant};

pub const CONFIG_HEADER: &str = "# Auto-Generated pc-sysinstall configuration";
/// Mount point used for `Manual` (extract-only) installs
pub const MANUAL_INSTALL_LOCATION: &str = "/mnt";
pub const DIST_FILES: &str = "base doc games kernel";
pub const SAVE_CONFIG_SCRIPT: &str = "/root/save-config.sh";
pub const SYS_INIT_SCRIPT: &str = "/usr/local/share/pcbsd/scripts/sys-init.sh";
pub const DEFAULT_LANGUAGE: &str = "en_US";
/// Partition value for a target the probe reported as unused space
pub const FREE_SLICE: &str = "free";

const PARTITION_HELP: &[&str] = &[
    "# All sizes are expressed in MB",
    "# Avail FS Types, UFS, UFS+S, UFS+SUJ, UFS+J, ZFS, SWAP",
    "# UFS.eli, UFS+S.eli, UFS+SUJ, UFS+J.eli, ZFS.eli, SWAP.eli",
];

/// Inputs that do not belong to the settings snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraConfig {
    /// Resolved `installPackages=` list; `None` when the media has no packages
    pub install_packages: Option<Vec<String>>,
}

// ============================================================================
// Full config
// ============================================================================

/// The complete config, one directive per element.
pub fn serialize(
    plan: &LayoutPlan,
    settings: &GlobalSettings,
    extra: &ExtraConfig,
    inventory: &Inventory,
) -> Vec<String> {
    let mut lines = global_settings(plan, settings);
    lines.extend(serialize_disk(plan, settings, inventory));
    lines.extend(component_settings(&settings.components));

    lines.push(format!("runExtCommand={}", SAVE_CONFIG_SCRIPT));
    lines.push(String::new());

    if let Some(packages) = &extra.install_packages {
        lines.push(format!("installPackages={}", packages.join(" ")));
    }
    lines.push(String::new());

    lines.extend(variant_commands(settings));
    lines.push("runCommand=newaliases".to_string());

    tracing::debug!("Serialized {} config lines", lines.len());
    lines
}

/// Join lines into the file body, newline-terminated.
pub fn to_config_text(lines: &[String]) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

// ============================================================================
// Global section
// ============================================================================

pub fn global_settings(plan: &LayoutPlan, settings: &GlobalSettings) -> Vec<String> {
    let mut lines = vec![CONFIG_HEADER.to_string(), "installInteractive=no".to_string()];

    if plan.is_manual() {
        lines.push("installMode=extract".to_string());
        lines.push(format!("installLocation={}", MANUAL_INSTALL_LOCATION));
    } else {
        lines.push("installMode=fresh".to_string());
    }

    let install_type = if settings.variant.is_desktop() { "PCBSD" } else { "FreeBSD" };
    lines.push(format!("installType={}", install_type));
    lines.push("packageType=dist".to_string());

    let mut dist_files = DIST_FILES.to_string();
    if settings.architecture.is_amd64() {
        dist_files.push_str(" lib32");
    }
    lines.push(format!("distFiles={}", dist_files));
    lines.push(String::new());

    if let Some(hostname) = settings.hostname() {
        lines.push(format!("hostname={}", hostname));
    }

    lines.extend(network_settings(settings));

    lines.push("installMedium=local".to_string());
    lines.push("localPath=/dist".to_string());

    if let Some(lang) = settings.locale.as_deref().filter(|_| settings.is_localized()) {
        lines.push(String::new());
        lines.push(format!("localizeLang={}", lang.trim()));
    }

    lines.push(String::new());
    lines
}

fn network_settings(settings: &GlobalSettings) -> Vec<String> {
    if settings.variant.is_desktop() {
        return vec!["netSaveDev=AUTO-DHCP-SLAAC".to_string()];
    }

    let default_network = NetworkConfig::default();
    let network = settings
        .system
        .as_ref()
        .map_or(&default_network, |system| &system.network);

    match network {
        NetworkConfig::AutoDhcp => vec!["netSaveDev=AUTO-DHCP".to_string()],
        NetworkConfig::AutoDhcpSlaac { ipv6 } => {
            let mut lines = vec!["netSaveDev=AUTO-DHCP-SLAAC".to_string()];
            lines.extend(ipv6_settings(ipv6));
            lines
        }
        NetworkConfig::Ipv6Slaac { ipv6 } => {
            let mut lines = vec!["netSaveDev=IPv6-SLAAC".to_string()];
            lines.extend(ipv6_settings(ipv6));
            lines
        }
        NetworkConfig::Static {
            device,
            address,
            netmask,
            nameserver,
            router,
            ipv6,
        } => {
            // Aliases like em0:1 configure the parent device
            let dev = match device.find(':') {
                Some(idx) if idx > 0 => &device[..idx],
                _ => device.as_str(),
            };
            let mut lines = vec![
                format!("netSaveDev={}", dev),
                format!("netSaveIP_{}={}", dev, address),
                format!("netSaveMask_{}={}", dev, netmask),
                format!("netSaveNameServer={}", nameserver),
                format!("netSaveDefaultRouter={}", router),
            ];
            lines.extend(ipv6_settings(ipv6));
            lines
        }
    }
}

fn ipv6_settings(ipv6: &Ipv6Settings) -> [String; 3] {
    [
        format!("netSaveIPv6={}", ipv6.address),
        format!("netSaveIPv6NameServer={}", ipv6.nameserver),
        format!("netSaveIPv6DefaultRouter={}", ipv6.router),
    ]
}

// ============================================================================
// Disk section
// ============================================================================

/// Disk and partition directives only. Empty for a `Manual` plan.
pub fn serialize_disk(
    plan: &LayoutPlan,
    settings: &GlobalSettings,
    inventory: &Inventory,
) -> Vec<String> {
    let entries = match plan {
        LayoutPlan::Manual => return Vec::new(),
        LayoutPlan::Partitions(entries) => entries,
    };

    let mut lines = Vec::new();
    for (disk_num, group) in group_layout(entries).iter().enumerate() {
        disk_block(disk_num, group, settings, inventory, &mut lines);
    }
    lines
}

fn disk_block(
    disk_num: usize,
    group: &SliceGroup<'_>,
    settings: &GlobalSettings,
    inventory: &Inventory,
    lines: &mut Vec<String>,
) {
    let partition = if inventory.is_unused_space(group.disk, group.slice) {
        FREE_SLICE.to_string()
    } else {
        group.slice.to_string()
    };

    lines.push(format!("# Disk Setup for {}", group.disk));
    lines.push(format!("disk{}={}", disk_num, group.disk));
    lines.push(format!("partition={}", partition));
    lines.push(format!("bootManager={}", settings.boot_manager));
    lines.push(format!("partscheme={}", settings.partition_scheme));

    if let Some(mirror) = group.mirror {
        if let Role::Mirror { balance, .. } = &mirror.role {
            lines.push(format!("mirror={}", mirror.disk));
            lines.push(format!("mirrorbal={}", balance));
        }
    }

    lines.push("commitDiskPart".to_string());
    lines.push(String::new());

    if group.entries.is_empty() {
        return;
    }

    lines.push(format!("# Partition Setup for {}({})", group.disk, group.slice));
    lines.extend(PARTITION_HELP.iter().map(|line| line.to_string()));

    for placed in &group.entries {
        partition_line(disk_num, placed, lines);
    }

    lines.push("commitDiskLabel".to_string());
    lines.push(String::new());
}

fn partition_line(disk_num: usize, placed: &PlacedEntry<'_>, lines: &mut Vec<String>) {
    let spec = placed.spec;
    let Some(fs) = spec.filesystem_type() else {
        return;
    };

    let target = match spec.mount() {
        Some(mount) if !spec.is_swap() => mount.to_string(),
        _ => "none".to_string(),
    };
    let options = spec
        .options
        .as_deref()
        .map(|opts| format!(" ({})", opts))
        .unwrap_or_default();

    lines.push(format!(
        "disk{}-part={} {} {}{}",
        disk_num, fs, placed.effective_size_mb, target, options
    ));

    if let Some(pass) = spec.passphrase.as_deref().filter(|p| !p.is_empty()) {
        if spec.is_swap() {
            tracing::debug!("Swap on disk{} is keyed at boot, ignoring passphrase", disk_num);
        } else {
            lines.push(format!("encpass={}", pass));
        }
    }
}

// ============================================================================
// Components and post-install
// ============================================================================

pub fn component_settings(components: &[Component]) -> Vec<String> {
    if components.is_empty() {
        return Vec::new();
    }

    // Fixed order regardless of selection order
    let names: Vec<String> = [Component::Src, Component::Ports]
        .into_iter()
        .filter(|c| components.contains(c))
        .map(|c| c.to_string())
        .collect();

    vec![
        String::new(),
        "# Optional Components".to_string(),
        format!("installComponents={}", names.join(",")),
    ]
}

fn variant_commands(settings: &GlobalSettings) -> Vec<String> {
    let mut lines = Vec::new();
    match settings.variant {
        OsVariant::Kde | OsVariant::Lxde | OsVariant::Gnome | OsVariant::Xfce => {
            let lang = settings
                .locale
                .as_deref()
                .filter(|_| settings.is_localized())
                .map_or(DEFAULT_LANGUAGE, str::trim);
            lines.push(format!("runCommand=sh {} desktop {}", SYS_INIT_SCRIPT, lang));
            lines.push("# Touch flags to enable PC-BSD setup at first boot".to_string());
            for flag in [".runxsetup", ".pcbsd-firstboot", ".pcbsd-firstgui"] {
                lines.push(format!("runCommand=touch /var/{}", flag));
            }
        }
        OsVariant::TrueOs => {
            lines.extend(server_setup(settings.system.as_ref()));
            lines.push(format!("runCommand=sh {} server", SYS_INIT_SCRIPT));
        }
        OsVariant::FreeBsd => lines.extend(server_setup(settings.system.as_ref())),
    }
    lines
}

fn server_setup(system: Option<&SystemSettings>) -> Vec<String> {
    let Some(system) = system else {
        tracing::warn!("No user settings for server install, root password and user left unset");
        return Vec::new();
    };

    let user = &system.user;
    let mut lines = vec![
        String::new(),
        "# Root Password".to_string(),
        format!("rootPass={}", system.root_password),
        String::new(),
        "# Users".to_string(),
        format!("userName={}", user.username),
        format!("userComment={}", user.full_name),
        format!("userPass={}", user.password),
        format!("userShell={}", user.shell),
        format!("userHome=/home/{}", user.username),
        "userGroups=wheel,operator".to_string(),
        "commitUser".to_string(),
        String::new(),
    ];

    if system.ssh {
        lines.push(r#"runCommand=echo 'sshd_enable="YES"' >>/etc/rc.conf"#.to_string());
    }
    lines
}
