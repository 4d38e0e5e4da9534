//! Wizard settings snapshot and config file output.
//!
//! Settings accumulate as wizard steps complete. They are saved and loaded as
//! JSON, validated explicitly, and handed by reference to the serializer. The
//! generated pc-sysinstall config is written atomically to one well-known path.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PlanError;
use crate::hardware::Architecture;
use crate::logic::packages::{default_desktop, PackageSelection};
use crate::types::{BootManager, Component, OsVariant, PartitionScheme};

/// Where pc-sysinstall expects its config
pub const DEFAULT_CONFIG_PATH: &str = "/tmp/sys-install.cfg";
pub const DEFAULT_SHELL: &str = "/bin/csh";

/// IPv6 values written alongside every network mode that carries them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv6Settings {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub nameserver: String,
    #[serde(default)]
    pub router: String,
}

/// Network setup for server installs. Desktop installs always use DHCP + SLAAC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum NetworkConfig {
    #[default]
    #[serde(rename = "AUTO-DHCP")]
    AutoDhcp,
    #[serde(rename = "AUTO-DHCP-SLAAC")]
    AutoDhcpSlaac {
        #[serde(default)]
        ipv6: Ipv6Settings,
    },
    #[serde(rename = "IPv6-SLAAC")]
    Ipv6Slaac {
        #[serde(default)]
        ipv6: Ipv6Settings,
    },
    /// Static IPv4 on one device, e.g. `em0` (an alias suffix like `em0:1` is dropped)
    #[serde(rename = "STATIC")]
    Static {
        device: String,
        address: String,
        netmask: String,
        #[serde(default)]
        nameserver: String,
        #[serde(default)]
        router: String,
        #[serde(default)]
        ipv6: Ipv6Settings,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub full_name: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

/// Credentials, hostname and network collected on the server setup pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub root_password: String,
    pub user: UserAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Enable sshd at first boot
    #[serde(default)]
    pub ssh: bool,
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Everything outside the disk layout that shapes the generated config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default = "Architecture::amd64")]
    pub architecture: Architecture,
    #[serde(default)]
    pub boot_manager: BootManager,
    #[serde(default)]
    pub partition_scheme: PartitionScheme,
    #[serde(default)]
    pub variant: OsVariant,
    /// Language code when a non-default language was picked, e.g. `de`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemSettings>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            architecture: Architecture::amd64(),
            boot_manager: BootManager::default(),
            partition_scheme: PartitionScheme::default(),
            variant: OsVariant::default(),
            locale: None,
            system: None,
            components: Vec::new(),
        }
    }
}

impl GlobalSettings {
    pub fn is_localized(&self) -> bool {
        self.locale.as_deref().is_some_and(|l| !l.trim().is_empty())
    }

    pub fn hostname(&self) -> Option<&str> {
        self.system
            .as_ref()
            .and_then(|s| s.hostname.as_deref())
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }
}

/// Settings file as saved by the wizard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardSettings {
    #[serde(flatten)]
    pub global: GlobalSettings,
    #[serde(default)]
    pub packages: PackageSelection,
}

impl WizardSettings {
    /// Save settings to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize settings to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write settings to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load settings from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;

        let settings: Self =
            serde_json::from_str(&content).context("Failed to parse settings JSON")?;

        Ok(settings)
    }

    /// Load settings for a host with `memory_mb` of RAM. A file that never
    /// picked a variant gets the desktop preselected for that memory size.
    pub fn load_for_host<P: AsRef<Path>>(path: P, memory_mb: u64) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;

        Self::from_json_for_host(&content, memory_mb)
    }

    /// Parse settings JSON, filling a missing `variant` from `default_desktop`
    pub fn from_json_for_host(json: &str, memory_mb: u64) -> Result<Self> {
        let mut value: serde_json::Value =
            serde_json::from_str(json).context("Failed to parse settings JSON")?;

        if let Some(fields) = value.as_object_mut() {
            if !fields.contains_key("variant") {
                let desktop = default_desktop(memory_mb);
                tracing::info!("No variant chosen, preselecting {} for {}MB of memory", desktop, memory_mb);
                fields.insert(
                    "variant".to_string(),
                    serde_json::to_value(desktop).context("Failed to encode default variant")?,
                );
            }
        }

        serde_json::from_value(value).context("Failed to parse settings JSON")
    }

    /// Validate the settings
    pub fn validate(&self) -> crate::error::Result<()> {
        let global = &self.global;

        if let Some(locale) = &global.locale {
            if locale.trim().is_empty() || locale.contains(char::is_whitespace) {
                return Err(PlanError::settings(format!("Invalid language code '{}'", locale)));
            }
        }

        let Some(system) = &global.system else {
            if global.variant.is_server() {
                return Err(PlanError::settings(format!(
                    "{} install needs root password, user and network settings",
                    global.variant
                )));
            }
            return Ok(());
        };

        // Username (start with letter, letters/numbers/underscore/dash)
        let username = system.user.username.trim();
        if username.is_empty() {
            return Err(PlanError::settings("Username must be specified"));
        }
        if !username.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(PlanError::settings("Username must start with a letter"));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(PlanError::settings(
                "Username can only contain letters, numbers, dashes, and underscores",
            ));
        }

        // Passwords (non-empty, no whitespace)
        if system.user.password.trim().is_empty() {
            return Err(PlanError::settings("User password must be specified"));
        }
        if system.user.password.contains(char::is_whitespace) {
            return Err(PlanError::settings("User password cannot contain whitespace"));
        }
        if system.root_password.trim().is_empty() {
            return Err(PlanError::settings("Root password must be specified"));
        }
        if system.root_password.contains(char::is_whitespace) {
            return Err(PlanError::settings("Root password cannot contain whitespace"));
        }

        if let Some(hostname) = &system.hostname {
            let hostname = hostname.trim();
            if !hostname.is_empty()
                && !hostname
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            {
                return Err(PlanError::settings(
                    "Hostname can only contain letters, numbers, dashes, and dots",
                ));
            }
        }

        if let NetworkConfig::Static {
            device,
            address,
            netmask,
            ..
        } = &system.network
        {
            if device.trim().is_empty() {
                return Err(PlanError::settings("Static network needs a device"));
            }
            if address.trim().is_empty() || netmask.trim().is_empty() {
                return Err(PlanError::settings(format!(
                    "Static network on {} needs an address and netmask",
                    device
                )));
            }
        }

        Ok(())
    }
}

/// Write the generated config atomically: temp file, fsync, rename.
pub fn write_config<P: AsRef<Path>>(path: P, text: &str) -> Result<()> {
    let path = path.as_ref();
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());

    if let Some(parent) = parent {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let tmp_path = temp_path(path);
    let mut file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp config file: {}", tmp_path.display()))?;
    file.write_all(text.as_bytes())
        .context("Failed to write config")?;
    file.sync_all().context("Failed to flush config")?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to atomically replace config: {}", path.display()))?;

    if let Some(parent) = parent {
        if let Ok(dir) = File::open(parent) {
            dir.sync_all().ok();
        }
    }

    tracing::info!("Wrote install config to {}", path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("sys-install.cfg");
    path.with_file_name(format!("{}.tmp", file_name))
}
