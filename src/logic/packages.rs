//! Meta-package selection
//!
//! Picks the default desktop and its meta-packages, and expands the selected
//! meta-packages into the `installPackages=` list using the list files that
//! ship on the install media.
//!
//! # Resolution Rules
//!
//! | Variant   | Base package  | Catalog |
//! |-----------|---------------|---------|
//! | desktops  | `pcbsd-base`  | desktop |
//! | TrueOS    | `trueos-base` | server  |
//! | FreeBSD   | none, no `installPackages=` line | - |
//!
//! The `base-system` meta-package is always expanded, selected or not.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::OsVariant;

pub const DESKTOP_BASE_PACKAGE: &str = "pcbsd-base";
pub const SERVER_BASE_PACKAGE: &str = "trueos-base";
/// Meta-package expanded for every variant that installs packages
pub const BASE_SYSTEM_META: &str = "base-system";
/// X11 config checked for the nvidia driver
pub const XORG_CONFIG_PATH: &str = "/etc/X11/xorg.conf";
/// Hosts with more memory than this default to KDE, the rest to LXDE
pub const KDE_MEMORY_THRESHOLD_MB: u64 = 2048;

// ============================================================================
// Default meta-package sets
// ============================================================================

pub mod meta_packages {
    pub const KDE: &[&str] = &[
        "KDE",
        "KDE-Accessibility",
        "KDE-Artwork",
        "KDE-Education",
        "KDE-Games",
        "KDE-Graphics",
        "KDE-Multimedia",
        "KDE-Network",
        "KDE-PIM",
    ];
    /// Added to the KDE set when a non-default language is selected
    pub const KDE_L10N: &str = "KDE-L10N";
    pub const LXDE: &[&str] = &["LXDE"];
    pub const GNOME: &[&str] = &[
        "GNOME",
        "GNOME-Accessibility",
        "GNOME-Games",
        "GNOME-Net",
        "GNOME-Utilities",
    ];
    pub const XFCE: &[&str] = &["XFCE", "XFCE-Plugins"];
    pub const NVIDIA: &str = "NVIDIA";
}

/// A meta-package offered on the install media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaPackage {
    pub name: String,
    /// File listing one `package[:comment]` per line
    pub list_file: PathBuf,
    #[serde(default)]
    pub description: String,
}

impl MetaPackage {
    pub fn new(name: impl Into<String>, list_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            list_file: list_file.into(),
            description: String::new(),
        }
    }
}

/// Meta-packages available for desktop and server installs, in media order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCatalog {
    #[serde(default)]
    pub desktop: Vec<MetaPackage>,
    #[serde(default)]
    pub server: Vec<MetaPackage>,
}

impl PackageCatalog {
    pub fn for_variant(&self, variant: OsVariant) -> &[MetaPackage] {
        if variant.is_desktop() {
            &self.desktop
        } else {
            &self.server
        }
    }
}

/// Package choices carried in the wizard settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSelection {
    /// The boot media carries packages
    #[serde(default = "default_on_media")]
    pub on_media: bool,
    /// Meta-packages picked by the user; `None` means the variant defaults
    #[serde(default)]
    pub selected: Option<Vec<String>>,
    #[serde(default)]
    pub catalog: PackageCatalog,
}

fn default_on_media() -> bool {
    true
}

impl Default for PackageSelection {
    fn default() -> Self {
        Self {
            on_media: true,
            selected: None,
            catalog: PackageCatalog::default(),
        }
    }
}

impl PackageSelection {
    /// The user's pick, or the variant defaults when nothing was customised.
    pub fn selected_or_default(&self, variant: OsVariant, localized: bool, nvidia: bool) -> Vec<String> {
        match &self.selected {
            Some(selected) => selected.clone(),
            None => default_meta_packages(variant, localized, nvidia),
        }
    }
}

/// Desktop preselected for a host with `memory_mb` of RAM.
pub fn default_desktop(memory_mb: u64) -> OsVariant {
    if memory_mb > KDE_MEMORY_THRESHOLD_MB {
        OsVariant::Kde
    } else {
        OsVariant::Lxde
    }
}

/// Meta-packages preselected for `variant`. Server variants start empty.
pub fn default_meta_packages(variant: OsVariant, localized: bool, nvidia: bool) -> Vec<String> {
    let mut selected: Vec<&str> = match variant {
        OsVariant::Kde => meta_packages::KDE.to_vec(),
        OsVariant::Lxde => meta_packages::LXDE.to_vec(),
        OsVariant::Gnome => meta_packages::GNOME.to_vec(),
        OsVariant::Xfce => meta_packages::XFCE.to_vec(),
        OsVariant::FreeBsd | OsVariant::TrueOs => return Vec::new(),
    };

    if variant == OsVariant::Kde && localized {
        selected.push(meta_packages::KDE_L10N);
    }
    if nvidia {
        selected.push(meta_packages::NVIDIA);
    }

    selected.into_iter().map(String::from).collect()
}

/// True when the X11 config mentions the nvidia driver. A missing or
/// unreadable file counts as no nvidia.
pub fn detect_nvidia<P: AsRef<Path>>(xorg_conf: P) -> bool {
    match fs::read_to_string(&xorg_conf) {
        Ok(content) => content.lines().any(|line| line.contains("nvidia")),
        Err(e) => {
            tracing::debug!("No X11 config at {:?}: {}", xorg_conf.as_ref(), e);
            false
        }
    }
}

/// Package names from a meta-package list file.
///
/// Blank lines are skipped; anything after the first `:` is a comment.
pub fn read_package_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read meta-package list {:?}", path.as_ref()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split(':').next())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

/// Expand the selected meta-packages into the `installPackages=` list.
///
/// Returns `None` for FreeBSD, which installs no packages. List files that
/// cannot be read are skipped with a warning.
pub fn resolve_install_packages(
    variant: OsVariant,
    catalog: &PackageCatalog,
    selected: &[String],
) -> Option<Vec<String>> {
    let base = match variant {
        OsVariant::FreeBsd => return None,
        OsVariant::TrueOs => SERVER_BASE_PACKAGE,
        _ => DESKTOP_BASE_PACKAGE,
    };

    let mut packages = vec![base.to_string()];
    for meta in catalog.for_variant(variant) {
        if meta.name != BASE_SYSTEM_META && !selected.contains(&meta.name) {
            continue;
        }
        match read_package_list(&meta.list_file) {
            Ok(names) => {
                tracing::debug!("{}: {} packages", meta.name, names.len());
                packages.extend(names);
            }
            Err(e) => tracing::warn!("Skipping meta-package {}: {:#}", meta.name, e),
        }
    }

    tracing::info!("Resolved {} packages for {}", packages.len(), variant);
    Some(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn list_file(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).expect("write list file");
        path
    }

    #[test]
    fn test_default_desktop_by_memory() {
        assert_eq!(default_desktop(4096), OsVariant::Kde);
        assert_eq!(default_desktop(2049), OsVariant::Kde);
        assert_eq!(default_desktop(2048), OsVariant::Lxde);
        assert_eq!(default_desktop(512), OsVariant::Lxde);
    }

    #[test]
    fn test_default_meta_packages() {
        let kde = default_meta_packages(OsVariant::Kde, true, false);
        assert_eq!(kde.first().map(String::as_str), Some("KDE"));
        assert_eq!(kde.last().map(String::as_str), Some("KDE-L10N"));

        let xfce = default_meta_packages(OsVariant::Xfce, true, true);
        assert_eq!(xfce, vec!["XFCE", "XFCE-Plugins", "NVIDIA"]);

        assert!(default_meta_packages(OsVariant::TrueOs, false, true).is_empty());
    }

    #[test]
    fn test_detect_nvidia() {
        let mut conf = NamedTempFile::new().unwrap();
        writeln!(conf, "Section \"Device\"\n  Driver \"nvidia\"\nEndSection").unwrap();
        conf.flush().unwrap();
        assert!(detect_nvidia(conf.path()));

        let mut plain = NamedTempFile::new().unwrap();
        writeln!(plain, "Section \"Device\"\n  Driver \"intel\"\nEndSection").unwrap();
        plain.flush().unwrap();
        assert!(!detect_nvidia(plain.path()));

        assert!(!detect_nvidia("/nonexistent/xorg.conf"));
    }

    #[test]
    fn test_read_package_list_strips_comments() {
        let dir = TempDir::new().unwrap();
        let path = list_file(&dir, "kde", "kde4:KDE desktop\n\n  kdeutils : tools \nqt4\n");
        assert_eq!(read_package_list(&path).unwrap(), vec!["kde4", "kdeutils", "qt4"]);
    }

    #[test]
    fn test_resolve_desktop_packages() {
        let dir = TempDir::new().unwrap();
        let catalog = PackageCatalog {
            desktop: vec![
                MetaPackage::new("base-system", list_file(&dir, "base", "xorg\nsudo\n")),
                MetaPackage::new("KDE", list_file(&dir, "kde", "kde4\n")),
                MetaPackage::new("GNOME", list_file(&dir, "gnome", "gnome2\n")),
                MetaPackage::new("NVIDIA", dir.path().join("missing")),
            ],
            server: Vec::new(),
        };
        let selected = vec!["KDE".to_string(), "NVIDIA".to_string()];

        let packages = resolve_install_packages(OsVariant::Kde, &catalog, &selected).unwrap();
        assert_eq!(packages, vec!["pcbsd-base", "xorg", "sudo", "kde4"]);
    }

    #[test]
    fn test_resolve_server_packages() {
        let dir = TempDir::new().unwrap();
        let catalog = PackageCatalog {
            desktop: vec![MetaPackage::new("KDE", list_file(&dir, "kde", "kde4\n"))],
            server: vec![MetaPackage::new("base-system", list_file(&dir, "base", "warden\n"))],
        };

        let packages = resolve_install_packages(OsVariant::TrueOs, &catalog, &[]).unwrap();
        assert_eq!(packages, vec!["trueos-base", "warden"]);
        assert!(resolve_install_packages(OsVariant::FreeBsd, &catalog, &[]).is_none());
    }

    #[test]
    fn test_selection_defaults() {
        let selection = PackageSelection::default();
        assert!(selection.on_media);
        assert_eq!(selection.selected_or_default(OsVariant::Lxde, false, false), vec!["LXDE"]);

        let custom = PackageSelection {
            selected: Some(vec!["GNOME".into()]),
            ..PackageSelection::default()
        };
        assert_eq!(custom.selected_or_default(OsVariant::Kde, true, true), vec!["GNOME"]);
    }
}
