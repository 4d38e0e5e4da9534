//! Type-safe configuration types for the layout planner
//!
//! Every value that ends up in the generated pc-sysinstall config is an enum
//! here, so typos in filesystem names or directive values cannot reach disk.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Filesystem types understood by pc-sysinstall
///
/// The `.eli` variants are GELI-encrypted and expect an `encpass=` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum Filesystem {
    #[strum(serialize = "UFS")]
    #[serde(rename = "UFS")]
    Ufs,
    #[strum(serialize = "UFS+S")]
    #[serde(rename = "UFS+S")]
    UfsSoftUpdates,
    #[strum(serialize = "UFS+SUJ")]
    #[serde(rename = "UFS+SUJ")]
    UfsJournaledSoftUpdates,
    #[strum(serialize = "UFS+J")]
    #[serde(rename = "UFS+J")]
    UfsJournaled,
    #[strum(serialize = "ZFS")]
    #[serde(rename = "ZFS")]
    Zfs,
    #[strum(serialize = "SWAP")]
    #[serde(rename = "SWAP")]
    Swap,
    #[strum(serialize = "UFS.eli")]
    #[serde(rename = "UFS.eli")]
    UfsEli,
    #[strum(serialize = "UFS+S.eli")]
    #[serde(rename = "UFS+S.eli")]
    UfsSoftUpdatesEli,
    #[strum(serialize = "UFS+SUJ.eli")]
    #[serde(rename = "UFS+SUJ.eli")]
    UfsJournaledSoftUpdatesEli,
    #[strum(serialize = "UFS+J.eli")]
    #[serde(rename = "UFS+J.eli")]
    UfsJournaledEli,
    #[strum(serialize = "ZFS.eli")]
    #[serde(rename = "ZFS.eli")]
    ZfsEli,
    #[strum(serialize = "SWAP.eli")]
    #[serde(rename = "SWAP.eli")]
    SwapEli,
}

impl Filesystem {
    /// ZFS pool, encrypted or not
    pub fn is_zfs(self) -> bool {
        matches!(self, Self::Zfs | Self::ZfsEli)
    }

    pub fn is_swap(self) -> bool {
        matches!(self, Self::Swap | Self::SwapEli)
    }

    /// GELI-encrypted variant
    pub fn is_encrypted(self) -> bool {
        matches!(
            self,
            Self::UfsEli
                | Self::UfsSoftUpdatesEli
                | Self::UfsJournaledSoftUpdatesEli
                | Self::UfsJournaledEli
                | Self::ZfsEli
                | Self::SwapEli
        )
    }
}

/// Partition table written to the target disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartitionScheme {
    #[default]
    #[strum(serialize = "GPT")]
    Gpt,
    #[strum(serialize = "MBR")]
    Mbr,
}

/// Boot manager choice ("load MBR")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BootManager {
    /// Install the BSD boot manager
    Bsd,
    #[default]
    None,
}

/// Read balancing algorithm for a gmirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MirrorBalance {
    #[default]
    Load,
    Prefer,
    RoundRobin,
    Split,
}

/// Operating system flavour selected on the desktop wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OsVariant {
    /// Plain FreeBSD server, no meta-packages
    FreeBsd,
    /// Console TrueOS server
    TrueOs,
    #[default]
    Kde,
    Lxde,
    Gnome,
    Xfce,
}

impl OsVariant {
    /// Desktop variants install PC-BSD with a desktop environment
    pub fn is_desktop(self) -> bool {
        !self.is_server()
    }

    pub fn is_server(self) -> bool {
        matches!(self, Self::FreeBsd | Self::TrueOs)
    }
}

/// Optional system components installed alongside the base system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Src,
    Ports,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_filesystem_names_match_sysinstall() {
        assert_eq!(Filesystem::UfsJournaledSoftUpdates.to_string(), "UFS+SUJ");
        assert_eq!(Filesystem::ZfsEli.to_string(), "ZFS.eli");
        assert_eq!(Filesystem::from_str("SWAP").ok(), Some(Filesystem::Swap));
        assert!(Filesystem::from_str("ext4").is_err());
    }

    #[test]
    fn test_filesystem_predicates() {
        assert!(Filesystem::Zfs.is_zfs());
        assert!(Filesystem::ZfsEli.is_zfs());
        assert!(!Filesystem::Ufs.is_zfs());
        assert!(Filesystem::SwapEli.is_swap());
        assert!(Filesystem::SwapEli.is_encrypted());
        assert!(!Filesystem::UfsJournaledSoftUpdates.is_encrypted());
    }

    #[test]
    fn test_filesystem_serde_uses_sysinstall_names() {
        let json = serde_json::to_string(&Filesystem::UfsJournaledSoftUpdates).unwrap();
        assert_eq!(json, "\"UFS+SUJ\"");
        let parsed: Filesystem = serde_json::from_str("\"ZFS\"").unwrap();
        assert_eq!(parsed, Filesystem::Zfs);
    }

    #[test]
    fn test_every_filesystem_round_trips_through_display() {
        for fs in Filesystem::iter() {
            assert_eq!(Filesystem::from_str(&fs.to_string()).ok(), Some(fs));
        }
    }

    #[test]
    fn test_mirror_balance_names() {
        assert_eq!(MirrorBalance::RoundRobin.to_string(), "round-robin");
        assert_eq!(MirrorBalance::default(), MirrorBalance::Load);
    }

    #[test]
    fn test_os_variant_families() {
        assert!(OsVariant::FreeBsd.is_server());
        assert!(OsVariant::TrueOs.is_server());
        assert!(OsVariant::Lxde.is_desktop());
        assert_eq!(OsVariant::from_str("trueos").ok(), Some(OsVariant::TrueOs));
    }

    #[test]
    fn test_boot_manager_and_scheme_display() {
        assert_eq!(BootManager::Bsd.to_string(), "bsd");
        assert_eq!(BootManager::None.to_string(), "none");
        assert_eq!(PartitionScheme::Mbr.to_string(), "MBR");
    }
}
