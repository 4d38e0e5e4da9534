//! Planned disk layout
//!
//! A `LayoutPlan` is either `Manual` (extract into an already mounted target)
//! or an ordered list of `PartitionSpec`s. Entries that share a disk and slice
//! form one group; see `engine::groups` for how groups are ordered.

use anyhow::Context;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::engine::groups::group_layout;
use crate::error::{PlanError, Result};
use crate::types::{Filesystem, MirrorBalance};

/// Slice token used for whole-disk targets
pub const ALL_SLICES: &str = "ALL";

/// Which part of a disk a partition lives on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SliceRef {
    /// The whole disk
    All,
    /// A slice suffix such as `s1` or `p2`
    Slice(String),
}

impl From<String> for SliceRef {
    fn from(s: String) -> Self {
        if s == ALL_SLICES {
            Self::All
        } else {
            Self::Slice(s)
        }
    }
}

impl From<SliceRef> for String {
    fn from(slice: SliceRef) -> Self {
        slice.to_string()
    }
}

impl fmt::Display for SliceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_SLICES),
            Self::Slice(s) => f.write_str(s),
        }
    }
}

/// A ZFS dataset with optional properties, written `path(prop=value)`.
///
/// Plan files may give a dataset as that string or as `{ "path", "options" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

impl Dataset {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: None,
        }
    }

    pub fn with_options(path: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: Some(options.into()),
        }
    }

    /// Human-readable form with a space before the options: `/tmp (compress=lzjb)`
    pub fn spaced(&self) -> String {
        match &self.options {
            Some(opts) => format!("{} ({})", self.path, opts),
            None => self.path.clone(),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.options {
            Some(opts) => write!(f, "{}({})", self.path, opts),
            None => f.write_str(&self.path),
        }
    }
}

impl FromStr for Dataset {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (path, options) = match s.split_once('(') {
            Some((path, rest)) => {
                let opts = rest.strip_suffix(')').ok_or_else(|| {
                    PlanError::layout(format!("unterminated options in dataset '{}'", s))
                })?;
                (path, Some(opts.to_string()))
            }
            None => (s, None),
        };

        if !path.starts_with('/') {
            return Err(PlanError::layout(format!(
                "dataset '{}' must be an absolute path",
                s
            )));
        }

        Ok(Self {
            path: path.to_string(),
            options,
        })
    }
}

/// Where a filesystem entry is mounted.
///
/// Hand-edited plan files may use the text form instead, e.g.
/// `"/,/tmp(compress=lzjb)"` or `"SWAP"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mount {
    /// A single mount point such as `/usr`
    Path(String),
    /// ZFS pool datasets, root first
    Datasets(Vec<Dataset>),
    Swap,
}

impl Mount {
    /// Mount points this entry provides, used to find the `/boot` or `/` entry.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::Path(p) => vec![p.as_str()],
            Self::Datasets(ds) => ds.iter().map(|d| d.path.as_str()).collect(),
            Self::Swap => Vec::new(),
        }
    }
}

/// Legacy text form: comma-joined datasets, a plain path, or `SWAP`.
impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => f.write_str(p),
            Self::Datasets(ds) => {
                let joined: Vec<String> = ds.iter().map(ToString::to_string).collect();
                f.write_str(&joined.join(","))
            }
            Self::Swap => f.write_str("SWAP"),
        }
    }
}

impl FromStr for Mount {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("SWAP") {
            return Ok(Self::Swap);
        }
        if s.contains(',') || s.contains('(') {
            let datasets = s
                .split(',')
                .map(Dataset::from_str)
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::Datasets(datasets));
        }
        if !s.starts_with('/') {
            return Err(PlanError::layout(format!("mount point '{}' must be absolute", s)));
        }
        Ok(Self::Path(s.to_string()))
    }
}

#[derive(Deserialize)]
struct DatasetFields {
    path: String,
    #[serde(default)]
    options: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetRepr {
    Text(String),
    Fields(DatasetFields),
}

impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match DatasetRepr::deserialize(deserializer)? {
            DatasetRepr::Text(text) => text.parse().map_err(de::Error::custom),
            DatasetRepr::Fields(DatasetFields { path, options }) => Ok(Self { path, options }),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum MountFields {
    Path(String),
    Datasets(Vec<Dataset>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MountRepr {
    Text(String),
    Fields(MountFields),
}

impl<'de> Deserialize<'de> for Mount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match MountRepr::deserialize(deserializer)? {
            // "swap" is also how the structured form writes `Mount::Swap`
            MountRepr::Text(text) => text.parse().map_err(de::Error::custom),
            MountRepr::Fields(MountFields::Path(path)) => Ok(Self::Path(path)),
            MountRepr::Fields(MountFields::Datasets(datasets)) => Ok(Self::Datasets(datasets)),
        }
    }
}

/// What an entry does on its slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Role {
    Filesystem { filesystem: Filesystem, mount: Mount },
    /// This entry's disk mirrors `target_disk`
    Mirror {
        target_disk: String,
        #[serde(default)]
        balance: MirrorBalance,
    },
}

/// One partition or dataset-pool entry of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub disk: String,
    pub slice: SliceRef,
    pub role: Role,
    /// Size in MB. 0 means "rest of the slice" and belongs on the last entry of a group.
    pub size_mb: u64,
    /// Extra options appended in parentheses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    /// GELI passphrase for encrypted filesystems
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

impl PartitionSpec {
    pub fn filesystem(
        disk: impl Into<String>,
        slice: SliceRef,
        filesystem: Filesystem,
        mount: Mount,
        size_mb: u64,
    ) -> Self {
        Self {
            disk: disk.into(),
            slice,
            role: Role::Filesystem { filesystem, mount },
            size_mb,
            options: None,
            passphrase: None,
        }
    }

    pub fn swap(disk: impl Into<String>, slice: SliceRef, size_mb: u64) -> Self {
        Self::filesystem(disk, slice, Filesystem::Swap, Mount::Swap, size_mb)
    }

    pub fn mirror(
        disk: impl Into<String>,
        target_disk: impl Into<String>,
        balance: MirrorBalance,
    ) -> Self {
        Self {
            disk: disk.into(),
            slice: SliceRef::All,
            role: Role::Mirror {
                target_disk: target_disk.into(),
                balance,
            },
            size_mb: 0,
            options: None,
            passphrase: None,
        }
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    pub fn filesystem_type(&self) -> Option<Filesystem> {
        match &self.role {
            Role::Filesystem { filesystem, .. } => Some(*filesystem),
            Role::Mirror { .. } => None,
        }
    }

    pub fn mount(&self) -> Option<&Mount> {
        match &self.role {
            Role::Filesystem { mount, .. } => Some(mount),
            Role::Mirror { .. } => None,
        }
    }

    /// Disk this entry mirrors, if it is a mirror directive
    pub fn mirror_target(&self) -> Option<&str> {
        match &self.role {
            Role::Mirror { target_disk, .. } => Some(target_disk),
            Role::Filesystem { .. } => None,
        }
    }

    pub fn is_swap(&self) -> bool {
        matches!(self.mount(), Some(Mount::Swap))
    }

    /// ZFS-rooted entry (a pool on this slice)
    pub fn is_zfs(&self) -> bool {
        self.filesystem_type().is_some_and(Filesystem::is_zfs)
    }

    pub fn mount_targets(&self) -> Vec<&str> {
        self.mount().map(Mount::targets).unwrap_or_default()
    }
}

/// The planned layout handed to the summarizer and serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "entries", rename_all = "lowercase")]
pub enum LayoutPlan {
    /// Skip partitioning and extract into the file-system mounted at /mnt
    Manual,
    Partitions(Vec<PartitionSpec>),
}

impl LayoutPlan {
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }

    /// Entries in plan order; empty for `Manual`.
    pub fn entries(&self) -> &[PartitionSpec] {
        match self {
            Self::Manual => &[],
            Self::Partitions(entries) => entries,
        }
    }

    /// Check the invariants a hand-edited plan must keep.
    ///
    /// - At most one swap and one ZFS-rooted entry per (disk, slice)
    /// - Size 0 only on the last entry a group hands downstream
    /// - Every mirror targets a disk that is partitioned by this plan
    pub fn validate(&self) -> Result<()> {
        let entries = match self {
            Self::Manual => return Ok(()),
            Self::Partitions(entries) => entries,
        };

        if entries.is_empty() {
            return Err(PlanError::layout("plan has no partitions"));
        }

        for spec in entries {
            if let Some(target) = spec.mirror_target() {
                if target == spec.disk {
                    return Err(PlanError::layout(format!(
                        "disk '{}' cannot mirror itself",
                        spec.disk
                    )));
                }
                let target_planned = entries
                    .iter()
                    .any(|e| e.mirror_target().is_none() && e.disk == target);
                if !target_planned {
                    return Err(PlanError::layout(format!(
                        "mirror on '{}' targets '{}', which has no partitions in this plan",
                        spec.disk, target
                    )));
                }
            }
        }

        for group in group_layout(entries) {
            let members = group.members();
            let location = format!("{}({})", group.disk, group.slice);

            if members.iter().filter(|s| s.is_swap()).count() > 1 {
                return Err(PlanError::layout(format!("more than one swap entry on {}", location)));
            }
            if members.iter().filter(|s| s.is_zfs()).count() > 1 {
                return Err(PlanError::layout(format!(
                    "more than one ZFS pool on {}",
                    location
                )));
            }

            let last = group.entries.len().saturating_sub(1);
            if let Some(pos) = group
                .entries
                .iter()
                .position(|placed| placed.spec.size_mb == 0)
                .filter(|pos| *pos < last)
            {
                return Err(PlanError::layout(format!(
                    "entry {} on {} uses size 0 but is not the last partition",
                    pos + 1,
                    location
                )));
            }
        }

        Ok(())
    }

    /// Save the plan to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize layout plan")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write layout plan to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load a (possibly hand-edited) plan from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read layout plan from {:?}", path.as_ref()))?;

        let plan: Self =
            serde_json::from_str(&content).context("Failed to parse layout plan JSON")?;

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn ufs(mount: &str, size: u64) -> PartitionSpec {
        PartitionSpec::filesystem(
            "ada0",
            SliceRef::All,
            Filesystem::UfsJournaledSoftUpdates,
            Mount::Path(mount.to_string()),
            size,
        )
    }

    #[test]
    fn test_slice_ref_string_forms() {
        assert_eq!(SliceRef::from("ALL".to_string()), SliceRef::All);
        assert_eq!(SliceRef::from("s1".to_string()), SliceRef::Slice("s1".into()));
        assert_eq!(SliceRef::Slice("p2".into()).to_string(), "p2");
        assert_eq!(serde_json::to_string(&SliceRef::All).unwrap(), "\"ALL\"");
    }

    #[test]
    fn test_dataset_parse_and_display() {
        let ds: Dataset = "/usr/ports(compress=gzip)".parse().unwrap();
        assert_eq!(ds.path, "/usr/ports");
        assert_eq!(ds.options.as_deref(), Some("compress=gzip"));
        assert_eq!(ds.to_string(), "/usr/ports(compress=gzip)");
        assert_eq!(ds.spaced(), "/usr/ports (compress=gzip)");

        let plain: Dataset = "/usr/home".parse().unwrap();
        assert_eq!(plain.options, None);
    }

    #[test]
    fn test_dataset_parse_rejects_garbage() {
        assert!("usr".parse::<Dataset>().is_err());
        assert!("/tmp(compress=lzjb".parse::<Dataset>().is_err());
    }

    #[test]
    fn test_mount_parse() {
        assert_eq!("SWAP".parse::<Mount>().unwrap(), Mount::Swap);
        assert_eq!("/var".parse::<Mount>().unwrap(), Mount::Path("/var".into()));

        let mount: Mount = "/,/tmp(compress=lzjb),/usr(canmount=off)".parse().unwrap();
        assert_eq!(mount.targets(), vec!["/", "/tmp", "/usr"]);
        assert_eq!(mount.to_string(), "/,/tmp(compress=lzjb),/usr(canmount=off)");
    }

    #[test]
    fn test_spec_predicates() {
        let swap = PartitionSpec::swap("ada0", SliceRef::All, 512);
        assert!(swap.is_swap());
        assert!(!swap.is_zfs());
        assert!(swap.mount_targets().is_empty());

        let mirror = PartitionSpec::mirror("ada1", "ada0", MirrorBalance::Load);
        assert_eq!(mirror.mirror_target(), Some("ada0"));
        assert_eq!(mirror.filesystem_type(), None);
    }

    #[test]
    fn test_manual_plan_has_no_entries() {
        assert!(LayoutPlan::Manual.entries().is_empty());
        assert!(LayoutPlan::Manual.validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_ufs_layout() {
        let plan = LayoutPlan::Partitions(vec![
            ufs("/", 2000),
            PartitionSpec::swap("ada0", SliceRef::All, 1000),
            ufs("/usr", 0),
        ]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_two_swaps() {
        let plan = LayoutPlan::Partitions(vec![
            ufs("/", 2000),
            PartitionSpec::swap("ada0", SliceRef::All, 1000),
            PartitionSpec::swap("ada0", SliceRef::All, 1000),
        ]);
        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("swap"));
    }

    #[test]
    fn test_validate_rejects_early_sentinel() {
        let plan = LayoutPlan::Partitions(vec![ufs("/", 0), ufs("/usr", 4000)]);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_orphan_mirror() {
        let plan = LayoutPlan::Partitions(vec![
            ufs("/", 2000),
            PartitionSpec::mirror("ada1", "ada5", MirrorBalance::Load),
        ]);
        let err = plan.validate().unwrap_err();
        assert!(err.to_string().contains("ada5"));
    }

    #[test]
    fn test_validate_rejects_empty_plan() {
        assert!(LayoutPlan::Partitions(Vec::new()).validate().is_err());
    }

    #[test]
    fn test_plan_json_shape() {
        let plan = LayoutPlan::Partitions(vec![ufs("/", 2000)]);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["mode"], "partitions");
        assert_eq!(json["entries"][0]["role"]["kind"], "filesystem");
        assert_eq!(json["entries"][0]["role"]["filesystem"], "UFS+SUJ");

        let manual = serde_json::to_value(&LayoutPlan::Manual).unwrap();
        assert_eq!(manual["mode"], "manual");
    }

    #[test]
    fn test_mount_accepts_text_form_in_json() {
        let mount: Mount = serde_json::from_str(r#""/,/tmp(compress=lzjb),/usr/home""#).unwrap();
        assert_eq!(
            mount,
            Mount::Datasets(vec![
                Dataset::new("/"),
                Dataset::with_options("/tmp", "compress=lzjb"),
                Dataset::new("/usr/home"),
            ])
        );
        assert_eq!(serde_json::from_str::<Mount>(r#""SWAP""#).unwrap(), Mount::Swap);
        assert_eq!(serde_json::from_str::<Mount>(r#""/var""#).unwrap(), Mount::Path("/var".into()));
        assert!(serde_json::from_str::<Mount>(r#""var""#).is_err());

        let datasets: Mount =
            serde_json::from_str(r#"{ "datasets": ["/", { "path": "/tmp", "options": "compress=lzjb" }] }"#)
                .unwrap();
        assert_eq!(datasets.to_string(), "/,/tmp(compress=lzjb)");
    }

    #[test]
    fn test_hand_edited_plan_loads() {
        let json = r#"{
            "mode": "partitions",
            "entries": [
                { "disk": "ada0", "slice": "ALL", "size_mb": 2000,
                  "role": { "kind": "filesystem", "filesystem": "ZFS", "mount": "/,/var(canmount=off)" } },
                { "disk": "ada0", "slice": "ALL", "size_mb": 512,
                  "role": { "kind": "filesystem", "filesystem": "SWAP", "mount": "SWAP" } }
            ]
        }"#;
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, json.as_bytes()).unwrap();

        let plan = LayoutPlan::load_from_file(file.path()).unwrap();
        let entries = plan.entries();
        assert_eq!(entries[0].mount_targets(), vec!["/", "/var"]);
        assert!(entries[1].is_swap());
    }

    #[test]
    fn test_save_and_load_plan() {
        let plan = LayoutPlan::Partitions(vec![
            ufs("/", 2000),
            PartitionSpec::swap("ada0", SliceRef::All, 256).with_passphrase("hunter2"),
        ]);
        let file = NamedTempFile::new().unwrap();
        plan.save_to_file(file.path()).unwrap();

        let loaded = LayoutPlan::load_from_file(file.path()).unwrap();
        assert_eq!(loaded, plan);
    }
}
