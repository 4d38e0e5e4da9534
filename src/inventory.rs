//! Disk inventory model
//!
//! Read-only view of the drives and slices reported by the hardware probe.
//! The planner resolves its target here; the summarizer and serializer use it
//! to spot "Unused Space" slices.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PlanError, Result};
use crate::layout::SliceRef;

/// Label the probe gives to free space that is not yet a real slice
pub const UNUSED_SPACE_LABEL: &str = "Unused Space";

/// Size as reported by the probe: a JSON number or a numeric string.
/// Anything else is kept as is and never resolves to a size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportedSize {
    Number(i64),
    Text(String),
    Other(serde_json::Value),
}

impl ReportedSize {
    /// Size in MB, or `None` when the value is not a non-negative integer.
    pub fn parse(&self) -> Option<u64> {
        match self {
            Self::Number(n) => u64::try_from(*n).ok(),
            Self::Text(s) => s.trim().parse::<u64>().ok(),
            Self::Other(_) => None,
        }
    }
}

impl From<u64> for ReportedSize {
    fn from(mb: u64) -> Self {
        Self::Number(i64::try_from(mb).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for ReportedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
            Self::Other(value) => write!(f, "{}", value),
        }
    }
}

/// One detected drive or slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DiskEntry {
    /// A whole disk, e.g. `ada0`
    #[serde(rename = "DRIVE")]
    Drive {
        id: String,
        size_mb: ReportedSize,
        #[serde(default)]
        label: String,
    },
    /// A partition-table entry on a disk, e.g. `ada0s1` on `ada0`
    #[serde(rename = "SLICE")]
    Slice {
        parent: String,
        id: String,
        size_mb: ReportedSize,
        #[serde(default)]
        label: String,
    },
}

impl DiskEntry {
    pub fn drive(id: impl Into<String>, size_mb: u64) -> Self {
        Self::Drive {
            id: id.into(),
            size_mb: size_mb.into(),
            label: String::new(),
        }
    }

    pub fn slice(
        parent: impl Into<String>,
        id: impl Into<String>,
        size_mb: u64,
        label: impl Into<String>,
    ) -> Self {
        Self::Slice {
            parent: parent.into(),
            id: id.into(),
            size_mb: size_mb.into(),
            label: label.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Drive { id, .. } | Self::Slice { id, .. } => id,
        }
    }

    pub fn size(&self) -> &ReportedSize {
        match self {
            Self::Drive { size_mb, .. } | Self::Slice { size_mb, .. } => size_mb,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Drive { label, .. } | Self::Slice { label, .. } => label,
        }
    }
}

/// What the planner should lay out: a whole drive or one slice of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Drive(String),
    /// Full slice identifier, e.g. `ada0s2`
    Slice(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drive(id) | Self::Slice(id) => f.write_str(id),
        }
    }
}

/// A target matched against the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub disk: String,
    pub slice: SliceRef,
    pub size_mb: u64,
}

/// Ordered snapshot of the probe's drives and slices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    entries: Vec<DiskEntry>,
}

impl Inventory {
    pub fn new(entries: Vec<DiskEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DiskEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drives in probe order
    pub fn drives(&self) -> impl Iterator<Item = &DiskEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e, DiskEntry::Drive { .. }))
    }

    /// Look up a target and parse its size.
    ///
    /// # Errors
    ///
    /// `PlanError::UnresolvedTarget` when no entry of the right kind carries
    /// the identifier, when its size is not a non-negative integer, or when a
    /// slice id does not start with its parent disk id.
    pub fn resolve(&self, target: &Target) -> Result<ResolvedTarget> {
        let entry = self
            .entries
            .iter()
            .find(|e| match (target, e) {
                (Target::Drive(want), DiskEntry::Drive { id, .. }) => id == want,
                (Target::Slice(want), DiskEntry::Slice { id, .. }) => id == want,
                _ => false,
            })
            .ok_or_else(|| PlanError::unresolved(target.to_string(), "not found in inventory"))?;

        let size_mb = entry.size().parse().ok_or_else(|| {
            PlanError::unresolved(
                target.to_string(),
                format!("size '{}' is not a non-negative integer", entry.size()),
            )
        })?;

        let (disk, slice) = match entry {
            DiskEntry::Drive { id, .. } => (id.clone(), SliceRef::All),
            DiskEntry::Slice { parent, id, .. } => {
                let suffix = id
                    .strip_prefix(parent.as_str())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        PlanError::unresolved(
                            id.clone(),
                            format!("slice id does not extend parent disk '{}'", parent),
                        )
                    })?;
                (parent.clone(), SliceRef::Slice(suffix.to_string()))
            }
        };

        Ok(ResolvedTarget { disk, slice, size_mb })
    }

    /// Size of the disk/slice a plan group lives on, if known.
    pub fn size_of(&self, disk: &str, slice: &SliceRef) -> Option<u64> {
        let target = match slice {
            SliceRef::All => Target::Drive(disk.to_string()),
            SliceRef::Slice(s) => Target::Slice(format!("{}{}", disk, s)),
        };
        self.resolve(&target).ok().map(|t| t.size_mb)
    }

    /// True when `disk`+`slice` is a slice the probe labelled as unused space.
    pub fn is_unused_space(&self, disk: &str, slice: &SliceRef) -> bool {
        let SliceRef::Slice(suffix) = slice else {
            return false;
        };
        self.entries.iter().any(|e| match e {
            DiskEntry::Slice { parent, id, label, .. } => {
                parent == disk
                    && id.strip_prefix(disk) == Some(suffix.as_str())
                    && label == UNUSED_SPACE_LABEL
            }
            DiskEntry::Drive { .. } => false,
        })
    }
}

impl FromIterator<DiskEntry> for Inventory {
    fn from_iter<I: IntoIterator<Item = DiskEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Inventory {
        Inventory::new(vec![
            DiskEntry::drive("ada0", 100_000),
            DiskEntry::slice("ada0", "ada0s1", 60_000, "FreeBSD"),
            DiskEntry::slice("ada0", "ada0s2", 40_000, UNUSED_SPACE_LABEL),
            DiskEntry::Drive {
                id: "da0".to_string(),
                size_mb: ReportedSize::Text("n/a".to_string()),
                label: String::new(),
            },
        ])
    }

    #[test]
    fn test_resolve_drive() {
        let resolved = sample().resolve(&Target::Drive("ada0".into())).unwrap();
        assert_eq!(resolved.disk, "ada0");
        assert_eq!(resolved.slice, SliceRef::All);
        assert_eq!(resolved.size_mb, 100_000);
    }

    #[test]
    fn test_resolve_slice_splits_parent_and_suffix() {
        let resolved = sample().resolve(&Target::Slice("ada0s2".into())).unwrap();
        assert_eq!(resolved.disk, "ada0");
        assert_eq!(resolved.slice, SliceRef::Slice("s2".into()));
        assert_eq!(resolved.size_mb, 40_000);
    }

    #[test]
    fn test_resolve_unknown_target() {
        let err = sample().resolve(&Target::Drive("ada7".into())).unwrap_err();
        assert!(matches!(err, PlanError::UnresolvedTarget { .. }));
    }

    #[test]
    fn test_resolve_kind_must_match() {
        // A slice id is not a drive
        assert!(sample().resolve(&Target::Drive("ada0s1".into())).is_err());
    }

    #[test]
    fn test_resolve_non_numeric_size() {
        let err = sample().resolve(&Target::Drive("da0".into())).unwrap_err();
        assert!(err.to_string().contains("not a non-negative integer"));
    }

    #[test]
    fn test_reported_size_parse() {
        assert_eq!(ReportedSize::Number(42).parse(), Some(42));
        assert_eq!(ReportedSize::Number(-1).parse(), None);
        assert_eq!(ReportedSize::Text(" 512 ".into()).parse(), Some(512));
        assert_eq!(ReportedSize::Text("12GB".into()).parse(), None);
    }

    #[test]
    fn test_unused_space_detection() {
        let inv = sample();
        assert!(inv.is_unused_space("ada0", &SliceRef::Slice("s2".into())));
        assert!(!inv.is_unused_space("ada0", &SliceRef::Slice("s1".into())));
        assert!(!inv.is_unused_space("ada0", &SliceRef::All));
    }

    #[test]
    fn test_size_of_group() {
        let inv = sample();
        assert_eq!(inv.size_of("ada0", &SliceRef::All), Some(100_000));
        assert_eq!(inv.size_of("ada0", &SliceRef::Slice("s1".into())), Some(60_000));
        assert_eq!(inv.size_of("ada9", &SliceRef::All), None);
    }

    #[test]
    fn test_inventory_json_shape() {
        let json = r#"[
            { "kind": "DRIVE", "id": "ada0", "size_mb": 1000 },
            { "kind": "SLICE", "parent": "ada0", "id": "ada0p2", "size_mb": "900", "label": "Unused Space" }
        ]"#;
        let inv: Inventory = serde_json::from_str(json).unwrap();
        assert_eq!(inv.len(), 2);
        assert_eq!(inv.drives().count(), 1);
        assert!(inv.is_unused_space("ada0", &SliceRef::Slice("p2".into())));
    }

    #[test]
    fn test_fractional_size_only_blocks_its_entry() {
        let json = r#"[
            { "kind": "DRIVE", "id": "ada0", "size_mb": 1000.5 },
            { "kind": "DRIVE", "id": "ada1", "size_mb": 2000 }
        ]"#;
        let inv: Inventory = serde_json::from_str(json).unwrap();
        assert_eq!(inv.len(), 2);

        let err = inv.resolve(&Target::Drive("ada0".into())).unwrap_err();
        assert!(matches!(err, PlanError::UnresolvedTarget { .. }));
        assert_eq!(inv.resolve(&Target::Drive("ada1".into())).unwrap().size_mb, 2000);
    }
}
