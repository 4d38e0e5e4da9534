//! Grouped view of a layout
//!
//! The summarizer and the serializer both walk a plan one (disk, slice) group
//! at a time, in the order groups first appear. Inside a group the entries are
//! placed as:
//!
//! 1. the start entry: the one providing `/boot` if the group has one, else `/`
//! 2. the swap entry
//! 3. everything else in plan order; the last of these is handed downstream
//!    with size 0 so it takes whatever space is left
//!
//! Mirror directives never form groups of their own. Each attaches to the
//! first group on its target disk that has no mirror yet.

use crate::layout::{PartitionSpec, SliceRef};

/// Mount point that, when present in a group, is listed before `/`
pub const BOOT_MOUNT: &str = "/boot";
pub const ROOT_MOUNT: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Start,
    Swap,
    Rest,
}

/// An entry in the position its group hands it downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedEntry<'a> {
    pub spec: &'a PartitionSpec,
    pub placement: Placement,
    /// Stored size, or 0 for the last `Rest` entry of the group
    pub effective_size_mb: u64,
}

/// All entries sharing one disk and slice.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceGroup<'a> {
    pub disk: &'a str,
    pub slice: &'a SliceRef,
    /// Mirror directive hoisted from elsewhere in the plan
    pub mirror: Option<&'a PartitionSpec>,
    pub entries: Vec<PlacedEntry<'a>>,
}

impl<'a> SliceGroup<'a> {
    pub fn members(&self) -> Vec<&'a PartitionSpec> {
        self.entries.iter().map(|placed| placed.spec).collect()
    }
}

/// Split a plan's entries into ordered groups without touching the plan.
pub fn group_layout(entries: &[PartitionSpec]) -> Vec<SliceGroup<'_>> {
    let (mut unclaimed_mirrors, members): (Vec<&PartitionSpec>, Vec<&PartitionSpec>) = entries
        .iter()
        .partition(|spec| spec.mirror_target().is_some());

    let mut keys: Vec<(&str, &SliceRef)> = Vec::new();
    for spec in members.iter().copied() {
        let key = (spec.disk.as_str(), &spec.slice);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    let mut groups = Vec::with_capacity(keys.len());
    for (disk, slice) in keys {
        let mirror = unclaimed_mirrors
            .iter()
            .position(|m| m.mirror_target() == Some(disk))
            .map(|idx| unclaimed_mirrors.remove(idx));

        let group_members: Vec<&PartitionSpec> = members
            .iter()
            .copied()
            .filter(|spec| spec.disk == disk && &spec.slice == slice)
            .collect();

        groups.push(SliceGroup {
            disk,
            slice,
            mirror,
            entries: place(&group_members),
        });
    }

    for orphan in unclaimed_mirrors {
        tracing::warn!(
            "Ignoring mirror on {}: target disk {:?} has no partitions in the plan",
            orphan.disk,
            orphan.mirror_target()
        );
    }

    groups
}

/// Mount point a group is listed from: `/boot` when one of its entries provides it.
pub fn start_mount(members: &[&PartitionSpec]) -> &'static str {
    if members
        .iter()
        .any(|spec| spec.mount_targets().contains(&BOOT_MOUNT))
    {
        BOOT_MOUNT
    } else {
        ROOT_MOUNT
    }
}

fn place<'a>(members: &[&'a PartitionSpec]) -> Vec<PlacedEntry<'a>> {
    let wanted = start_mount(members);
    let start = members
        .iter()
        .position(|spec| spec.mount_targets().contains(&wanted));
    let swap = members
        .iter()
        .enumerate()
        .position(|(idx, spec)| Some(idx) != start && spec.is_swap());

    let mut placed = Vec::with_capacity(members.len());
    for (idx, placement) in [(start, Placement::Start), (swap, Placement::Swap)] {
        if let Some(idx) = idx {
            placed.push(PlacedEntry {
                spec: members[idx],
                placement,
                effective_size_mb: members[idx].size_mb,
            });
        }
    }

    let rest: Vec<&PartitionSpec> = members
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != start && Some(*idx) != swap)
        .map(|(_, spec)| *spec)
        .collect();
    let last = rest.len().saturating_sub(1);
    for (idx, spec) in rest.into_iter().enumerate() {
        placed.push(PlacedEntry {
            spec,
            placement: Placement::Rest,
            effective_size_mb: if idx == last { 0 } else { spec.size_mb },
        });
    }

    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Mount;
    use crate::types::{Filesystem, MirrorBalance};

    fn ufs(disk: &str, slice: SliceRef, mount: &str, size: u64) -> PartitionSpec {
        PartitionSpec::filesystem(
            disk,
            slice,
            Filesystem::UfsJournaledSoftUpdates,
            Mount::Path(mount.to_string()),
            size,
        )
    }

    #[test]
    fn test_start_swap_rest_order() {
        let entries = vec![
            ufs("ada0", SliceRef::All, "/usr", 5000),
            PartitionSpec::swap("ada0", SliceRef::All, 1000),
            ufs("ada0", SliceRef::All, "/var", 2048),
            ufs("ada0", SliceRef::All, "/", 2000),
        ];
        let groups = group_layout(&entries);
        assert_eq!(groups.len(), 1);

        let order: Vec<(Placement, Vec<&str>)> = groups[0]
            .entries
            .iter()
            .map(|p| (p.placement, p.spec.mount_targets()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Placement::Start, vec!["/"]),
                (Placement::Swap, vec![]),
                (Placement::Rest, vec!["/usr"]),
                (Placement::Rest, vec!["/var"]),
            ]
        );
    }

    #[test]
    fn test_boot_entry_goes_first() {
        let entries = vec![
            ufs("ada0", SliceRef::All, "/", 8000),
            ufs("ada0", SliceRef::All, "/boot", 512),
        ];
        let groups = group_layout(&entries);
        let first = &groups[0].entries[0];
        assert_eq!(first.placement, Placement::Start);
        assert_eq!(first.spec.mount_targets(), vec!["/boot"]);
        // "/" becomes the remaining-space entry
        assert_eq!(groups[0].entries[1].effective_size_mb, 0);
    }

    #[test]
    fn test_last_remaining_entry_gets_sentinel() {
        let entries = vec![
            ufs("ada0", SliceRef::All, "/", 2000),
            PartitionSpec::swap("ada0", SliceRef::All, 500),
            ufs("ada0", SliceRef::All, "/usr", 3000),
        ];
        let groups = group_layout(&entries);
        let sizes: Vec<u64> = groups[0].entries.iter().map(|p| p.effective_size_mb).collect();
        assert_eq!(sizes, vec![2000, 500, 0]);
        // The plan itself is untouched
        assert_eq!(entries[2].size_mb, 3000);
    }

    #[test]
    fn test_groups_keep_first_seen_order() {
        let entries = vec![
            ufs("ada1", SliceRef::Slice("s1".into()), "/", 2000),
            ufs("ada0", SliceRef::All, "/", 2000),
            ufs("ada1", SliceRef::Slice("s1".into()), "/usr", 4000),
        ];
        let groups = group_layout(&entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].disk, "ada1");
        assert_eq!(groups[0].entries.len(), 2);
        assert_eq!(groups[1].disk, "ada0");
    }

    #[test]
    fn test_mirror_is_hoisted_to_target_group() {
        let entries = vec![
            PartitionSpec::mirror("ada1", "ada0", MirrorBalance::RoundRobin),
            ufs("ada0", SliceRef::All, "/", 2000),
        ];
        let groups = group_layout(&entries);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].disk, "ada0");
        assert_eq!(groups[0].mirror.map(|m| m.disk.as_str()), Some("ada1"));
        assert_eq!(groups[0].entries.len(), 1);
    }

    #[test]
    fn test_orphan_mirror_is_dropped() {
        let entries = vec![
            ufs("ada0", SliceRef::All, "/", 2000),
            PartitionSpec::mirror("ada1", "ada9", MirrorBalance::Load),
        ];
        let groups = group_layout(&entries);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].mirror.is_none());
    }

    #[test]
    fn test_group_without_root_lists_everything_as_rest() {
        let entries = vec![
            ufs("ada1", SliceRef::All, "/data", 1000),
            ufs("ada1", SliceRef::All, "/backup", 1000),
        ];
        let groups = group_layout(&entries);
        assert!(groups[0].entries.iter().all(|p| p.placement == Placement::Rest));
        assert_eq!(groups[0].entries[0].effective_size_mb, 1000);
        assert_eq!(groups[0].entries[1].effective_size_mb, 0);
    }

    #[test]
    fn test_empty_plan_has_no_groups() {
        assert!(group_layout(&[]).is_empty());
    }
}
