//! Layout Summarizer
//!
//! Renders a plan into the lines shown on the wizard's confirmation page.
//! Walks the same grouped view as the config serializer, so the order the user
//! reviews is the order pc-sysinstall will create partitions in.

use crate::engine::groups::{group_layout, PlacedEntry, Placement, SliceGroup};
use crate::inventory::{Inventory, UNUSED_SPACE_LABEL};
use crate::layout::{LayoutPlan, Mount};

pub const MANUAL_SUMMARY: &str = "Installing to file-system mounted at /mnt";
pub const SUMMARY_HEADER: &str = "The disk will be setup with the following configuration:";

/// Human-readable summary of `plan`, one display line per element.
///
/// A `Manual` plan yields exactly one line.
pub fn summarize(plan: &LayoutPlan, inventory: &Inventory) -> Vec<String> {
    let entries = match plan {
        LayoutPlan::Manual => return vec![MANUAL_SUMMARY.to_string()],
        LayoutPlan::Partitions(entries) => entries,
    };

    let mut lines = vec![SUMMARY_HEADER.to_string()];
    for group in group_layout(entries) {
        summarize_group(&group, inventory, &mut lines);
    }
    lines
}

fn summarize_group(group: &SliceGroup<'_>, inventory: &Inventory, lines: &mut Vec<String>) {
    if let Some(mirror) = group.mirror {
        lines.push(format!("Disk: {} Mirroring: {}", mirror.disk, group.disk));
    }

    let unused = inventory.is_unused_space(group.disk, group.slice);
    for placed in &group.entries {
        lines.push(String::new());
        lines.push(if unused {
            format!("Partition: {}({}) [{}]:", group.disk, group.slice, UNUSED_SPACE_LABEL)
        } else {
            format!("Partition: {}({}):", group.disk, group.slice)
        });
        summarize_entry(placed, lines);
    }
}

fn summarize_entry(placed: &PlacedEntry<'_>, lines: &mut Vec<String>) {
    let spec = placed.spec;
    if let Some(fs) = spec.filesystem_type() {
        lines.push(format!("FileSystem: {}", fs));
    }
    lines.push(format!("Size: {}MB", placed.effective_size_mb));

    match (placed.placement, spec.mount()) {
        (Placement::Swap, _) | (_, None) => {}
        (Placement::Start, Some(mount)) if spec.is_zfs() => {
            lines.push("ZFS Datasets:".to_string());
            match mount {
                Mount::Datasets(datasets) => {
                    lines.extend(datasets.iter().map(|ds| format!("  {}", ds.spaced())));
                }
                other => lines.push(format!("  {}", other)),
            }
        }
        // Only the start pool lists its datasets
        (Placement::Rest, Some(_)) if spec.is_zfs() => {}
        (_, Some(mount)) => lines.push(format!("Mount: {}", mount)),
    }

    if let Some(opts) = &spec.options {
        lines.push(format!("Options: {}", opts));
    }
}
