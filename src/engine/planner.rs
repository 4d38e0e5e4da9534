//! Automatic Layout Planner
//!
//! Suggests a layout for a whole drive or one slice:
//!
//! | Architecture | Layout |
//! |--------------|--------|
//! | amd64        | One ZFS pool over the whole target with the standard dataset tree |
//! | anything else | UFS+SUJ: `/` 2000MB, swap, `/var` 2048MB (roomy targets only), `/usr` gets the rest |
//!
//! Sizing rules for the UFS layout, applied in this order:
//!
//! 1. 10MB is held back from the target for rounding
//! 2. `/` takes 2000MB
//! 3. swap is 2x physical memory, but 256MB if that would leave less than 3000MB
//! 4. swap is capped at 2000MB
//! 5. `/var` (2048MB) only exists if more than 3000MB remain after swap
//! 6. `/usr` gets the literal remainder
//!
//! A host reporting no memory gets no swap entry at all, since a zero size
//! means "rest of the slice" downstream.
//!
//! Step 3 compares against the uncapped 2x memory value. That ordering is kept
//! as is.
//!
//! Pure logic: the planner never touches disks or files.

use crate::error::Result;
use crate::hardware::HostFacts;
use crate::inventory::{Inventory, Target};
use crate::layout::{Dataset, LayoutPlan, Mount, PartitionSpec, SliceRef};
use crate::logic::advisories::Advisory;
use crate::types::Filesystem;

/// Held back from every target to absorb rounding differences
pub const ROUNDING_BUFFER_MB: i64 = 10;
pub const UFS_ROOT_MB: i64 = 2000;
pub const SWAP_FALLBACK_MB: i64 = 256;
pub const SWAP_CAP_MB: i64 = 2000;
pub const VAR_MB: i64 = 2048;
/// Space that must remain for swap to keep its full size and for `/var` to exist
pub const ROOMY_THRESHOLD_MB: i64 = 3000;

/// Standard dataset tree for the ZFS pool, root first.
pub const ZFS_DATASETS: &[(&str, Option<&str>)] = &[
    ("/", None),
    ("/tmp", Some("compress=lzjb")),
    ("/usr", Some("canmount=off")),
    ("/usr/home", None),
    ("/usr/jails", None),
    ("/usr/obj", Some("compress=lzjb")),
    ("/usr/pbi", None),
    ("/usr/ports", Some("compress=gzip")),
    ("/usr/ports/distfiles", Some("compress=off")),
    ("/usr/src", Some("compress=gzip")),
    ("/var", Some("canmount=off")),
    ("/var/audit", Some("compress=lzjb")),
    ("/var/log", Some("compress=gzip")),
    ("/var/tmp", Some("compress=lzjb")),
];

/// A freshly computed plan plus anything the user should be told about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Planned {
    pub plan: LayoutPlan,
    pub advisories: Vec<Advisory>,
}

/// Compute the default layout for `target`.
///
/// # Errors
///
/// Only `PlanError::UnresolvedTarget`, when the target is not in the
/// inventory or its size is not a non-negative integer. No partial plan is
/// ever returned.
pub fn plan(inventory: &Inventory, target: &Target, facts: &HostFacts) -> Result<Planned> {
    let resolved = inventory.resolve(target)?;
    let usable = i64::try_from(resolved.size_mb).unwrap_or(i64::MAX) - ROUNDING_BUFFER_MB;

    tracing::info!(
        "Generating disk layout for {} ({}MB usable, {})",
        target,
        usable,
        facts
    );

    if facts.architecture.is_amd64() {
        let pool = zfs_pool(&resolved.disk, resolved.slice, clamp_mb(usable));
        tracing::debug!("ZFS pool: {} {}MB", pool.disk, pool.size_mb);
        return Ok(Planned {
            plan: LayoutPlan::Partitions(vec![pool]),
            advisories: Vec::new(),
        });
    }

    let advisory = Advisory::ThirtyTwoBit {
        architecture: facts.architecture.to_string(),
    };
    tracing::warn!("{}", advisory);

    let entries = ufs_layout(&resolved.disk, &resolved.slice, usable, facts.memory_mb);
    for spec in &entries {
        tracing::debug!("UFS entry: {:?} {}MB", spec.mount(), spec.size_mb);
    }

    Ok(Planned {
        plan: LayoutPlan::Partitions(entries),
        advisories: vec![advisory],
    })
}

/// The single ZFS pool entry covering `size_mb` of the target.
pub fn zfs_pool(disk: &str, slice: SliceRef, size_mb: u64) -> PartitionSpec {
    let datasets = ZFS_DATASETS
        .iter()
        .map(|(path, options)| match options {
            Some(opts) => Dataset::with_options(*path, *opts),
            None => Dataset::new(*path),
        })
        .collect();

    PartitionSpec::filesystem(disk, slice, Filesystem::Zfs, Mount::Datasets(datasets), size_mb)
}

/// Swap size for a target with `remaining_mb` left after `/`.
pub fn swap_size_mb(remaining_mb: i64, memory_mb: u64) -> i64 {
    let mut swap = i64::try_from(memory_mb)
        .unwrap_or(i64::MAX / 2)
        .saturating_mul(2);
    if remaining_mb.saturating_sub(swap) < ROOMY_THRESHOLD_MB {
        swap = SWAP_FALLBACK_MB;
    }
    swap.min(SWAP_CAP_MB)
}

fn ufs_layout(disk: &str, slice: &SliceRef, usable: i64, memory_mb: u64) -> Vec<PartitionSpec> {
    let fs = Filesystem::UfsJournaledSoftUpdates;
    let path = |mount: &str, size: i64| {
        PartitionSpec::filesystem(
            disk,
            slice.clone(),
            fs,
            Mount::Path(mount.to_string()),
            clamp_mb(size),
        )
    };

    let mut remaining = usable;
    let mut entries = vec![path("/", UFS_ROOT_MB)];
    remaining -= UFS_ROOT_MB;

    let swap = swap_size_mb(remaining, memory_mb);
    if swap > 0 {
        entries.push(PartitionSpec::swap(disk, slice.clone(), clamp_mb(swap)));
        remaining -= swap;
    } else {
        tracing::warn!("No memory reported, planning without swap");
    }

    if remaining > ROOMY_THRESHOLD_MB {
        entries.push(path("/var", VAR_MB));
        remaining -= VAR_MB;
    } else {
        tracing::info!("Only {}MB left after swap, keeping /var on /", remaining);
    }

    entries.push(path("/usr", remaining));
    entries
}

/// Sizes never go below zero; a target too small for the fixed partitions
/// leaves `/usr` empty.
fn clamp_mb(size: i64) -> u64 {
    u64::try_from(size).unwrap_or(0)
}
