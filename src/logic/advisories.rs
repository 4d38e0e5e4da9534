//! Non-fatal notices shown to the user while planning.
//!
//! Advisories never stop an install; the caller decides how to display them.

use std::fmt;

use crate::inventory::Inventory;
use crate::layout::LayoutPlan;
use crate::types::OsVariant;

/// Recommended target size for FreeBSD and TrueOS servers
pub const SERVER_RECOMMENDED_MB: u64 = 20_000;
/// Recommended target size for desktop installs
pub const DESKTOP_RECOMMENDED_MB: u64 = 50_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// Planning for an architecture other than amd64
    ThirtyTwoBit { architecture: String },
    /// The first planned target is below the recommended size.
    /// `available_mb` is `None` when the inventory does not know its size.
    LowDiskSpace {
        target: String,
        available_mb: Option<u64>,
        recommended_mb: u64,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThirtyTwoBit { architecture } => write!(
                f,
                "Installing for {}: a 64-bit (amd64) install is recommended for ZFS and better performance",
                architecture
            ),
            Self::LowDiskSpace {
                target,
                recommended_mb,
                ..
            } => write!(
                f,
                "The selected disk / partition {} is less than recommended {}MB. The installation may fail...",
                target, recommended_mb
            ),
        }
    }
}

pub fn recommended_space_mb(variant: OsVariant) -> u64 {
    if variant.is_server() {
        SERVER_RECOMMENDED_MB
    } else {
        DESKTOP_RECOMMENDED_MB
    }
}

/// Warn when the first disk or slice of `plan` is smaller than `variant` needs.
pub fn space_advisory(plan: &LayoutPlan, inventory: &Inventory, variant: OsVariant) -> Option<Advisory> {
    let first = plan.entries().iter().find(|spec| spec.mirror_target().is_none())?;
    let recommended_mb = recommended_space_mb(variant);
    let available_mb = inventory.size_of(&first.disk, &first.slice);

    if available_mb.is_some_and(|size| size >= recommended_mb) {
        return None;
    }

    let advisory = Advisory::LowDiskSpace {
        target: format!("{}({})", first.disk, first.slice),
        available_mb,
        recommended_mb,
    };
    tracing::warn!("{}", advisory);
    Some(advisory)
}
