//! sysplan Library
//!
//! Disk layout planning for the PC-BSD / TrueOS installer: plans a layout from
//! the probed inventory, summarizes it for review and serializes it, with the
//! wizard settings, into a pc-sysinstall configuration.

pub mod cli;
pub mod config_file;
pub mod engine;
pub mod error;
pub mod hardware;
pub mod inventory;
pub mod layout;
pub mod logic;
pub mod types;

// Re-export main types for convenience
pub use config_file::{GlobalSettings, NetworkConfig, SystemSettings, UserAccount, WizardSettings};
pub use error::PlanError;
pub use hardware::{Architecture, HostFacts, ProbeReport};
pub use inventory::{DiskEntry, Inventory, Target};
pub use layout::{Dataset, LayoutPlan, Mount, PartitionSpec, Role, SliceRef};
pub use types::{BootManager, Component, Filesystem, MirrorBalance, OsVariant, PartitionScheme};

// Planning and rendering
pub use engine::planner::{plan, Planned};
pub use engine::serializer::{serialize, serialize_disk, ExtraConfig};
pub use engine::summary::summarize;
pub use logic::advisories::Advisory;
