//! Hardware probe feed
//!
//! Detection itself happens outside this crate. The probe writes a JSON report
//! (architecture, physical memory, disk inventory) which is loaded here and
//! handed to the planner as an immutable snapshot.
//!
//! ```json
//! {
//!   "architecture": "amd64",
//!   "memory_mb": 4096,
//!   "disks": [
//!     { "kind": "DRIVE", "id": "ada0", "size_mb": 100000 },
//!     { "kind": "SLICE", "parent": "ada0", "id": "ada0s1", "size_mb": "40000", "label": "Unused Space" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::inventory::Inventory;

/// Machine architecture as reported by `uname -m`.
///
/// Only `amd64` changes planner behaviour; every other value is carried
/// through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Architecture(String);

impl Architecture {
    pub const AMD64: &'static str = "amd64";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn amd64() -> Self {
        Self(Self::AMD64.to_string())
    }

    /// Returns true for the 64-bit x86 architecture, the only one planned with ZFS.
    pub fn is_amd64(&self) -> bool {
        self.0 == Self::AMD64
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Facts about the host the planner needs besides the disks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFacts {
    pub architecture: Architecture,
    /// Physical memory in MB
    pub memory_mb: u64,
}

impl fmt::Display for HostFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arch: {}, Memory: {}MB", self.architecture, self.memory_mb)
    }
}

/// Complete output of the external hardware probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    #[serde(flatten)]
    pub facts: HostFacts,
    #[serde(default)]
    pub disks: Inventory,
}

impl ProbeReport {
    /// Load a probe report from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read probe report from {:?}", path.as_ref()))?;

        let report: Self =
            serde_json::from_str(&content).context("Failed to parse probe report JSON")?;

        tracing::info!(
            "Probe report loaded: {} ({} inventory entries)",
            report.facts,
            report.disks.len()
        );

        Ok(report)
    }
}
