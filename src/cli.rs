use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config_file::DEFAULT_CONFIG_PATH;
use crate::hardware::{Architecture, HostFacts};
use crate::inventory::{DiskEntry, Inventory, Target};
use crate::logic::packages::XORG_CONFIG_PATH;

/// sysplan - disk layout planner and pc-sysinstall config generator
#[derive(Parser)]
#[command(name = "sysplan")]
#[command(about = "Plans a disk layout and generates the pc-sysinstall configuration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the default layout for a drive or slice and print its summary
    Plan {
        /// Hardware probe report (JSON)
        #[arg(short, long)]
        probe: PathBuf,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        host: HostArgs,

        /// Skip partitioning and extract into the file-system mounted at /mnt
        #[arg(long)]
        manual: bool,

        /// Save the plan as JSON for editing or later use
        #[arg(short, long)]
        save: Option<PathBuf>,
    },
    /// Print the summary of a saved plan
    Summary {
        /// Hardware probe report (JSON)
        #[arg(short, long)]
        probe: PathBuf,

        /// Saved plan (JSON)
        #[arg(long)]
        plan: PathBuf,
    },
    /// Generate the pc-sysinstall configuration
    Config {
        /// Hardware probe report (JSON)
        #[arg(short, long)]
        probe: PathBuf,

        /// Wizard settings (JSON)
        #[arg(short, long)]
        settings: PathBuf,

        /// Saved plan (JSON); the default layout is planned when omitted
        #[arg(long)]
        plan: Option<PathBuf>,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        host: HostArgs,

        /// Where to write the config
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        output: PathBuf,

        /// Print the config instead of writing it
        #[arg(long)]
        stdout: bool,

        /// X11 config checked for the nvidia driver
        #[arg(long, default_value = XORG_CONFIG_PATH)]
        xorg_conf: PathBuf,
    },
    /// Validate a settings file and/or a saved plan
    Validate {
        /// Wizard settings (JSON)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Saved plan (JSON)
        #[arg(long)]
        plan: Option<PathBuf>,
    },
}

/// Which disk or slice to lay out
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Whole drive, e.g. ada0 (default: first drive in the probe report)
    #[arg(long, conflicts_with = "slice")]
    pub disk: Option<String>,

    /// Single slice, e.g. ada0s1
    #[arg(long)]
    pub slice: Option<String>,
}

impl TargetArgs {
    /// The requested target, falling back to the first detected drive.
    pub fn resolve(&self, inventory: &Inventory) -> anyhow::Result<Target> {
        if let Some(slice) = &self.slice {
            return Ok(Target::Slice(slice.clone()));
        }
        if let Some(disk) = &self.disk {
            return Ok(Target::Drive(disk.clone()));
        }
        match inventory.drives().next() {
            Some(DiskEntry::Drive { id, .. }) => Ok(Target::Drive(id.clone())),
            _ => anyhow::bail!("No drives in the probe report; pass --disk or --slice"),
        }
    }
}

/// Overrides for the probed host facts
#[derive(Args, Debug, Clone, Default)]
pub struct HostArgs {
    /// Architecture to plan for (default: probed)
    #[arg(long)]
    pub arch: Option<String>,

    /// Physical memory in MB (default: probed)
    #[arg(long)]
    pub memory: Option<u64>,
}

impl HostArgs {
    pub fn apply(&self, facts: &HostFacts) -> HostFacts {
        HostFacts {
            architecture: self
                .arch
                .as_deref()
                .map_or_else(|| facts.architecture.clone(), Architecture::new),
            memory_mb: self.memory.unwrap_or(facts.memory_mb),
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["sysplan"]).is_err());
    }

    #[test]
    fn test_cli_plan_with_slice() {
        let cli = Cli::try_parse_from([
            "sysplan", "plan", "--probe", "/tmp/probe.json", "--slice", "ada0s1", "--memory", "512",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan {
                target, host, manual, ..
            } => {
                assert_eq!(target.slice.as_deref(), Some("ada0s1"));
                assert_eq!(host.memory, Some(512));
                assert!(!manual);
            }
            _ => panic!("Expected Plan command"),
        }
    }

    #[test]
    fn test_cli_disk_and_slice_conflict() {
        let result = Cli::try_parse_from([
            "sysplan", "plan", "--probe", "p.json", "--disk", "ada0", "--slice", "ada0s1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_config_defaults() {
        let cli = Cli::try_parse_from([
            "sysplan", "config", "--probe", "p.json", "--settings", "s.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Config {
                output, stdout, plan, xorg_conf, ..
            } => {
                assert_eq!(output, PathBuf::from("/tmp/sys-install.cfg"));
                assert_eq!(xorg_conf, PathBuf::from("/etc/X11/xorg.conf"));
                assert!(!stdout);
                assert!(plan.is_none());
            }
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_cli_validate_command() {
        let cli = Cli::try_parse_from(["sysplan", "validate", "--plan", "plan.json"]).unwrap();
        match cli.command {
            Commands::Validate { settings, plan } => {
                assert!(settings.is_none());
                assert_eq!(plan, Some(PathBuf::from("plan.json")));
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_target_defaults_to_first_drive() {
        let inventory = Inventory::new(vec![
            DiskEntry::slice("ada0", "ada0s1", 100, "FreeBSD"),
            DiskEntry::drive("ada0", 1000),
            DiskEntry::drive("ada1", 2000),
        ]);
        let target = TargetArgs::default().resolve(&inventory).unwrap();
        assert_eq!(target, Target::Drive("ada0".into()));

        assert!(TargetArgs::default().resolve(&Inventory::default()).is_err());
    }

    #[test]
    fn test_host_overrides() {
        let probed = HostFacts {
            architecture: Architecture::amd64(),
            memory_mb: 4096,
        };
        let host = HostArgs {
            arch: Some("i386".into()),
            memory: None,
        };
        let facts = host.apply(&probed);
        assert_eq!(facts.architecture.as_str(), "i386");
        assert_eq!(facts.memory_mb, 4096);
    }
}
