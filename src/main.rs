//! sysplan - Main entry point
//!
//! Loads the probe report, settings and plans from JSON, then plans,
//! summarizes or serializes through the library.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use sysplan::cli::{Cli, Commands, HostArgs, TargetArgs};
use sysplan::config_file::{write_config, WizardSettings};
use sysplan::engine::planner::{self, Planned};
use sysplan::engine::serializer::{self, ExtraConfig};
use sysplan::engine::summary::summarize;
use sysplan::hardware::ProbeReport;
use sysplan::layout::LayoutPlan;
use sysplan::logic::advisories::{space_advisory, Advisory};
use sysplan::logic::packages::{detect_nvidia, resolve_install_packages};

/// Initialize logging to stderr; `RUST_LOG` overrides the default `info` level
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logger();
    debug!("sysplan starting up");

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Plan {
            probe,
            target,
            host,
            manual,
            save,
        } => run_plan(&probe, &target, &host, manual, save.as_deref()),
        Commands::Summary { probe, plan } => {
            let report = ProbeReport::load_from_file(&probe)?;
            let plan = load_plan(&plan)?;
            print_lines(&summarize(&plan, &report.disks));
            Ok(())
        }
        Commands::Config {
            probe,
            settings,
            plan,
            target,
            host,
            output,
            stdout,
            xorg_conf,
        } => {
            let report = ProbeReport::load_from_file(&probe)?;
            let generated =
                build_config(&report, &settings, plan.as_deref(), &target, &host, &xorg_conf)?;
            print_advisories(&generated.advisories);
            let text = generated.text;

            if stdout {
                print!("{}", text);
            } else {
                write_config(&output, &text)?;
                println!("✓ Configuration written to {:?}", output);
            }
            Ok(())
        }
        Commands::Validate { settings, plan } => run_validate(settings.as_deref(), plan.as_deref()),
    }
}

fn run_plan(
    probe: &Path,
    target: &TargetArgs,
    host: &HostArgs,
    manual: bool,
    save: Option<&Path>,
) -> Result<()> {
    let report = ProbeReport::load_from_file(probe)?;

    let planned = if manual {
        info!("Manual install requested, skipping partitioning");
        Planned {
            plan: LayoutPlan::Manual,
            advisories: Vec::new(),
        }
    } else {
        let target = target.resolve(&report.disks)?;
        let facts = host.apply(&report.facts);
        planner::plan(&report.disks, &target, &facts)
            .with_context(|| format!("Cannot plan a layout for {}", target))?
    };

    print_advisories(&planned.advisories);
    print_lines(&summarize(&planned.plan, &report.disks));

    if let Some(path) = save {
        planned.plan.save_to_file(path)?;
        info!("Plan saved to {:?}", path);
    }

    Ok(())
}

fn run_validate(settings: Option<&Path>, plan: Option<&Path>) -> Result<()> {
    if settings.is_none() && plan.is_none() {
        anyhow::bail!("Nothing to validate: pass --settings and/or --plan");
    }

    let mut failed = false;

    if let Some(path) = settings {
        info!("Validating settings file: {:?}", path);
        match WizardSettings::load_from_file(path).map_err(|e| format!("{:#}", e)).and_then(|s| {
            s.validate().map_err(|e| e.to_string())
        }) {
            Ok(()) => println!("✓ Settings file is valid: {:?}", path),
            Err(e) => {
                error!("Settings validation failed: {}", e);
                eprintln!("✗ Settings validation failed: {}", e);
                failed = true;
            }
        }
    }

    if let Some(path) = plan {
        info!("Validating plan file: {:?}", path);
        match load_plan(path).and_then(|p| p.validate().map_err(anyhow::Error::from)) {
            Ok(()) => println!("✓ Plan file is valid: {:?}", path),
            Err(e) => {
                error!("Plan validation failed: {:#}", e);
                eprintln!("✗ Plan validation failed: {:#}", e);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Config text plus every advisory raised while producing it
struct GeneratedConfig {
    text: String,
    advisories: Vec<Advisory>,
}

fn build_config(
    report: &ProbeReport,
    settings_path: &Path,
    plan_path: Option<&Path>,
    target: &TargetArgs,
    host: &HostArgs,
    xorg_conf: &Path,
) -> Result<GeneratedConfig> {
    let facts = host.apply(&report.facts);

    let mut settings = WizardSettings::load_for_host(settings_path, facts.memory_mb)?;
    settings.validate()?;
    settings.global.architecture = facts.architecture.clone();

    let mut advisories = Vec::new();
    let plan = match plan_path {
        Some(path) => load_plan(path)?,
        None => {
            let target = target.resolve(&report.disks)?;
            let planned = planner::plan(&report.disks, &target, &facts)?;
            advisories.extend(planned.advisories);
            planned.plan
        }
    };

    advisories.extend(space_advisory(&plan, &report.disks, settings.global.variant));

    let install_packages = if settings.packages.on_media {
        let selected = settings.packages.selected_or_default(
            settings.global.variant,
            settings.global.is_localized(),
            detect_nvidia(xorg_conf),
        );
        resolve_install_packages(settings.global.variant, &settings.packages.catalog, &selected)
    } else {
        None
    };

    let lines = serializer::serialize(
        &plan,
        &settings.global,
        &ExtraConfig { install_packages },
        &report.disks,
    );

    Ok(GeneratedConfig {
        text: serializer::to_config_text(&lines),
        advisories,
    })
}

fn load_plan(path: &Path) -> Result<LayoutPlan> {
    let plan = LayoutPlan::load_from_file(path)?;
    if let Err(e) = plan.validate() {
        warn!("Plan {:?} does not validate: {}", path, e);
    }
    Ok(plan)
}

fn print_advisories(advisories: &[Advisory]) {
    for advisory in advisories {
        eprintln!("⚠ {}", advisory);
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}
