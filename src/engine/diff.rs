//! Read-only walk computing what `apply` would change.
use super::report::{DiffReport, DotfileChange, PackageAction, PackageChange, ProgramChange};
use crate::adapters::{PackageManager, Registry};
use crate::config::{Config, PackageManagerConfig};
use crate::dotfiles::{DotfilesManager, Link};
use crate::error::{EngineError, Result};

pub(super) fn packages(registry: &Registry, config: &Config, report: &mut DiffReport) -> Result<()> {
    for (name, wanted) in &config.package_managers {
        let manager = registry
            .package_manager(name)
            .ok_or_else(|| EngineError::Validation(format!("unknown package manager '{name}'")))?;
        pending_packages(name, manager, wanted, report).map_err(|e| EngineError::adapter(name, &e))?;
    }
    Ok(())
}

fn pending_packages(
    name: &str,
    manager: &dyn PackageManager,
    wanted: &PackageManagerConfig,
    report: &mut DiffReport,
) -> anyhow::Result<()> {
    let mut push = |package: &str, action| {
        report.packages.push(PackageChange {
            manager: name.to_string(),
            name: package.to_string(),
            action,
        });
    };

    if let Some(taps) = manager.as_tap_support() {
        for tap in &wanted.taps {
            if !taps.is_tapped(tap)? {
                push(tap, PackageAction::Tap);
            }
        }
        for cask in &wanted.casks {
            if !taps.is_cask_installed(cask)? {
                push(cask, PackageAction::InstallCask);
            }
        }
    }
    for package in &wanted.install {
        if !manager.is_installed(package)? {
            push(package, PackageAction::Install);
        }
    }
    for package in &wanted.uninstall {
        if manager.is_installed(package)? {
            push(package, PackageAction::Uninstall);
        }
    }
    Ok(())
}

pub(super) fn programs(registry: &Registry, config: &Config, report: &mut DiffReport) -> Result<()> {
    for (name, options) in &config.programs {
        let handler = registry
            .program(name)
            .ok_or_else(|| EngineError::Validation(format!("unknown program '{name}'")))?;
        let diff = handler
            .diff_configuration(options)
            .map_err(|e| EngineError::adapter(name, &e))?;
        if diff.is_change() {
            report.programs.push(ProgramChange {
                name: name.clone(),
                diff,
            });
        }
    }
    Ok(())
}

pub(super) fn dotfiles(
    manager: &DotfilesManager,
    links: &[Link],
    report: &mut DiffReport,
) -> Result<()> {
    for link in links {
        let diff = manager.diff(link)?;
        if diff.is_change() {
            report.dotfiles.push(DotfileChange {
                name: link.name().to_string(),
                target: manager.effective_target(link),
                diff,
            });
        }
    }
    Ok(())
}
