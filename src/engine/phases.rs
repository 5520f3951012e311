//! The mutating phases of an apply or unlink run.
//!
//! Each phase performs side effects through its collaborator and records
//! the outcome into [`State`].  Errors are returned as-is; the caller
//! decides whether to roll back.
use super::report::{ApplyReport, Phase};
use crate::adapters::{PackageManager, Registry};
use crate::config::{Config, PackageManagerConfig};
use crate::dotfiles::{DotfilesManager, Link};
use crate::error::{EngineError, Result};
use crate::logging::Log;
use crate::state::State;

/// Install, tap and uninstall packages for every configured manager.
pub(super) fn packages(
    registry: &Registry,
    state: &mut State,
    config: &Config,
    report: &mut ApplyReport,
    log: &dyn Log,
) -> Result<()> {
    for (name, wanted) in &config.package_managers {
        let manager = registry
            .package_manager(name)
            .ok_or_else(|| EngineError::Validation(format!("unknown package manager '{name}'")))?;
        sync_manager(name, manager, wanted, state, report, log)
            .map_err(|e| EngineError::adapter(name, &e))?;
    }
    Ok(())
}

fn sync_manager(
    name: &str,
    manager: &dyn PackageManager,
    wanted: &PackageManagerConfig,
    state: &mut State,
    report: &mut ApplyReport,
    log: &dyn Log,
) -> anyhow::Result<()> {
    if !wanted.taps.is_empty() || !wanted.casks.is_empty() {
        let taps = manager
            .as_tap_support()
            .ok_or_else(|| anyhow::anyhow!("taps and casks are not supported"))?;
        for tap in &wanted.taps {
            if !taps.is_tapped(tap)? {
                log.info(&format!("{name}: tap {tap}"));
                taps.tap(tap)?;
                report.record(Phase::Packages, tap, "tapped");
            }
        }
        let mut missing_casks = Vec::new();
        for cask in &wanted.casks {
            if !taps.is_cask_installed(cask)? {
                missing_casks.push(cask.clone());
            }
        }
        if !missing_casks.is_empty() {
            log.info(&format!("{name}: install casks {}", missing_casks.join(" ")));
            taps.install_casks(&missing_casks)?;
            for cask in &missing_casks {
                report.record(Phase::Packages, cask, "cask installed");
            }
        }
        state.add_packages(name, &wanted.casks);
    }

    let mut missing = Vec::new();
    for package in &wanted.install {
        if !manager.is_installed(package)? {
            missing.push(package.clone());
        }
    }
    if !missing.is_empty() {
        log.info(&format!("{name}: install {}", missing.join(" ")));
        manager.install(&missing)?;
        for package in &missing {
            report.record(Phase::Packages, package, "installed");
        }
    }
    state.add_packages(name, &wanted.install);

    let mut present = Vec::new();
    for package in &wanted.uninstall {
        if manager.is_installed(package)? {
            present.push(package.clone());
        }
    }
    if !present.is_empty() {
        log.info(&format!("{name}: uninstall {}", present.join(" ")));
        manager.uninstall(&present)?;
        for package in &present {
            report.record(Phase::Packages, package, "uninstalled");
        }
    }
    state.remove_packages(name, &wanted.uninstall);

    Ok(())
}

/// Run each program handler whose configuration has drifted.
pub(super) fn programs(
    registry: &Registry,
    state: &mut State,
    config: &Config,
    report: &mut ApplyReport,
    log: &dyn Log,
) -> Result<()> {
    for (name, options) in &config.programs {
        let handler = registry
            .program(name)
            .ok_or_else(|| EngineError::Validation(format!("unknown program '{name}'")))?;
        let diff = handler
            .diff_configuration(options)
            .map_err(|e| EngineError::adapter(name, &e))?;
        if diff.is_change() {
            log.info(&format!("{name}: {}", diff.details));
            handler
                .configure(options)
                .map_err(|e| EngineError::adapter(name, &e))?;
            report.record(Phase::Programs, name, diff.details);
            state.record_program(name, options.clone());
        } else if state.programs.get(name.as_str()).is_none_or(|r| &r.configuration != options) {
            state.record_program(name, options.clone());
        }
    }
    Ok(())
}

/// Place every link whose target does not already match.
pub(super) fn dotfiles(
    manager: &DotfilesManager,
    state: &mut State,
    links: &[Link],
    report: &mut ApplyReport,
    log: &dyn Log,
) -> Result<()> {
    for link in links {
        let diff = manager.diff(link)?;
        if !diff.is_change() {
            log.debug(&format!("{}: {}", link.name(), diff.reason));
            continue;
        }
        log.info(&format!(
            "{}: {} {} ({})",
            link.name(),
            diff.action,
            link.to().display(),
            diff.reason
        ));
        let metadata = manager.apply(link)?;
        report.record(Phase::Dotfiles, link.name(), diff.action.to_string());
        state.record_dotfile(metadata);
    }
    Ok(())
}

/// Remove every declared link's placement and forget it.
pub(super) fn unlink(
    manager: &DotfilesManager,
    state: &mut State,
    links: &[Link],
    report: &mut ApplyReport,
    log: &dyn Log,
) -> Result<()> {
    for link in links {
        if manager.remove(link)?.is_some() {
            log.info(&format!("{}: removed {}", link.name(), link.to().display()));
            report.record(Phase::Dotfiles, link.name(), "removed");
        }
        state.remove_dotfile(link.name());
    }
    Ok(())
}
