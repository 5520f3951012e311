//! Structural checks run before any mutation.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{Config, LinkDecl, PackageManagerConfig};
use crate::adapters::Registry;
use crate::state::ProgramOptions;

/// A problem found while validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// The configuration section (e.g. "package_managers.homebrew").
    pub section: String,
    /// The specific item that triggered the issue.
    pub item: String,
    /// Human-readable message.
    pub message: String,
}

impl ValidationIssue {
    /// Build an issue.
    #[must_use]
    pub fn new(
        section: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.item.is_empty() {
            write!(f, "{}: {}", self.section, self.message)
        } else {
            write!(f, "{} '{}': {}", self.section, self.item, self.message)
        }
    }
}

/// A validator for one section of the configuration.
pub trait ConfigValidator {
    /// Check the section and return every issue found.
    fn validate(&self, registry: &Registry) -> Vec<ValidationIssue>;

    /// Section name, used in messages.
    fn name(&self) -> &'static str;
}

/// Checks `[package_managers.*]` tables.
#[derive(Debug)]
pub struct PackageValidator<'a> {
    managers: &'a BTreeMap<String, PackageManagerConfig>,
}

impl<'a> PackageValidator<'a> {
    /// Validator over the declared package managers.
    #[must_use]
    pub const fn new(managers: &'a BTreeMap<String, PackageManagerConfig>) -> Self {
        Self { managers }
    }
}

/// Whether `tap` has the `user/repo` shape.
fn is_valid_tap(tap: &str) -> bool {
    let mut parts = tap.split('/');
    let (Some(user), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let ok = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    ok(user) && ok(repo)
}

impl ConfigValidator for PackageValidator<'_> {
    fn validate(&self, registry: &Registry) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (manager, cfg) in self.managers {
            let section = format!("{}.{manager}", self.name());
            let Some(adapter) = registry.package_manager(manager) else {
                issues.push(ValidationIssue::new(
                    self.name(),
                    manager,
                    "unknown package manager",
                ));
                continue;
            };

            let lists = [
                ("install", &cfg.install),
                ("uninstall", &cfg.uninstall),
                ("casks", &cfg.casks),
                ("taps", &cfg.taps),
            ];
            for (field, names) in lists {
                if names.iter().any(|n| n.trim().is_empty()) {
                    issues.push(ValidationIssue::new(
                        &section,
                        field,
                        "contains an empty name",
                    ));
                }
            }

            for tap in &cfg.taps {
                if !tap.trim().is_empty() && !is_valid_tap(tap) {
                    issues.push(ValidationIssue::new(
                        &section,
                        tap,
                        "tap must have the form user/repo",
                    ));
                }
            }

            if (!cfg.taps.is_empty() || !cfg.casks.is_empty()) && adapter.as_tap_support().is_none()
            {
                issues.push(ValidationIssue::new(
                    &section,
                    "",
                    "taps and casks are not supported by this package manager",
                ));
            }

            for name in &cfg.install {
                if cfg.uninstall.contains(name) {
                    issues.push(ValidationIssue::new(
                        &section,
                        name,
                        "listed in both install and uninstall",
                    ));
                }
            }
        }

        issues
    }

    fn name(&self) -> &'static str {
        "package_managers"
    }
}

/// Checks `[programs.*]` tables.
#[derive(Debug)]
pub struct ProgramValidator<'a> {
    programs: &'a BTreeMap<String, ProgramOptions>,
}

impl<'a> ProgramValidator<'a> {
    /// Validator over the declared programs.
    #[must_use]
    pub const fn new(programs: &'a BTreeMap<String, ProgramOptions>) -> Self {
        Self { programs }
    }
}

impl ConfigValidator for ProgramValidator<'_> {
    fn validate(&self, registry: &Registry) -> Vec<ValidationIssue> {
        self.programs
            .keys()
            .filter(|name| registry.program(name).is_none())
            .map(|name| ValidationIssue::new(self.name(), name, "unknown program"))
            .collect()
    }

    fn name(&self) -> &'static str {
        "programs"
    }
}

/// Checks `[[dotfiles.links]]` entries.
#[derive(Debug)]
pub struct LinkValidator<'a> {
    links: &'a [LinkDecl],
}

impl<'a> LinkValidator<'a> {
    /// Validator over the declared links.
    #[must_use]
    pub const fn new(links: &'a [LinkDecl]) -> Self {
        Self { links }
    }
}

impl ConfigValidator for LinkValidator<'_> {
    fn validate(&self, _registry: &Registry) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut seen = BTreeSet::new();

        for (index, link) in self.links.iter().enumerate() {
            if link.name.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    self.name(),
                    format!("#{}", index + 1),
                    "link name is empty",
                ));
                continue;
            }
            if link.to.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    self.name(),
                    &link.name,
                    "link target is empty",
                ));
            }
            if link.from.as_deref().is_some_and(|f| f.trim().is_empty()) {
                issues.push(ValidationIssue::new(
                    self.name(),
                    &link.name,
                    "link source is empty",
                ));
            }
            if !seen.insert(link.name.as_str()) {
                issues.push(ValidationIssue::new(
                    self.name(),
                    &link.name,
                    "duplicate link name",
                ));
            }
        }

        issues
    }

    fn name(&self) -> &'static str {
        "dotfiles.links"
    }
}

/// Run every validator against `config`.
#[must_use]
pub fn validate_all(config: &Config, registry: &Registry) -> Vec<ValidationIssue> {
    let validators: Vec<Box<dyn ConfigValidator + '_>> = vec![
        Box::new(PackageValidator::new(&config.package_managers)),
        Box::new(ProgramValidator::new(&config.programs)),
        Box::new(LinkValidator::new(&config.dotfiles.links)),
    ];

    let mut all_issues = Vec::new();
    for validator in validators {
        let issues = validator.validate(registry);
        if !issues.is_empty() {
            tracing::debug!("{}: {} issue(s)", validator.name(), issues.len());
        }
        all_issues.extend(issues);
    }

    all_issues
}
