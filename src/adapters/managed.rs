//! Generated configuration files owned by a program handler.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde_json::Value;

use super::ProgramDiff;
use crate::dotfiles::{backup, fs};
use crate::mode::ExecutionMode;
use crate::paths;
use crate::state::ProgramOptions;

/// First line of every generated file.
pub(super) const HEADER: &str = "# Generated by dotfiles. Local edits are overwritten.";

/// A file a handler renders in full and rewrites when its content drifts.
#[derive(Debug, Clone)]
pub(super) struct ManagedFile {
    path: PathBuf,
}

impl ManagedFile {
    /// Resolve the target from the `path` option, or `default` under `home`.
    ///
    /// The declared path must lie inside `home`; the write location is
    /// rebased according to `mode`.
    pub(super) fn resolve(
        options: &ProgramOptions,
        default: &str,
        home: &Path,
        mode: &ExecutionMode,
    ) -> Result<Self> {
        let raw = match options.get("path") {
            None => default,
            Some(Value::String(s)) if !s.trim().is_empty() => s.as_str(),
            Some(other) => anyhow::bail!("option 'path' must be a non-empty string, got {other}"),
        };
        let declared = paths::expand(raw, home, home);
        if !paths::is_inside(home, &declared) {
            anyhow::bail!(
                "option 'path' must be inside the home directory, got {}",
                declared.display()
            );
        }
        Ok(Self {
            path: mode.rebase(&declared, home),
        })
    }

    /// Location written to.
    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    /// Compare the file on disk with `rendered`.
    pub(super) fn diff(&self, rendered: &str) -> Result<ProgramDiff> {
        match std::fs::read_to_string(&self.path) {
            Ok(current) if current == rendered => Ok(ProgramDiff::no_change(format!(
                "{} is up to date",
                self.path.display()
            ))),
            Ok(_) => Ok(ProgramDiff::configure(format!(
                "{} differs",
                self.path.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProgramDiff::configure(
                format!("{} does not exist", self.path.display()),
            )),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    /// Write `rendered`, backing up a file that was not generated by us.
    pub(super) fn write(&self, rendered: &str) -> Result<()> {
        if let Ok(current) = std::fs::read_to_string(&self.path) {
            if current == rendered {
                return Ok(());
            }
            if !current.starts_with(HEADER) {
                backup::backup_existing_target(&self.path)?;
            }
        } else if fs::is_symlink(&self.path) {
            backup::backup_existing_target(&self.path)?;
        }
        fs::ensure_parent_dir(&self.path)?;
        std::fs::write(&self.path, rendered)
            .with_context(|| format!("writing {}", self.path.display()))?;
        tracing::debug!("wrote {}", self.path.display());
        Ok(())
    }
}

/// Read an optional string option.
pub(super) fn string_option<'a>(options: &'a ProgramOptions, key: &str) -> Result<Option<&'a str>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => anyhow::bail!("option '{key}' must be a string, got {other}"),
    }
}

/// Read an optional table of string values, sorted by key.
pub(super) fn table_option(options: &ProgramOptions, key: &str) -> Result<Vec<(String, String)>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => {
            let mut entries = map
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.clone(), s.clone())),
                    other => anyhow::bail!("option '{key}.{k}' must be a string, got {other}"),
                })
                .collect::<Result<Vec<_>>>()?;
            entries.sort();
            Ok(entries)
        }
        Some(other) => anyhow::bail!("option '{key}' must be a table, got {other}"),
    }
}
