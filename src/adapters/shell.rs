//! `shell` program handler: renders a POSIX env/alias file for sourcing.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::managed::{self, HEADER, ManagedFile};
use super::{ProgramDiff, ProgramHandler};
use crate::logging::SIMULATED_TARGET;
use crate::mode::ExecutionMode;
use crate::state::ProgramOptions;

const DEFAULT_PATH: &str = "~/.config/dotfiles/shell/env.sh";

/// Writes `export` and `alias` lines from the `env` and `aliases` tables.
#[derive(Debug, Clone)]
pub struct ShellHandler {
    home: PathBuf,
    mode: ExecutionMode,
}

impl ShellHandler {
    /// Handler writing under `home` according to `mode`.
    #[must_use]
    pub fn new(home: &Path, mode: ExecutionMode) -> Self {
        Self {
            home: home.to_path_buf(),
            mode,
        }
    }

    fn file(&self, options: &ProgramOptions) -> Result<ManagedFile> {
        ManagedFile::resolve(options, DEFAULT_PATH, &self.home, &self.mode)
    }
}

fn render(options: &ProgramOptions) -> Result<String> {
    let mut out = format!("{HEADER}\n");
    for (name, value) in managed::table_option(options, "env")? {
        anyhow::ensure!(is_identifier(&name), "invalid environment variable name '{name}'");
        writeln!(out, "export {name}={}", single_quote(&value)).unwrap_or(());
    }
    for (name, command) in managed::table_option(options, "aliases")? {
        anyhow::ensure!(
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')),
            "invalid alias name '{name}'"
        );
        writeln!(out, "alias {name}={}", single_quote(&command)).unwrap_or(());
    }
    Ok(out)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// POSIX single-quoting: `'` becomes `'\''`.
fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

impl ProgramHandler for ShellHandler {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn configure(&self, options: &ProgramOptions) -> Result<()> {
        let file = self.file(options)?;
        let rendered = render(options)?;
        if self.mode.is_simulated() {
            tracing::info!(target: SIMULATED_TARGET, "write shell env {}", file.path().display());
        }
        file.write(&rendered)
    }

    fn diff_configuration(&self, options: &ProgramOptions) -> Result<ProgramDiff> {
        self.file(options)?.diff(&render(options)?)
    }
}
