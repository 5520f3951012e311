//! `git` program handler: renders a global git config file.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::managed::{self, HEADER, ManagedFile};
use super::{ProgramDiff, ProgramHandler};
use crate::logging::SIMULATED_TARGET;
use crate::mode::ExecutionMode;
use crate::state::ProgramOptions;

/// Default location; git reads it as the XDG global config.
const DEFAULT_PATH: &str = "~/.config/git/config";

/// Writes `[user]`, `[core]`, `[init]` and `[alias]` sections from options.
///
/// Recognised options: `user_name`, `user_email`, `editor`,
/// `default_branch`, `aliases` (table) and `path`.
#[derive(Debug, Clone)]
pub struct GitHandler {
    home: PathBuf,
    mode: ExecutionMode,
}

impl GitHandler {
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

/// Render the config file body.
fn render(options: &ProgramOptions) -> Result<String> {
    let mut out = format!("{HEADER}\n");

    let name = managed::string_option(options, "user_name")?;
    let email = managed::string_option(options, "user_email")?;
    if name.is_some() || email.is_some() {
        out.push_str("[user]\n");
        if let Some(name) = name {
            writeln!(out, "\tname = {}", quote(name)).unwrap_or(());
        }
        if let Some(email) = email {
            writeln!(out, "\temail = {}", quote(email)).unwrap_or(());
        }
    }
    if let Some(editor) = managed::string_option(options, "editor")? {
        writeln!(out, "[core]\n\teditor = {}", quote(editor)).unwrap_or(());
    }
    if let Some(branch) = managed::string_option(options, "default_branch")? {
        writeln!(out, "[init]\n\tdefaultBranch = {}", quote(branch)).unwrap_or(());
    }
    let aliases = managed::table_option(options, "aliases")?;
    if !aliases.is_empty() {
        out.push_str("[alias]\n");
        for (alias, command) in &aliases {
            anyhow::ensure!(
                !alias.is_empty() && alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
                "invalid git alias name '{alias}'"
            );
            writeln!(out, "\t{alias} = {}", quote(command)).unwrap_or(());
        }
    }
    Ok(out)
}

/// Quote a git config value, escaping `"` and `\`.
fn quote(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{escaped}\"")
}

impl ProgramHandler for GitHandler {
    fn name(&self) -> &'static str {
        "git"
    }

    fn configure(&self, options: &ProgramOptions) -> Result<()> {
        let file = self.file(options)?;
        let rendered = render(options)?;
        if self.mode.is_simulated() {
            tracing::info!(target: SIMULATED_TARGET, "write git config {}", file.path().display());
        }
        file.write(&rendered)
    }

    fn diff_configuration(&self, options: &ProgramOptions) -> Result<ProgramDiff> {
        self.file(options)?.diff(&render(options)?)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: serde_json::Value) -> ProgramOptions {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn render_full_config() {
        let rendered = render(&options(json!({
            "user_name": "Ada Lovelace",
            "user_email": "ada@example.com",
            "editor": "nvim",
            "default_branch": "main",
            "aliases": { "st": "status -sb", "lg": "log --oneline" },
        })))
        .unwrap();

        assert_eq!(
            rendered,
            "# Generated by dotfiles. Local edits are overwritten.\n\
             [user]\n\tname = \"Ada Lovelace\"\n\temail = \"ada@example.com\"\n\
             [core]\n\teditor = \"nvim\"\n\
             [init]\n\tdefaultBranch = \"main\"\n\
             [alias]\n\tlg = \"log --oneline\"\n\tst = \"status -sb\"\n"
        );
    }

    #[test]
    fn quote_escapes_specials() {
        assert_eq!(quote(r#"say "hi" \o/"#), r#""say \"hi\" \\o/""#);
    }

    #[test]
    fn invalid_alias_is_rejected() {
        assert!(render(&options(json!({"aliases": {"bad name": "x"}}))).is_err());
    }

    #[test]
    fn non_string_email_is_rejected() {
        assert!(render(&options(json!({"user_email": true}))).is_err());
    }

    #[test]
    fn configure_then_diff_is_clean() {
        let home = tempfile::tempdir().unwrap();
        let handler = GitHandler::new(home.path(), ExecutionMode::Real);
        let opts = options(json!({"user_name": "Ada"}));

        assert!(handler.diff_configuration(&opts).unwrap().is_change());
        handler.configure(&opts).unwrap();
        assert!(!handler.diff_configuration(&opts).unwrap().is_change());
        assert!(home.path().join(".config/git/config").is_file());
    }

    #[test]
    fn simulated_configure_writes_under_root() {
        let home = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let handler = GitHandler::new(
            home.path(),
            ExecutionMode::Simulated {
                root: scratch.path().to_path_buf(),
            },
        );

        handler
            .configure(&options(json!({"user_name": "Ada"})))
            .unwrap();

        assert!(!home.path().join(".config/git/config").exists());
        assert!(scratch.path().join(".config/git/config").is_file());
    }
}
