//! Top-level subcommand orchestration.
pub mod apply;
pub mod checkpoints;
pub mod cleanup;
pub mod completions;
pub mod diff;
pub mod rollback;
pub mod status;
pub mod unlink;
pub mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::adapters::Registry;
use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::dotfiles::DotfilesManager;
use crate::engine::{ApplyReport, Engine};
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::mode::ExecutionMode;
use crate::paths;
use crate::state::StateManager;

/// Directory under a simulation root that receives the simulated state.
pub const SIMULATED_STATE_DIR: &str = ".dotfiles-state";

/// Shared state produced by the common command setup sequence.
///
/// Resolves the home directory, loads the config file and picks the state
/// directory so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Home directory all targets must live under.
    pub home: PathBuf,
    /// Config file that was read (it may not exist).
    pub config_path: PathBuf,
    /// Parsed configuration.
    pub config: Config,
    /// State directory for real runs.
    pub state_dir: PathBuf,
}

impl CommandSetup {
    /// Resolve paths and load the configuration.
    ///
    /// The state directory is taken from `--state-dir`, then the config
    /// file's `state_dir`, then the XDG default.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// config file fails to parse.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let home = match &global.home {
            Some(home) => dunce::canonicalize(home)
                .with_context(|| format!("resolving home directory {}", home.display()))?,
            None => paths::home_dir()?,
        };
        let config_path = global
            .config
            .clone()
            .unwrap_or_else(|| paths::default_config_path(&home));

        log.stage("Loading configuration");
        if !config_path.exists() {
            log.warn(&format!(
                "config file {} not found; using an empty configuration",
                config_path.display()
            ));
        }
        let config = Config::load(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        log.debug(&format!("config: {}", config_path.display()));
        log.debug(&format!(
            "{} package manager(s), {} program(s), {} link(s)",
            config.package_managers.len(),
            config.programs.len(),
            config.dotfiles.links.len()
        ));

        let state_dir = global
            .state_dir
            .clone()
            .or_else(|| config.state_dir(&home))
            .unwrap_or_else(|| paths::default_state_dir(&home));
        log.debug(&format!("state: {}", state_dir.display()));

        Ok(Self {
            home,
            config_path,
            config,
            state_dir,
        })
    }

    /// State directory used under `mode`.
    ///
    /// Simulated runs keep their state inside the simulation root so the
    /// real state is never touched.
    #[must_use]
    pub fn state_dir_for(&self, mode: &ExecutionMode) -> PathBuf {
        match mode {
            ExecutionMode::Real => self.state_dir.clone(),
            ExecutionMode::Simulated { root } => root.join(SIMULATED_STATE_DIR),
        }
    }

    /// Build an engine with the built-in adapters.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be read.
    pub fn engine(&self, mode: ExecutionMode, log: &Arc<Logger>) -> Result<Engine> {
        let state = StateManager::new(self.state_dir_for(&mode))?;
        let registry = Registry::with_defaults(Arc::new(SystemExecutor), &mode, &self.home);
        let dotfiles = DotfilesManager::new(&self.home, mode);
        let log: Arc<Logger> = Arc::clone(log);
        Ok(Engine::new(registry, state, dotfiles, log))
    }
}

/// Execution mode for an optional `--simulate DIR`.
///
/// The directory is created and canonicalised so rebased targets are
/// absolute.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn execution_mode(simulate: Option<&Path>) -> Result<ExecutionMode> {
    let Some(root) = simulate else {
        return Ok(ExecutionMode::Real);
    };
    std::fs::create_dir_all(root)
        .with_context(|| format!("creating simulation root {}", root.display()))?;
    let root = dunce::canonicalize(root)
        .with_context(|| format!("resolving simulation root {}", root.display()))?;
    Ok(ExecutionMode::Simulated { root })
}

/// Print the phase summary and turn a failed run into an error.
///
/// # Errors
///
/// Returns an error if the run failed, naming the phase and whether the
/// recorded state was restored.
pub fn finish(report: &ApplyReport, log: &Logger) -> Result<()> {
    log.summarize();
    if report.success {
        log.info(&format!(
            "{} change(s); checkpoint {}",
            report.changes.len(),
            report.checkpoint
        ));
        return Ok(());
    }

    let phase = report
        .failed_phase
        .map_or("apply", |p| p.as_str());
    let error = report.error.as_deref().unwrap_or("unknown error");
    if let Some(rollback_error) = &report.rollback_error {
        anyhow::bail!(
            "{phase} failed: {error}; rollback to {} also failed: {rollback_error}",
            report.checkpoint
        );
    }
    anyhow::bail!(
        "{phase} failed: {error}; recorded state rolled back to {}",
        report.checkpoint
    )
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::Phase;

    #[test]
    fn no_simulate_is_real() {
        assert_eq!(execution_mode(None).unwrap(), ExecutionMode::Real);
    }

    #[test]
    fn simulate_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sandbox");
        let mode = execution_mode(Some(&root)).unwrap();
        assert!(root.is_dir());
        assert!(mode.is_simulated());
    }

    #[test]
    fn simulated_state_lives_in_root() {
        let setup = CommandSetup {
            home: PathBuf::from("/home/ada"),
            config_path: PathBuf::from("/home/ada/.config/dotfiles/config.toml"),
            config: Config::default(),
            state_dir: PathBuf::from("/home/ada/.local/state/dotfiles"),
        };
        let mode = ExecutionMode::Simulated {
            root: PathBuf::from("/tmp/sandbox"),
        };
        assert_eq!(
            setup.state_dir_for(&mode),
            PathBuf::from("/tmp/sandbox/.dotfiles-state")
        );
        assert_eq!(setup.state_dir_for(&ExecutionMode::Real), setup.state_dir);
    }

    #[test]
    fn init_reads_state_dir_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "state_dir = \"~/custom-state\"\n").unwrap();
        let global = GlobalOpts {
            config: Some(config_path),
            state_dir: None,
            home: Some(dir.path().to_path_buf()),
        };

        let setup = CommandSetup::init(&global, &Logger::new("test")).unwrap();

        assert_eq!(setup.state_dir, setup.home.join("custom-state"));
    }

    #[test]
    fn engine_uses_state_dir_and_shared_logger() {
        let dir = tempfile::tempdir().unwrap();
        let home = dunce::canonicalize(dir.path()).unwrap();
        let setup = CommandSetup {
            config_path: home.join("config.toml"),
            config: Config::default(),
            state_dir: home.join("state"),
            home,
        };
        let log = Arc::new(Logger::new("test"));

        let engine = setup.engine(ExecutionMode::Real, &log).unwrap();

        assert!(engine.list_checkpoints().unwrap().is_empty());
        assert_eq!(engine.dotfiles().home(), setup.home);
        assert_eq!(Arc::strong_count(&log), 2);
    }

    #[test]
    fn failed_report_becomes_error() {
        let report = ApplyReport {
            success: false,
            checkpoint: "20240101_000000".to_string(),
            phase: Phase::RolledBack,
            failed_phase: Some(Phase::Dotfiles),
            changes: Vec::new(),
            error: Some("Configuration error: source missing".to_string()),
            rollback_error: None,
        };
        let err = finish(&report, &Logger::new("test")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "dotfiles failed: Configuration error: source missing; recorded state rolled back to 20240101_000000"
        );
    }
}
