#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for checkpoints and state persistence.
//!
//! Covers the checkpoint round-trip, retention, manual rollback through the
//! engine, and recovery from a corrupt `state.json`.

mod common;

use std::fs;

use chrono::{Duration, TimeZone as _, Utc};
use common::Sandbox;
use dotfiles_engine::adapters::Registry;
use dotfiles_engine::error::EngineError;
use dotfiles_engine::state::checkpoint::new_checkpoint_id;
use dotfiles_engine::state::{ProgramOptions, State, StateManager};

#[test]
fn checkpoint_mutate_rollback_restores_state() {
    let sandbox = Sandbox::new();
    let mut manager = StateManager::new(&sandbox.state).unwrap();
    manager
        .state_mut()
        .add_packages("homebrew", &["git".to_string()]);
    manager.save_state().unwrap();
    let snapshot = manager.state().clone();

    let id = manager.create_checkpoint().unwrap();
    manager
        .state_mut()
        .add_packages("homebrew", &["ripgrep".to_string()]);
    manager
        .state_mut()
        .record_program("git", ProgramOptions::new());
    manager.rollback_to(&id).unwrap();

    assert_eq!(manager.state(), &snapshot);
    let reloaded = StateManager::new(&sandbox.state).unwrap();
    assert_eq!(reloaded.state(), &snapshot);
}

#[test]
fn retention_keeps_newest() {
    let sandbox = Sandbox::new();
    let manager = StateManager::new(&sandbox.state).unwrap();
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let ids: Vec<String> = (0..15)
        .map(|i| new_checkpoint_id(start + Duration::seconds(i)))
        .collect();
    for id in &ids {
        manager
            .checkpoints()
            .write_with_id(id, manager.state())
            .unwrap();
    }

    let deleted = manager.cleanup_checkpoints(10).unwrap();

    let mut expected: Vec<String> = ids[5..].to_vec();
    expected.reverse();
    assert_eq!(manager.list_checkpoints().unwrap(), expected);
    assert_eq!(deleted.len(), 5);
    for id in &ids[..5] {
        assert!(!manager.checkpoints().exists(id), "{id} should be deleted");
    }
}

#[test]
fn checkpoints_list_newest_first() {
    let sandbox = Sandbox::new();
    let manager = StateManager::new(&sandbox.state).unwrap();
    for id in ["20240101_000000", "20240301_000000", "20240201_000000"] {
        manager
            .checkpoints()
            .write_with_id(id, manager.state())
            .unwrap();
    }

    assert_eq!(
        manager.list_checkpoints().unwrap(),
        ["20240301_000000", "20240201_000000", "20240101_000000"]
    );
}

#[test]
fn checkpoint_file_matches_state_schema() {
    let sandbox = Sandbox::new();
    let manager = StateManager::new(&sandbox.state).unwrap();
    let id = manager.create_checkpoint().unwrap();

    let raw = fs::read_to_string(sandbox.state.join("checkpoints").join(format!("{id}.json")))
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

    for key in [
        "version",
        "created_at",
        "last_updated",
        "package_managers",
        "programs",
        "dotfiles",
    ] {
        assert!(value.get(key).is_some(), "missing {key} in {raw}");
    }
    assert_eq!(value["version"], "1.0");
}

#[test]
fn corrupt_state_file_falls_back_to_default() {
    let sandbox = Sandbox::new();
    fs::create_dir_all(&sandbox.state).unwrap();
    fs::write(sandbox.state.join("state.json"), "{ not json").unwrap();

    let manager = StateManager::new(&sandbox.state).unwrap();

    assert_eq!(manager.state().version, "1.0");
    assert!(manager.state().package_managers.is_empty());
    // Left in place until the next save.
    assert_eq!(
        fs::read_to_string(sandbox.state.join("state.json")).unwrap(),
        "{ not json"
    );
}

#[test]
fn engine_rollback_to_earlier_checkpoint() {
    let sandbox = Sandbox::new();
    sandbox.write_source("zshrc", "x\n");
    let mut engine = sandbox.engine(Registry::new());
    let config = sandbox.config(
        "[dotfiles]\nsource_dir = \"{src}\"\n\n[[dotfiles.links]]\nname = \"zshrc\"\nto = \"~/.zshrc\"\n",
    );

    let report = engine.apply(&config).unwrap();
    assert_eq!(engine.state().dotfiles.len(), 1);

    engine.rollback(&report.checkpoint).unwrap();

    assert!(engine.state().dotfiles.is_empty());
    assert!(fs::symlink_metadata(sandbox.home.join(".zshrc")).is_ok());
    let reopened = StateManager::new(&sandbox.state).unwrap();
    assert!(reopened.state().dotfiles.is_empty());
}

#[test]
fn rollback_to_unknown_id_is_not_found() {
    let sandbox = Sandbox::new();
    let mut engine = sandbox.engine(Registry::new());

    let err = engine.rollback("19990101_000000").unwrap_err();

    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(engine.state().version, State::default().version);
}

#[test]
fn apply_prunes_to_configured_retention() {
    let sandbox = Sandbox::new();
    let manager = StateManager::new(&sandbox.state).unwrap();
    for i in 0..5 {
        manager
            .checkpoints()
            .write_with_id(&format!("2000010{i}_000000"), manager.state())
            .unwrap();
    }
    let mut engine = sandbox.engine(Registry::new());

    let report = engine
        .apply(&sandbox.config("keep_checkpoints = 2\n"))
        .unwrap();

    let remaining = engine.list_checkpoints().unwrap();
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0], report.checkpoint);
}

/// Two managers on one directory do not coordinate: each saves its own
/// in-memory copy, so the last save wins and the other's change is lost.
#[test]
fn concurrent_managers_last_save_wins() {
    let sandbox = Sandbox::new();
    let mut first = StateManager::new(&sandbox.state).unwrap();
    let mut second = StateManager::new(&sandbox.state).unwrap();

    first
        .state_mut()
        .add_packages("homebrew", &["ripgrep".to_string()]);
    first.save_state().unwrap();
    second
        .state_mut()
        .add_packages("homebrew", &["jq".to_string()]);
    second.save_state().unwrap();

    let reopened = StateManager::new(&sandbox.state).unwrap();
    assert_eq!(reopened.state().package_managers["homebrew"], ["jq"]);
}
