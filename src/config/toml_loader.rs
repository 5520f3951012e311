//! TOML file loading.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Load and deserialize a TOML file.
///
/// A missing file deserializes as empty TOML, so every table falls back to
/// its defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        tracing::debug!("config file {} not found, using defaults", path.display());
        return parse("").context("Failed to create empty config");
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse(&content).with_context(|| format!("Failed to parse TOML config: {}", path.display()))
}

/// Deserialize TOML text.
///
/// # Errors
///
/// Returns an error if `content` is not valid TOML for `T`.
pub fn parse<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config: Config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "keep_checkpoints = [").unwrap();
        let err = load_config::<Config>(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn loads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "keep_checkpoints = 4\n").unwrap();
        let config: Config = load_config(&path).unwrap();
        assert_eq!(config.keep_checkpoints(), 4);
    }
}
