use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Resolve the SQLite store path: explicit flag, then `$TIMEWARP_PATH`, then
/// `~/.timewarp/store.db`.
pub fn resolve_data_path(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand_tilde(path));
    }
    if let Ok(env_path) = std::env::var("TIMEWARP_PATH") {
        return Ok(expand_tilde(&env_path));
    }
    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".timewarp").join("store.db"));
    }
    Err(Error::Config(
        "could not determine a store path: no --data-path, $TIMEWARP_PATH or $HOME".to_string(),
    ))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Layered on top of CLI flags and environment variables: `timewarp.toml`
/// sets the replay/sampling defaults an operator wants without repeating
/// flags on every invocation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default_format: Option<String>,
    #[serde(default)]
    pub recorder: RecorderSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecorderSection {
    #[serde(default)]
    pub sample_rate: Option<f64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let dir = resolve_data_path(None)?
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(dir.join("timewarp.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_nonexistent_returns_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("timewarp.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(config.default_format.is_none());
    }

    #[test]
    fn load_parses_an_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("timewarp.toml");
        std::fs::write(&path, "default_format = \"json\"\n[recorder]\nsample_rate = 0.5\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_format.as_deref(), Some("json"));
        assert_eq!(config.recorder.sample_rate, Some(0.5));
    }

    #[test]
    fn resolve_data_path_expands_tilde() {
        std::env::remove_var("TIMEWARP_PATH");
        let resolved = resolve_data_path(Some("~/custom/store.db")).unwrap();
        assert!(!resolved.starts_with("~"));
    }
}
