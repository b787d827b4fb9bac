use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use splice_core::{EngineConfig, Medium};

/// Settings read from the optional `--config` YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// SQLite file used by `splice db` when `--database` is absent.
    pub database: Option<PathBuf>,
    /// Medium for commands that do not name one.
    pub medium: Medium,
    /// Tracing filter used when neither `--log-level` nor `RUST_LOG` is set.
    pub log_filter: Option<String>,
    /// Block circuit creation beyond cable capacity.
    pub enforce_capacity: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database: None,
            medium: Medium::Fiber,
            log_filter: None,
            enforce_capacity: true,
        }
    }
}

impl CliConfig {
    /// Loads the file at `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .map_err(|err| format!("failed to read config {}: {err}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Engine policy, with `medium` overriding the configured default.
    pub fn engine_config(&self, medium: Option<Medium>) -> EngineConfig {
        EngineConfig {
            default_medium: medium.unwrap_or(self.medium),
            enforce_capacity_on_create: self.enforce_capacity,
        }
    }

    /// Database path, preferring the command-line value.
    pub fn database_path(&self, flag: Option<&Path>) -> Result<PathBuf, Box<dyn Error>> {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.clone())
            .ok_or_else(|| "no database given; pass --database or set `database` in the config".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("splice.yaml");
        fs::write(&path, "medium: copper\nenforce_capacity: false\n").expect("write config");
        let config = CliConfig::load(Some(&path)).expect("load config");
        assert_eq!(config.medium, Medium::Copper);
        assert!(!config.enforce_capacity);
        assert!(config.database.is_none());

        let engine = config.engine_config(None);
        assert_eq!(engine.default_medium, Medium::Copper);
        assert!(!engine.enforce_capacity_on_create);
        assert_eq!(config.engine_config(Some(Medium::Fiber)).default_medium, Medium::Fiber);
    }

    #[test]
    fn database_flag_wins_over_file() {
        let config = CliConfig {
            database: Some(PathBuf::from("from-file.db")),
            ..CliConfig::default()
        };
        let flag = PathBuf::from("flag.db");
        assert_eq!(config.database_path(Some(&flag)).expect("path"), flag);
        assert_eq!(
            config.database_path(None).expect("path"),
            PathBuf::from("from-file.db")
        );
        assert!(CliConfig::default().database_path(None).is_err());
    }

    #[test]
    fn unknown_medium_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "medium: glass\n").expect("write config");
        assert!(CliConfig::load(Some(&path)).is_err());
    }
}
