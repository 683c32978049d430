// src/config.rs

use crate::constants::DEFAULT_HASH_MB;
use crate::error::ConfigError;
use crate::game::evaluation::EvalWeights;
use crate::game::search::SearchConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const PROFILES_DIR: &str = "profiles";

pub const DEFAULT_MOVE_OVERHEAD_MS: u64 = 30;
pub const DEFAULT_DEPTH: u8 = 8;

/// Everything the engine can be configured with, as stored in a profile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub hash_mb: usize,
    pub move_overhead_ms: u64,
    /// Depth used by `bench` and by `search` when no other limit is given.
    pub default_depth: u8,
    pub search: SearchConfig,
    pub weights: EvalWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_mb: DEFAULT_HASH_MB,
            move_overhead_ms: DEFAULT_MOVE_OVERHEAD_MS,
            default_depth: DEFAULT_DEPTH,
            search: SearchConfig::default(),
            weights: EvalWeights::default(),
        }
    }
}

impl EngineConfig {
    pub fn move_overhead(&self) -> Duration {
        Duration::from_millis(self.move_overhead_ms)
    }
}

fn profile_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", name))
}

pub fn save_profile(dir: &Path, name: &str, config: &EngineConfig) -> Result<(), ConfigError> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(config)?;
    fs::File::create(profile_path(dir, name))?.write_all(json.as_bytes())?;
    info!(name, dir = %dir.display(), "profile saved");
    Ok(())
}

pub fn load_profile(dir: &Path, name: &str) -> Result<EngineConfig, ConfigError> {
    let json = fs::read_to_string(profile_path(dir, name))?;
    Ok(serde_json::from_str(&json)?)
}

pub fn get_profiles(dir: &Path) -> Result<Vec<String>, ConfigError> {
    let mut profiles = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            if let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) {
                profiles.push(name.to_string());
            }
        }
    }
    profiles.sort();
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn profiles_round_trip() {
        let dir = tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.hash_mb = 128;
        config.search.threads = 4;
        config.search.use_null_move_pruning = false;
        config.weights.mobility = 80;

        save_profile(dir.path(), "aggressive", &config).unwrap();
        save_profile(dir.path(), "default", &EngineConfig::default()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(load_profile(dir.path(), "aggressive").unwrap(), config);
        assert_eq!(get_profiles(dir.path()).unwrap(), vec!["aggressive", "default"]);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("partial.json"), r#"{ "hash_mb": 16, "search": { "use_lmr": false } }"#)
            .unwrap();
        let config = load_profile(dir.path(), "partial").unwrap();
        assert_eq!(config.hash_mb, 16);
        assert!(!config.search.use_lmr);
        assert!(config.search.use_killer_moves);
        assert_eq!(config.default_depth, DEFAULT_DEPTH);
    }

    #[test]
    fn errors_are_typed() {
        let dir = tempdir().unwrap();
        assert!(matches!(load_profile(dir.path(), "absent"), Err(ConfigError::Io(_))));
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        assert!(matches!(load_profile(dir.path(), "broken"), Err(ConfigError::Json(_))));
    }
}
