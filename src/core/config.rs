/*
 * Persists the user-level application state: the preset list with its active
 * name, and the recent-project ledger. Everything lives in one JSON document,
 * `app_state.json`, inside the directory chosen by `path_utils`.
 *
 * `ConfigManagerOperations` is the load/save boundary; the preset store and
 * the ledger stay free of I/O and are rebuilt from `PersistedState` on load.
 */
use crate::core::path_utils;
use crate::core::presets::{Preset, PresetStore};
use crate::core::recent_projects::{RecentEntry, RecentLedger};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoConfigDirectory,
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::Serde(e) => write!(f, "Configuration file is malformed: {e}"),
            ConfigError::NoConfigDirectory => {
                write!(f, "Could not determine a directory for the configuration")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
            ConfigError::NoConfigDirectory => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/*
 * The on-disk document. Fields default when absent so older or hand-edited
 * files still load; `into_parts` repairs whatever the raw data gets wrong.
 */
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub active_preset: Option<String>,
    #[serde(default)]
    pub presets: Vec<Preset>,
    #[serde(default)]
    pub recent_projects: Vec<RecentEntry>,
}

impl PersistedState {
    pub fn from_parts(presets: &PresetStore, recent: &RecentLedger) -> Self {
        PersistedState {
            active_preset: Some(presets.active_name().to_string()),
            presets: presets.presets().cloned().collect(),
            recent_projects: recent.entries().to_vec(),
        }
    }

    pub fn into_parts(self) -> (PresetStore, RecentLedger) {
        (
            PresetStore::from_parts(self.presets, self.active_preset),
            RecentLedger::from_entries(self.recent_projects),
        )
    }
}

pub trait ConfigManagerOperations: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load_app_state(&self, app_name: &str) -> Result<Option<PersistedState>>;
    fn save_app_state(&self, app_name: &str, state: &PersistedState) -> Result<()>;
}

pub struct CoreConfigManager {
    config_dir_override: Option<PathBuf>,
}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {
            config_dir_override: None,
        }
    }

    /// Stores state under `dir` instead of the per-user config directory.
    pub fn with_config_dir(dir: impl Into<PathBuf>) -> Self {
        CoreConfigManager {
            config_dir_override: Some(dir.into()),
        }
    }

    fn state_file_path(&self, app_name: &str) -> Result<PathBuf> {
        let dir = path_utils::resolve_config_dir(app_name, self.config_dir_override.as_deref())
            .ok_or(ConfigError::NoConfigDirectory)?;
        Ok(path_utils::app_state_file(&dir))
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn read_state_file(file_path: &Path) -> Result<Option<PersistedState>> {
    let file = match File::open(file_path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("CoreConfigManager: State file {file_path:?} does not exist.");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let state: PersistedState = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(state))
}

impl ConfigManagerOperations for CoreConfigManager {
    fn load_app_state(&self, app_name: &str) -> Result<Option<PersistedState>> {
        log::trace!("CoreConfigManager: Loading app state for '{app_name}'");
        let file_path = self.state_file_path(app_name)?;
        let state = read_state_file(&file_path)?;
        if let Some(s) = &state {
            log::debug!(
                "CoreConfigManager: Loaded {} presets and {} recent projects from {file_path:?}.",
                s.presets.len(),
                s.recent_projects.len()
            );
        }
        Ok(state)
    }

    fn save_app_state(&self, app_name: &str, state: &PersistedState) -> Result<()> {
        log::trace!("CoreConfigManager: Saving app state for '{app_name}'");
        let file_path = self.state_file_path(app_name)?;
        let file = File::create(&file_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, state)?;
        writer.flush()?;
        log::debug!("CoreConfigManager: Saved app state to {file_path:?}.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archiver::DEFAULT_TEMPLATE;
    use std::fs;
    use tempfile::tempdir;
    use time::macros::datetime;

    const APP_NAME: &str = "NafudaConfigTest";

    fn sample_state() -> PersistedState {
        PersistedState {
            active_preset: Some("Markdown".to_string()),
            presets: vec![
                Preset::new("Default", DEFAULT_TEMPLATE),
                Preset::new("Markdown", "## {name}\n{code}"),
            ],
            recent_projects: vec![RecentEntry {
                path: PathBuf::from("/work/proj"),
                opened_at: datetime!(2026-10-18 09:15 UTC),
            }],
        }
    }

    #[test]
    fn test_load_without_saved_state_returns_none() {
        // Arrange
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path());

        // Act & Assert
        match manager.load_app_state(APP_NAME) {
            Ok(None) => {}
            other => panic!("Expected Ok(None) for a fresh directory, got {other:?}"),
        }
    }

    #[test]
    fn test_save_then_load_returns_same_state() {
        // Arrange
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path().join("nested"));
        let state = sample_state();

        // Act
        manager.save_app_state(APP_NAME, &state).unwrap();
        let loaded = manager.load_app_state(APP_NAME).unwrap();

        // Assert
        assert_eq!(loaded, Some(state));
        assert!(dir.path().join("nested").join("app_state.json").exists());
    }

    #[test]
    fn test_save_overwrites_previous_state() {
        let dir = tempdir().unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path());
        manager.save_app_state(APP_NAME, &sample_state()).unwrap();

        manager
            .save_app_state(APP_NAME, &PersistedState::default())
            .unwrap();

        assert_eq!(
            manager.load_app_state(APP_NAME).unwrap(),
            Some(PersistedState::default())
        );
    }

    #[test]
    fn test_malformed_file_is_a_serde_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("app_state.json"), "{ not json").unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path());

        let result = manager.load_app_state(APP_NAME);

        assert!(matches!(result, Err(ConfigError::Serde(_))));
    }

    #[test]
    fn test_missing_fields_default() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("app_state.json"),
            r#"{ "active_preset": "Gone" }"#,
        )
        .unwrap();
        let manager = CoreConfigManager::with_config_dir(dir.path());

        let state = manager.load_app_state(APP_NAME).unwrap().unwrap();
        let (presets, recent) = state.into_parts();

        assert_eq!(presets, PresetStore::default());
        assert!(recent.is_empty());
    }

    #[test]
    fn test_parts_round_trip_through_persisted_state() {
        let (presets, recent) = sample_state().into_parts();

        let rebuilt = PersistedState::from_parts(&presets, &recent);

        assert_eq!(rebuilt, sample_state());
        assert_eq!(presets.active_template(), "## {name}\n{code}");
    }
}
