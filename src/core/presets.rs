/*
 * This module manages content-template presets. A preset pairs a unique name
 * with a template string; exactly one preset is active and feeds the template
 * engine. The store is never empty: it starts with the built-in "Default"
 * preset and refuses to delete the last one.
 *
 * All mutations are in-memory. Persisting the store is the job of the
 * configuration manager (`config.rs`), which hands the parts back to
 * `PresetStore::from_parts` on load.
 */
use super::archiver::DEFAULT_TEMPLATE;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRESET_NAME: &str = "Default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    DuplicateName(String),
    LastPreset(String),
    NotFound(String),
}

impl std::fmt::Display for PresetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresetError::DuplicateName(name) => {
                write!(f, "Preset name '{name}' is empty or already in use")
            }
            PresetError::LastPreset(name) => {
                write!(f, "Cannot delete '{name}': it is the only remaining preset")
            }
            PresetError::NotFound(name) => write!(f, "Preset not found: {name}"),
        }
    }
}

impl std::error::Error for PresetError {}

pub type Result<T> = std::result::Result<T, PresetError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub template: String,
}

impl Preset {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Preset {
            name: name.into(),
            template: template.into(),
        }
    }
}

fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

/*
 * Named presets in creation order plus the active name.
 * Invariant: the map is non-empty and `active_name` is one of its keys.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct PresetStore {
    presets: IndexMap<String, Preset>,
    active_name: String,
}

impl Default for PresetStore {
    fn default() -> Self {
        let mut presets = IndexMap::new();
        presets.insert(
            DEFAULT_PRESET_NAME.to_string(),
            Preset::new(DEFAULT_PRESET_NAME, DEFAULT_TEMPLATE),
        );
        PresetStore {
            presets,
            active_name: DEFAULT_PRESET_NAME.to_string(),
        }
    }
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /*
     * Rebuilds a store from persisted parts, repairing anything that would
     * break the invariant: blank or repeated names are dropped, an empty list
     * yields the default store, and an unknown active name falls back to the
     * first preset.
     */
    pub fn from_parts(presets: Vec<Preset>, active_name: Option<String>) -> Self {
        let mut map = IndexMap::new();
        for preset in presets {
            if is_blank(&preset.name) || map.contains_key(&preset.name) {
                log::warn!(
                    "PresetStore: Dropping invalid or repeated persisted preset '{}'.",
                    preset.name
                );
                continue;
            }
            map.insert(preset.name.clone(), preset);
        }
        if map.is_empty() {
            log::debug!("PresetStore: No persisted presets, using the built-in default.");
            return PresetStore::default();
        }
        let active_name = match active_name {
            Some(name) if map.contains_key(&name) => name,
            other => {
                let fallback = map
                    .keys()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_PRESET_NAME.to_string());
                log::debug!(
                    "PresetStore: Active preset {other:?} unavailable, activating '{fallback}'."
                );
                fallback
            }
        };
        PresetStore {
            presets: map,
            active_name,
        }
    }

    pub fn presets(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    pub fn active_template(&self) -> &str {
        self.presets
            .get(&self.active_name)
            .map(|p| p.template.as_str())
            .unwrap_or(DEFAULT_TEMPLATE)
    }

    pub fn create(&mut self, name: &str, template: &str) -> Result<()> {
        if is_blank(name) || self.presets.contains_key(name) {
            return Err(PresetError::DuplicateName(name.to_string()));
        }
        self.presets
            .insert(name.to_string(), Preset::new(name, template));
        log::debug!("PresetStore: Created preset '{name}'.");
        Ok(())
    }

    /// Replaces the template of an existing preset.
    pub fn update_template(&mut self, name: &str, template: &str) -> Result<()> {
        let preset = self
            .presets
            .get_mut(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))?;
        preset.template = template.to_string();
        Ok(())
    }

    /*
     * Renames a preset in place, keeping its position in the listing. The
     * active name follows the rename.
     */
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let Some(index) = self.presets.get_index_of(old_name) else {
            return Err(PresetError::NotFound(old_name.to_string()));
        };
        if new_name == old_name {
            return Ok(());
        }
        if is_blank(new_name) || self.presets.contains_key(new_name) {
            return Err(PresetError::DuplicateName(new_name.to_string()));
        }
        let Some((_, mut preset)) = self.presets.shift_remove_index(index) else {
            return Err(PresetError::NotFound(old_name.to_string()));
        };
        preset.name = new_name.to_string();
        self.presets
            .shift_insert(index, new_name.to_string(), preset);
        if self.active_name == old_name {
            self.active_name = new_name.to_string();
        }
        log::debug!("PresetStore: Renamed preset '{old_name}' to '{new_name}'.");
        Ok(())
    }

    /*
     * Deletes a preset. Deleting the active preset activates the first
     * remaining one.
     */
    pub fn delete(&mut self, name: &str) -> Result<()> {
        if !self.presets.contains_key(name) {
            return Err(PresetError::NotFound(name.to_string()));
        }
        if self.presets.len() == 1 {
            return Err(PresetError::LastPreset(name.to_string()));
        }
        self.presets.shift_remove(name);
        if self.active_name == name
            && let Some(first) = self.presets.keys().next()
        {
            self.active_name = first.clone();
        }
        log::debug!(
            "PresetStore: Deleted preset '{name}', active is now '{}'.",
            self.active_name
        );
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if !self.presets.contains_key(name) {
            return Err(PresetError::NotFound(name.to_string()));
        }
        self.active_name = name.to_string();
        Ok(())
    }

    pub fn restore_default_content(&mut self, name: &str) -> Result<()> {
        self.update_template(name, DEFAULT_TEMPLATE)
    }
}
