use crate::core::{
    AggregateOutcome, CheckState, ConfigError, ConfigManagerOperations, FileNode,
    FileReaderOperations, FileSystemError, FileSystemScannerOperations, NodeChange,
    PersistedState, PresetError, PresetStore, ProjectSession, ProjectSessionOperations,
    RecentEntry, RecentLedger, SessionError, relative_time_label,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;

pub(crate) const APP_NAME: &str = "Nafuda";

#[derive(Debug)]
pub enum AppError {
    FileSystem(FileSystemError),
    Session(SessionError),
    Preset(PresetError),
    Config(ConfigError),
    NothingSelected,
}

impl From<FileSystemError> for AppError {
    fn from(err: FileSystemError) -> Self {
        AppError::FileSystem(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<PresetError> for AppError {
    fn from(err: PresetError) -> Self {
        AppError::Preset(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::FileSystem(e) => write!(f, "{e}"),
            AppError::Session(e) => write!(f, "{e}"),
            AppError::Preset(e) => write!(f, "{e}"),
            AppError::Config(e) => write!(f, "{e}"),
            AppError::NothingSelected => write!(f, "No files selected"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::FileSystem(e) => Some(e),
            AppError::Session(e) => Some(e),
            AppError::Preset(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::NothingSelected => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/*
 * Coordinates the engine for a collaborator (the CLI today, a UI tomorrow).
 * It owns the project session, the preset store and the recent-project
 * ledger, and reaches the filesystem only through the injected `…Operations`
 * objects. Every change to presets or recent projects is saved through the
 * config manager before the call returns.
 */
pub struct AppLogic {
    pub(crate) session: ProjectSession,
    pub(crate) presets: PresetStore,
    pub(crate) recent: RecentLedger,
    scanner: Arc<dyn FileSystemScannerOperations>,
    file_reader: Arc<dyn FileReaderOperations>,
    config_manager: Arc<dyn ConfigManagerOperations>,
}

impl AppLogic {
    /*
     * Creates the coordinator with a default preset store and an empty
     * ledger. Use `load_state` to pick up what a previous run saved.
     */
    pub fn new(
        scanner: Arc<dyn FileSystemScannerOperations>,
        file_reader: Arc<dyn FileReaderOperations>,
        config_manager: Arc<dyn ConfigManagerOperations>,
    ) -> Self {
        AppLogic {
            session: ProjectSession::new(),
            presets: PresetStore::new(),
            recent: RecentLedger::new(),
            scanner,
            file_reader,
            config_manager,
        }
    }

    /*
     * Replaces presets and recent projects with the persisted ones. A missing
     * state file keeps the defaults. An unreadable one is reported as a
     * warning and also keeps the defaults, so a corrupt file never blocks
     * startup; it is overwritten by the next save.
     */
    pub fn load_state(&mut self) {
        match self.config_manager.load_app_state(APP_NAME) {
            Ok(Some(state)) => {
                let (presets, recent) = state.into_parts();
                log::debug!(
                    "AppLogic: Restored {} presets (active '{}') and {} recent projects.",
                    presets.len(),
                    presets.active_name(),
                    recent.len()
                );
                self.presets = presets;
                self.recent = recent;
            }
            Ok(None) => {
                log::debug!("AppLogic: No saved state found, using defaults.");
            }
            Err(e) => {
                log::warn!("AppLogic: Failed to load saved state, using defaults: {e}");
            }
        }
    }

    fn save_state(&self) -> Result<()> {
        let state = PersistedState::from_parts(&self.presets, &self.recent);
        self.config_manager.save_app_state(APP_NAME, &state)?;
        Ok(())
    }

    fn save_state_or_warn(&self) {
        if let Err(e) = self.save_state() {
            log::warn!("AppLogic: Failed to save state: {e}");
        }
    }

    // --- Project & selection ---

    pub fn open_project(&mut self, path: &Path) -> Result<&FileNode> {
        self.open_project_at(path, OffsetDateTime::now_utc())
    }

    /*
     * Scans `path` into a fresh tree and records it as the most recent
     * project. If the directory is gone, any ledger entry for it is dropped
     * (and saved) before the `NotFound` error is returned.
     */
    pub fn open_project_at(&mut self, path: &Path, now: OffsetDateTime) -> Result<&FileNode> {
        let root_path = match self.session.open_project(path, self.scanner.as_ref()) {
            Ok(root) => root.path().to_path_buf(),
            Err(FileSystemError::NotFound(missing)) => {
                let removed_resolved = self.recent.remove(&missing);
                let removed_given = self.recent.remove(path);
                if removed_resolved || removed_given {
                    log::info!("AppLogic: Removed missing project {missing:?} from recent list.");
                    self.save_state_or_warn();
                }
                return Err(FileSystemError::NotFound(missing).into());
            }
            Err(e) => return Err(e.into()),
        };
        log::info!("AppLogic: Opened project {root_path:?}.");
        self.recent.record_opened(&root_path, now);
        self.save_state_or_warn();
        self.session
            .root()
            .ok_or(AppError::Session(SessionError::NoProjectOpen))
    }

    pub fn root(&self) -> Option<&FileNode> {
        self.session.root()
    }

    pub fn toggle_node(&mut self, path: &Path, desired: CheckState) -> Result<Vec<NodeChange>> {
        Ok(self.session.toggle_node(path, desired)?)
    }

    /*
     * Maps `relative` (a `/`-separated path below the project root) to the
     * absolute node path. An empty path or "." addresses the root itself. On
     * Windows a `\` also separates components.
     */
    pub fn resolve_relative(&self, relative: &str) -> Result<PathBuf> {
        let mut target = self
            .root()
            .ok_or(SessionError::NoProjectOpen)?
            .path()
            .to_path_buf();
        for part in relative
            .split(std::path::is_separator)
            .filter(|p| !p.is_empty() && *p != ".")
        {
            target.push(part);
        }
        Ok(target)
    }

    pub fn toggle_relative(
        &mut self,
        relative: &str,
        desired: CheckState,
    ) -> Result<Vec<NodeChange>> {
        let target = self.resolve_relative(relative)?;
        self.toggle_node(&target, desired)
    }

    pub fn select_all(&mut self) -> Result<Vec<NodeChange>> {
        Ok(self.session.select_all()?)
    }

    pub fn deselect_all(&mut self) -> Result<Vec<NodeChange>> {
        Ok(self.session.deselect_all()?)
    }

    pub fn selected_relative_paths(&self) -> Vec<String> {
        self.session.selected_relative_paths()
    }

    // --- Output ---

    pub fn render_tree(&self, path: &Path) -> Result<String> {
        Ok(self.session.render_tree(path)?)
    }

    /// The "Project Structure:" block for the whole project.
    pub fn copy_directory_tree(&self) -> Result<String> {
        Ok(self.session.structure_text()?)
    }

    fn ensure_selection(&self) -> Result<()> {
        if self.session.root().is_none() {
            return Err(SessionError::NoProjectOpen.into());
        }
        if self.session.selection().is_empty() {
            log::warn!("AppLogic: No files selected.");
            return Err(AppError::NothingSelected);
        }
        Ok(())
    }

    pub fn copy_file_content(&self) -> Result<AggregateOutcome> {
        self.copy_file_content_with(self.presets.active_template())
    }

    pub fn copy_file_content_with(&self, template: &str) -> Result<AggregateOutcome> {
        self.ensure_selection()?;
        Ok(self
            .session
            .aggregate_selected(template, self.file_reader.as_ref())?)
    }

    pub fn copy_full_context(&self) -> Result<AggregateOutcome> {
        self.copy_full_context_with(self.presets.active_template())
    }

    pub fn copy_full_context_with(&self, template: &str) -> Result<AggregateOutcome> {
        self.ensure_selection()?;
        Ok(self
            .session
            .full_context(template, self.file_reader.as_ref())?)
    }

    // --- Presets ---

    pub fn preset_names(&self) -> Vec<String> {
        self.presets.names()
    }

    pub fn active_preset_name(&self) -> &str {
        self.presets.active_name()
    }

    pub fn active_template(&self) -> &str {
        self.presets.active_template()
    }

    pub fn preset_template(&self, name: &str) -> Result<&str> {
        self.presets
            .get(name)
            .map(|p| p.template.as_str())
            .ok_or_else(|| PresetError::NotFound(name.to_string()).into())
    }

    pub fn create_preset(&mut self, name: &str, template: &str) -> Result<()> {
        self.presets.create(name, template)?;
        self.save_state()
    }

    pub fn update_preset_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.presets.update_template(name, template)?;
        self.save_state()
    }

    pub fn rename_preset(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        self.presets.rename(old_name, new_name)?;
        self.save_state()
    }

    pub fn delete_preset(&mut self, name: &str) -> Result<()> {
        self.presets.delete(name)?;
        self.save_state()
    }

    pub fn set_active_preset(&mut self, name: &str) -> Result<()> {
        self.presets.set_active(name)?;
        self.save_state()
    }

    pub fn restore_default_preset_content(&mut self, name: &str) -> Result<()> {
        self.presets.restore_default_content(name)?;
        self.save_state()
    }

    // --- Recent projects ---

    pub fn recent_projects(&self) -> &[RecentEntry] {
        self.recent.entries()
    }

    pub fn recent_projects_with_labels(&self, now: OffsetDateTime) -> Vec<(PathBuf, String)> {
        self.recent_projects()
            .iter()
            .map(|entry| (entry.path.clone(), relative_time_label(entry, now)))
            .collect()
    }

    /// Returns whether an entry was removed. Absent paths are not an error.
    pub fn remove_recent_project(&mut self, path: &Path) -> Result<bool> {
        let removed = self.recent.remove(path);
        if removed {
            self.save_state()?;
        }
        Ok(removed)
    }

    pub fn clear_recent_projects(&mut self) -> Result<()> {
        self.recent.clear();
        self.save_state()
    }
}
