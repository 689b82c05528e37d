/*
 * Resolves where nafuda keeps its per-user state. The default is the local
 * (non-roaming) configuration directory that `ProjectDirs` reports for the
 * application name; an explicit directory can replace it, which the CLI uses
 * for `--config-dir` and the tests use to stay inside a temp dir.
 */
use directories::ProjectDirs;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const APP_STATE_FILENAME: &str = "app_state.json";

/// Creates `dir` and its parents if they are missing.
pub fn ensure_directory(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        log::trace!("PathUtils: Directory already exists: {dir:?}");
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    log::debug!("PathUtils: Created directory: {dir:?}");
    Ok(())
}

/*
 * Returns the platform-specific local configuration directory for `app_name`,
 * creating it if needed. `None` means the platform offers no home directory
 * or the directory could not be created.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Resolving config dir for '{app_name}'");
    let proj_dirs = ProjectDirs::from("", "", app_name)?;
    let config_path = proj_dirs.config_local_dir();
    match ensure_directory(config_path) {
        Ok(()) => Some(config_path.to_path_buf()),
        Err(e) => {
            log::error!("PathUtils: Failed to create config directory {config_path:?}: {e}");
            None
        }
    }
}

/*
 * Picks the directory holding the state file: `override_dir` when given
 * (created on demand), the `ProjectDirs` location otherwise.
 */
pub fn resolve_config_dir(app_name: &str, override_dir: Option<&Path>) -> Option<PathBuf> {
    match override_dir {
        Some(dir) => match ensure_directory(dir) {
            Ok(()) => Some(dir.to_path_buf()),
            Err(e) => {
                log::error!("PathUtils: Failed to create config directory {dir:?}: {e}");
                None
            }
        },
        None => get_base_app_config_local_dir(app_name),
    }
}

pub fn app_state_file(config_dir: &Path) -> PathBuf {
    config_dir.join(APP_STATE_FILENAME)
}
