/*
 * This module consolidates the core, platform-agnostic engine: scanning a
 * project into a node tree, tri-state selection with its ordered selection
 * set, tree rendering, template expansion and aggregation, presets, the
 * recent-project ledger, and persistence of user-level state. Components that
 * touch the filesystem sit behind `…Operations` traits so they can be mocked.
 */
pub mod archiver;
pub mod config;
pub mod file_node;
pub mod file_system;
pub mod path_utils;
pub mod presets;
pub mod project_session;
pub mod recent_projects;
pub mod selection;
pub mod tree_renderer;

// Re-export key structures and enums
pub use file_node::{CheckState, FileNode};

pub use file_system::{CoreFileSystemScanner, FileSystemError, FileSystemScannerOperations};

pub use archiver::{AggregateOutcome, CoreFileReader, DEFAULT_TEMPLATE, FileReaderOperations};

pub use project_session::{NodeChange, ProjectSession, ProjectSessionOperations, SessionError};

pub use presets::{PresetError, PresetStore};

pub use recent_projects::{RecentEntry, RecentLedger, relative_time_label};

pub use config::{ConfigError, ConfigManagerOperations, CoreConfigManager, PersistedState};
