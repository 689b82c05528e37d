use super::file_node::FileNode;
use ignore::{DirEntry, WalkBuilder};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/*
 * This module builds the in-memory project tree from the file system.
 * It defines errors specific to scanning, a trait `FileSystemScannerOperations`
 * for abstracting the scan, and a concrete implementation `CoreFileSystemScanner`.
 * Hidden entries (names starting with '.') are skipped; no ignore files are read.
 */

/*
 * Defines the failure modes of a scan. A scan either returns the complete tree
 * or one of these errors; a partial tree is never handed out.
 */
#[derive(Debug)]
pub enum FileSystemError {
    NotFound(PathBuf),
    Access { path: PathBuf, source: io::Error },
}

impl FileSystemError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            FileSystemError::NotFound(path.to_path_buf())
        } else {
            FileSystemError::Access {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }

    /*
     * Converts a walker error. The `ignore` crate wraps the underlying I/O error
     * together with the offending path; both are recovered when present. A
     * symlink loop carries no I/O error and is reported as an access failure.
     */
    fn from_walk(root_path: &Path, err: ignore::Error) -> Self {
        let path = walk_error_path(&err).unwrap_or_else(|| root_path.to_path_buf());
        let message = err.to_string();
        match err.into_io_error() {
            Some(io_err) => FileSystemError::from_io(&path, io_err),
            None => FileSystemError::Access {
                path,
                source: io::Error::other(message),
            },
        }
    }
}

fn walk_error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        _ => None,
    }
}

impl std::fmt::Display for FileSystemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileSystemError::NotFound(p) => write!(f, "Path not found: {}", p.display()),
            FileSystemError::Access { path, source } => {
                write!(f, "Cannot list {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for FileSystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileSystemError::Access { source, .. } => Some(source),
            FileSystemError::NotFound(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FileSystemError>;

/*
 * Defines the operations for scanning a project directory.
 * Implementations traverse `root_path` recursively and return the root node of
 * the hierarchy, every node starting `Unchecked`. Each call re-scans; nothing is
 * cached between calls.
 */
pub trait FileSystemScannerOperations: Send + Sync {
    fn scan_directory(&self, root_path: &Path) -> Result<FileNode>;
}

/*
 * The core implementation of `FileSystemScannerOperations`, walking the file
 * system with the `ignore` crate's `WalkBuilder` with all of its standard
 * filters switched off, so only the hidden-name rule applies.
 */
pub struct CoreFileSystemScanner {}

impl CoreFileSystemScanner {
    pub fn new() -> Self {
        CoreFileSystemScanner {}
    }
}

impl Default for CoreFileSystemScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

fn is_hidden_entry(entry: &DirEntry) -> bool {
    entry.depth() > 0 && is_hidden_name(&entry.file_name().to_string_lossy())
}

/*
 * With links followed, the walker fails on a symlink whose target is gone.
 * Such a link is kept as a file node; reading it later fails and the file is
 * skipped like any other unreadable selection.
 */
fn dangling_link_path(err: &ignore::Error) -> Option<PathBuf> {
    let path = walk_error_path(err)?;
    let is_link = std::fs::symlink_metadata(&path).is_ok_and(|m| m.file_type().is_symlink());
    (is_link && std::fs::metadata(&path).is_err()).then_some(path)
}

/*
 * Display name of the root. A path like `..` has no final component, so the
 * canonical form is consulted before falling back to the full path.
 */
fn root_display_name(root_path: &Path) -> String {
    root_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            std::fs::canonicalize(root_path)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| root_path.to_string_lossy().into_owned())
}

impl FileSystemScannerOperations for CoreFileSystemScanner {
    /*
     * Scans `root_path` and builds the project tree.
     * The tree is sorted such that directories appear before files at each level,
     * and then by name. Symlinks are followed, so a linked directory is scanned
     * like any other. Any directory that cannot be read, or a link cycle, aborts
     * the whole scan.
     */
    fn scan_directory(&self, root_path: &Path) -> Result<FileNode> {
        let root_path =
            std::path::absolute(root_path).map_err(|e| FileSystemError::from_io(root_path, e))?;
        let metadata =
            std::fs::metadata(&root_path).map_err(|e| FileSystemError::from_io(&root_path, e))?;
        if !metadata.is_dir() {
            return Err(FileSystemError::Access {
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
                path: root_path,
            });
        }
        log::debug!("FileSystemScanner: Scanning directory {root_path:?}.");

        let mut nodes_map: HashMap<PathBuf, FileNode> = HashMap::new();
        let mut entry_paths_in_discovery_order: Vec<PathBuf> = Vec::new();

        let mut walker_builder = WalkBuilder::new(&root_path);
        walker_builder
            .standard_filters(false)
            .follow_links(true)
            .filter_entry(|entry| !is_hidden_entry(entry))
            .sort_by_file_path(|a, b| a.cmp(b));

        for entry_result in walker_builder.build() {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    let Some(path) = dangling_link_path(&err) else {
                        return Err(FileSystemError::from_walk(&root_path, err));
                    };
                    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned())
                    else {
                        return Err(FileSystemError::from_walk(&root_path, err));
                    };
                    if is_hidden_name(&name) || !path.starts_with(&root_path) {
                        continue;
                    }
                    log::warn!("FileSystemScanner: Keeping dangling link {path:?} as a file.");
                    nodes_map.insert(path.clone(), FileNode::new(path.clone(), name, false));
                    entry_paths_in_discovery_order.push(path);
                    continue;
                }
            };

            // The walker yields the starting path first; the root node is built separately.
            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path().to_path_buf();
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            log::trace!("FileSystemScanner: Found {path:?} (is_dir: {is_dir}).");

            nodes_map.insert(path.clone(), FileNode::new(path.clone(), name, is_dir));
            entry_paths_in_discovery_order.push(path);
        }

        let mut root = FileNode::new(root_path.clone(), root_display_name(&root_path), true);

        // Iterate backwards so that every node has collected its own children
        // before it is moved into its parent.
        for child_path_ref in entry_paths_in_discovery_order.iter().rev() {
            let Some(parent_path) = child_path_ref.parent() else {
                continue;
            };
            let Some(child_node_owned) = nodes_map.remove(child_path_ref) else {
                continue;
            };
            if parent_path == root_path {
                root.children.push(child_node_owned);
            } else if let Some(parent_node_mut) = nodes_map.get_mut(parent_path) {
                parent_node_mut.children.push(child_node_owned);
            } else {
                log::error!(
                    "FileSystemScanner: Parent {parent_path:?} not found for child {child_path_ref:?}; dropping it."
                );
            }
        }

        sort_file_nodes_recursively(&mut root.children);
        log::debug!(
            "FileSystemScanner: Scan complete. Found {} top-level entries for {:?}.",
            root.children.len(),
            root_path
        );
        Ok(root)
    }
}

fn sort_file_nodes_recursively(nodes: &mut [FileNode]) {
    nodes.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name().cmp(b.name()))
    });

    for node in nodes.iter_mut() {
        if node.is_dir() && !node.children.is_empty() {
            sort_file_nodes_recursively(&mut node.children);
        }
    }
}
