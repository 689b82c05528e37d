/*
 * This module defines the ProjectSession struct and the ProjectSessionOperations
 * trait. ProjectSession holds the state of the currently opened project: the
 * scanned tree with its tri-state selection, and the ordered set of selected
 * relative file paths. Both are mutated together inside each call, so callers
 * never observe a tree and a selection set that disagree.
 *
 * Opening a project replaces the tree and the selection as a unit. Toggling a
 * node sets every file below it, recomputes folder states bottom-up, and walks
 * back up to the root re-deriving each ancestor.
 */
use crate::core::archiver::{self, AggregateOutcome, FileReaderOperations};
use crate::core::file_node::{CheckState, FileNode, relative_path_string};
use crate::core::file_system::{self, FileSystemScannerOperations};
use crate::core::selection::SelectionSet;
use crate::core::tree_renderer;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NoProjectOpen,
    NodeNotFound(PathBuf),
    InvalidToggleState,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NoProjectOpen => write!(f, "No project is open"),
            SessionError::NodeNotFound(p) => {
                write!(f, "Node not found in project tree: {}", p.display())
            }
            SessionError::InvalidToggleState => {
                write!(f, "A node can only be toggled to checked or unchecked")
            }
        }
    }
}

impl std::error::Error for SessionError {}

pub type Result<T> = std::result::Result<T, SessionError>;

/// A node whose state changed during a toggle, with its new state.
pub type NodeChange = (PathBuf, CheckState);

/*
 * Defines the operations on the opened project. The returned change lists let
 * a UI refresh exactly the rows that changed; they are empty when a toggle
 * requests the state a node already has.
 */
pub trait ProjectSessionOperations: Send + Sync {
    fn open_project(
        &mut self,
        path: &Path,
        scanner: &dyn FileSystemScannerOperations,
    ) -> file_system::Result<&FileNode>;
    fn set_root(&mut self, root: FileNode) -> &FileNode;
    fn root(&self) -> Option<&FileNode>;
    fn find_node(&self, path: &Path) -> Option<&FileNode>;

    fn toggle_node(&mut self, path: &Path, desired: CheckState) -> Result<Vec<NodeChange>>;
    fn select_all(&mut self) -> Result<Vec<NodeChange>>;
    fn deselect_all(&mut self) -> Result<Vec<NodeChange>>;
    fn selection(&self) -> &SelectionSet;
    fn selected_relative_paths(&self) -> Vec<String>;

    fn render_tree(&self, path: &Path) -> Result<String>;
    fn structure_text(&self) -> Result<String>;
    fn aggregate_selected(
        &self,
        template: &str,
        reader: &dyn FileReaderOperations,
    ) -> Result<AggregateOutcome>;
    fn full_context(
        &self,
        template: &str,
        reader: &dyn FileReaderOperations,
    ) -> Result<AggregateOutcome>;
}

#[derive(Debug, Default)]
pub struct ProjectSession {
    root: Option<FileNode>,
    selection: SelectionSet,
}

impl ProjectSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn root_or_err(&self) -> Result<&FileNode> {
        self.root.as_ref().ok_or(SessionError::NoProjectOpen)
    }

    fn reset_states_recursive(node: &mut FileNode) {
        node.state = CheckState::Unchecked;
        for child in node.children.iter_mut() {
            Self::reset_states_recursive(child);
        }
    }

    fn refresh_derived_state(node: &mut FileNode, changes: &mut Vec<NodeChange>) {
        let derived = node.derived_state();
        if derived != node.state {
            node.state = derived;
            changes.push((node.path().to_path_buf(), derived));
        }
    }

    /*
     * Forces every file below `node` to `desired`, keeping the selection set in
     * step, then re-derives folder states on the way back up.
     */
    fn set_subtree_state(
        node: &mut FileNode,
        desired: CheckState,
        root_path: &Path,
        selection: &mut SelectionSet,
        changes: &mut Vec<NodeChange>,
    ) {
        if node.is_dir() {
            for child in node.children.iter_mut() {
                Self::set_subtree_state(child, desired, root_path, selection, changes);
            }
            Self::refresh_derived_state(node, changes);
            return;
        }
        if node.state == desired {
            return;
        }
        node.state = desired;
        changes.push((node.path().to_path_buf(), desired));
        let relative = relative_path_string(root_path, node.path());
        if desired == CheckState::Checked {
            selection.insert(relative);
        } else {
            selection.remove(&relative);
        }
    }

    /*
     * Descends towards `target` and applies the toggle there. Every ancestor on
     * the way back re-derives its state. Returns false if `target` is not in
     * this subtree, in which case nothing was modified.
     */
    fn apply_toggle_recursive(
        node: &mut FileNode,
        target: &Path,
        desired: CheckState,
        root_path: &Path,
        selection: &mut SelectionSet,
        changes: &mut Vec<NodeChange>,
    ) -> bool {
        if node.path() == target {
            Self::set_subtree_state(node, desired, root_path, selection, changes);
            return true;
        }
        if !node.is_dir() || !target.starts_with(node.path()) {
            return false;
        }
        let Some(child) = node
            .children
            .iter_mut()
            .find(|c| target.starts_with(c.path()))
        else {
            return false;
        };
        if !Self::apply_toggle_recursive(child, target, desired, root_path, selection, changes) {
            return false;
        }
        Self::refresh_derived_state(node, changes);
        true
    }
}

impl ProjectSessionOperations for ProjectSession {
    /*
     * Scans `path` and, on success, replaces the current tree and clears the
     * selection. On failure the previous project stays open.
     */
    fn open_project(
        &mut self,
        path: &Path,
        scanner: &dyn FileSystemScannerOperations,
    ) -> file_system::Result<&FileNode> {
        log::debug!("ProjectSession: Opening project {path:?}.");
        let root = scanner.scan_directory(path)?;
        Ok(self.set_root(root))
    }

    /*
     * Installs a freshly built hierarchy. Every node starts unchecked and the
     * selection is emptied; the old tree is dropped, never merged.
     */
    fn set_root(&mut self, mut root: FileNode) -> &FileNode {
        Self::reset_states_recursive(&mut root);
        self.selection.clear();
        self.root.insert(root)
    }

    fn root(&self) -> Option<&FileNode> {
        self.root.as_ref()
    }

    fn find_node(&self, path: &Path) -> Option<&FileNode> {
        self.root.as_ref().and_then(|root| root.find(path))
    }

    fn toggle_node(&mut self, path: &Path, desired: CheckState) -> Result<Vec<NodeChange>> {
        if desired == CheckState::Partial {
            return Err(SessionError::InvalidToggleState);
        }
        let root = self.root.as_mut().ok_or(SessionError::NoProjectOpen)?;
        let root_path = root.path().to_path_buf();
        let mut changes = Vec::new();
        if !Self::apply_toggle_recursive(
            root,
            path,
            desired,
            &root_path,
            &mut self.selection,
            &mut changes,
        ) {
            log::warn!("ProjectSession: Toggle target {path:?} not found in tree.");
            return Err(SessionError::NodeNotFound(path.to_path_buf()));
        }
        log::trace!(
            "ProjectSession: Toggled {path:?} to {desired:?}; {} nodes changed, {} files selected.",
            changes.len(),
            self.selection.len()
        );
        Ok(changes)
    }

    fn select_all(&mut self) -> Result<Vec<NodeChange>> {
        let root_path = self.root_or_err()?.path().to_path_buf();
        self.toggle_node(&root_path, CheckState::Checked)
    }

    fn deselect_all(&mut self) -> Result<Vec<NodeChange>> {
        let root_path = self.root_or_err()?.path().to_path_buf();
        self.toggle_node(&root_path, CheckState::Unchecked)
    }

    fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    fn selected_relative_paths(&self) -> Vec<String> {
        self.selection.to_vec()
    }

    fn render_tree(&self, path: &Path) -> Result<String> {
        self.root_or_err()?;
        let node = self
            .find_node(path)
            .ok_or_else(|| SessionError::NodeNotFound(path.to_path_buf()))?;
        Ok(tree_renderer::render_tree(node))
    }

    fn structure_text(&self) -> Result<String> {
        Ok(tree_renderer::render_structure_text(self.root_or_err()?))
    }

    fn aggregate_selected(
        &self,
        template: &str,
        reader: &dyn FileReaderOperations,
    ) -> Result<AggregateOutcome> {
        let root = self.root_or_err()?;
        let entries: Vec<(String, PathBuf)> = self
            .selection
            .iter()
            .map(|relative| (relative.to_string(), root.path().join(relative)))
            .collect();
        Ok(archiver::aggregate(template, &entries, reader))
    }

    fn full_context(
        &self,
        template: &str,
        reader: &dyn FileReaderOperations,
    ) -> Result<AggregateOutcome> {
        let structure = self.structure_text()?;
        let mut outcome = self.aggregate_selected(template, reader)?;
        outcome.content = archiver::compose_full_context(&structure, &outcome.content);
        Ok(outcome)
    }
}
