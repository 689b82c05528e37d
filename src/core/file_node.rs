use std::path::{Path, PathBuf};

/*
 * Represents the tri-state selection of a file or folder.
 * Files are only ever `Checked` or `Unchecked`; `Partial` is reserved for
 * folders whose descendant files are mixed. A user can never request `Partial`.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckState {
    #[default]
    Unchecked,
    Checked,
    Partial,
}

/*
 * Represents a node in the scanned project tree.
 * A node's identity is its absolute path. Each node exclusively owns its
 * children; the project session owns the root. Folder states are never a source
 * of truth; they are derived from the files below them after every mutation.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct FileNode {
    path: PathBuf,
    name: String,
    is_dir: bool,
    pub(crate) state: CheckState,
    pub children: Vec<FileNode>, // Children are only populated if is_dir is true
}

impl FileNode {
    /*
     * Creates a new FileNode in the `Unchecked` state with no children.
     * Scanning attaches children afterwards.
     */
    pub fn new(path: PathBuf, name: String, is_dir: bool) -> Self {
        FileNode {
            path,
            name,
            is_dir,
            state: CheckState::default(),
            children: Vec::new(),
        }
    }

    /// Creates a folder node with the given children, deriving its own state from them.
    #[cfg(test)]
    pub fn new_dir_with_children(path: PathBuf, name: String, children: Vec<FileNode>) -> Self {
        let mut node = FileNode::new(path, name, true);
        node.children = children;
        node.state = node.derived_state();
        node
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn state(&self) -> CheckState {
        self.state
    }

    pub fn is_checked(&self) -> bool {
        self.state == CheckState::Checked
    }

    /*
     * Returns true if this node is a file or a folder with at least one file
     * somewhere below it. Folders without files take no part in the tri-state
     * derivation of their parents.
     */
    pub fn contains_files(&self) -> bool {
        !self.is_dir || self.children.iter().any(FileNode::contains_files)
    }

    /*
     * Computes the state this folder must hold given the current states of its
     * children: `Checked` if every file below is checked, `Unchecked` if none is,
     * `Partial` otherwise. Children without files are skipped so that the result
     * matches the descendant-file rule. Files simply report their own state.
     */
    pub fn derived_state(&self) -> CheckState {
        if !self.is_dir {
            return self.state;
        }
        let mut any_checked = false;
        let mut any_unchecked = false;
        for child in self.children.iter().filter(|c| c.contains_files()) {
            match child.state {
                CheckState::Checked => any_checked = true,
                CheckState::Unchecked => any_unchecked = true,
                CheckState::Partial => return CheckState::Partial,
            }
            if any_checked && any_unchecked {
                return CheckState::Partial;
            }
        }
        if any_checked {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        }
    }

    /*
     * Locates a node by absolute path, descending only into the branch whose
     * path prefixes the target.
     */
    pub fn find(&self, target: &Path) -> Option<&FileNode> {
        if self.path == target {
            return Some(self);
        }
        if !self.is_dir || !target.starts_with(&self.path) {
            return None;
        }
        self.children
            .iter()
            .find(|child| target.starts_with(&child.path))
            .and_then(|child| child.find(target))
    }

    /*
     * Visits every file below (or at) this node in listing order:
     * folders before files, then by name, as produced by the scanner.
     */
    pub fn for_each_file<'a>(&'a self, visit: &mut dyn FnMut(&'a FileNode)) {
        if self.is_dir {
            for child in &self.children {
                child.for_each_file(visit);
            }
        } else {
            visit(self);
        }
    }
}

/*
 * Expresses `path` relative to `root` with `/` separators, the stable key
 * used by the selection set and template expansion.
 */
pub fn relative_path_string(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, state: CheckState) -> FileNode {
        let path = PathBuf::from(path);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let mut node = FileNode::new(path, name, false);
        node.state = state;
        node
    }

    #[test]
    fn test_filenode_new_defaults() {
        let p = PathBuf::from("/tmp/foo");
        let n = FileNode::new(p.clone(), "foo".into(), false);
        assert_eq!(n.path(), p.as_path());
        assert_eq!(n.name(), "foo");
        assert!(!n.is_dir());
        assert_eq!(n.state(), CheckState::Unchecked);
        assert!(n.children.is_empty());
    }

    #[test]
    fn test_derived_state_covers_all_three_states() {
        let mixed = FileNode::new_dir_with_children(
            PathBuf::from("/p/src"),
            "src".into(),
            vec![
                file("/p/src/a.go", CheckState::Checked),
                file("/p/src/b.go", CheckState::Unchecked),
            ],
        );
        assert_eq!(mixed.state(), CheckState::Partial);

        let all = FileNode::new_dir_with_children(
            PathBuf::from("/p/src"),
            "src".into(),
            vec![
                file("/p/src/a.go", CheckState::Checked),
                file("/p/src/b.go", CheckState::Checked),
            ],
        );
        assert_eq!(all.state(), CheckState::Checked);

        let none = FileNode::new_dir_with_children(
            PathBuf::from("/p/src"),
            "src".into(),
            vec![file("/p/src/a.go", CheckState::Unchecked)],
        );
        assert_eq!(none.state(), CheckState::Unchecked);
    }

    #[test]
    fn test_derived_state_ignores_folders_without_files() {
        let empty = FileNode::new(PathBuf::from("/p/empty"), "empty".into(), true);
        let parent = FileNode::new_dir_with_children(
            PathBuf::from("/p"),
            "p".into(),
            vec![empty, file("/p/a.txt", CheckState::Checked)],
        );
        assert_eq!(parent.state(), CheckState::Checked);

        let only_empty = FileNode::new_dir_with_children(
            PathBuf::from("/q"),
            "q".into(),
            vec![FileNode::new(PathBuf::from("/q/e"), "e".into(), true)],
        );
        assert_eq!(only_empty.state(), CheckState::Unchecked);
        assert!(!only_empty.contains_files());
    }

    #[test]
    fn test_find_descends_by_prefix() {
        let tree = FileNode::new_dir_with_children(
            PathBuf::from("/p"),
            "p".into(),
            vec![
                FileNode::new_dir_with_children(
                    PathBuf::from("/p/src"),
                    "src".into(),
                    vec![file("/p/src/a.go", CheckState::Unchecked)],
                ),
                file("/p/srcfile", CheckState::Unchecked),
            ],
        );
        assert_eq!(
            tree.find(Path::new("/p/src/a.go")).map(|n| n.name()),
            Some("a.go")
        );
        assert_eq!(
            tree.find(Path::new("/p/srcfile")).map(|n| n.name()),
            Some("srcfile")
        );
        assert!(tree.find(Path::new("/p/src/missing.go")).is_none());
        assert!(tree.find(Path::new("/elsewhere")).is_none());
    }

    #[test]
    fn test_relative_path_string_uses_forward_slashes() {
        let root = PathBuf::from("/proj");
        let nested = root.join("src").join("a.go");
        assert_eq!(relative_path_string(&root, &nested), "src/a.go");
        assert_eq!(relative_path_string(&root, &root.join("README.md")), "README.md");
    }
}
