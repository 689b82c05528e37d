/*
 * The ordered set of selected files, keyed by relative path.
 * Insertion order is kept so that output follows the order in which the user
 * checked files; removing a path that is not present is a no-op. The set is
 * only mutated together with the tree by `ProjectSession`, which keeps it equal
 * to the set of checked file nodes.
 */
use indexmap::IndexSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    paths: IndexSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        SelectionSet::default()
    }

    /// Appends `relative_path` unless already present. Returns true if it was added.
    pub fn insert(&mut self, relative_path: String) -> bool {
        self.paths.insert(relative_path)
    }

    /// Removes `relative_path` keeping the order of the remaining paths.
    pub fn remove(&mut self, relative_path: &str) -> bool {
        self.paths.shift_remove(relative_path)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.paths.contains(relative_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.paths.iter().cloned().collect()
    }
}
