/*
 * Renders a project tree as a box-drawing diagram.
 * Only the descendants of the given node are rendered; callers that want a
 * header line prepend the node's name themselves (see `render_structure_text`).
 * Rendering is pure and never cached, so it always mirrors the current tree.
 */
use super::file_node::FileNode;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE_INDENT: &str = "│   ";
const SPACE_INDENT: &str = "    ";
pub const STRUCTURE_HEADER: &str = "Project Structure:";

pub fn render_tree(node: &FileNode) -> String {
    let mut out = String::new();
    render_children(node, "", &mut out);
    out
}

fn render_children(node: &FileNode, prefix: &str, out: &mut String) {
    let count = node.children.len();
    for (index, child) in node.children.iter().enumerate() {
        let is_last = index + 1 == count;
        out.push_str(prefix);
        out.push_str(if is_last { LAST_BRANCH } else { BRANCH });
        out.push_str(child.name());
        out.push('\n');

        if child.is_dir() {
            let indent = if is_last { SPACE_INDENT } else { PIPE_INDENT };
            let child_prefix = format!("{prefix}{indent}");
            render_children(child, &child_prefix, out);
        }
    }
}

/*
 * Produces the "Project Structure:" block: the header, the root's name on its
 * own line, then the rendered descendants.
 */
pub fn render_structure_text(root: &FileNode) -> String {
    format!("{STRUCTURE_HEADER}\n{}\n{}", root.name(), render_tree(root))
}
