//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use termtree::Tree;

use crate::domain::{ChangeAction, NodeContents, NodeId, ProjectionChange, Record, TreeProjection};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Print one projected event, items named by uid where still known.
pub fn event(tree: &TreeProjection<Record>, change: &ProjectionChange) {
    let items: Vec<String> = change.items().iter().map(|&id| describe(tree, id)).collect();
    let line = format!("{change}: {}", items.join(", "));
    let marker = match change.action {
        ChangeAction::Add => "+".green(),
        ChangeAction::Remove => "-".red(),
        ChangeAction::Move => "~".yellow(),
        ChangeAction::Change => "*".cyan(),
    };
    println!("  {} {}", marker, line);
}

fn describe(tree: &TreeProjection<Record>, id: NodeId) -> String {
    tree.uid_of(id)
        .map(str::to_string)
        .unwrap_or_else(|_| id.to_string())
}

/// Display label of one node.
fn label(tree: &TreeProjection<Record>, id: NodeId) -> String {
    let Ok(node) = tree.node(id) else {
        return id.to_string();
    };
    match node.contents() {
        NodeContents::Group(key) => format!("[{key}]"),
        NodeContents::Root { record: Some(record), .. } | NodeContents::Record(record) => {
            format!("{} {}", node.uid(), record)
        }
        NodeContents::Root { record: None, .. } => node.uid().to_string(),
    }
}

/// Visible projection as a termtree, rooted at the tree's root.
pub fn to_termtree(tree: &TreeProjection<Record>) -> Tree<String> {
    fn build_tree(tree: &TreeProjection<Record>, id: NodeId, parent_tree: &mut Tree<String>) {
        let Ok(node) = tree.node(id) else {
            return;
        };
        for &child in node.layout() {
            let mut child_tree = Tree::new(label(tree, child));
            build_tree(tree, child, &mut child_tree);
            parent_tree.push(child_tree);
        }
    }

    let root = tree.root();
    let mut rendered = Tree::new(label(tree, root));
    build_tree(tree, root, &mut rendered);
    rendered
}

/// Flat `index level uid record` listing of the enumeration.
pub fn flat_lines(tree: &TreeProjection<Record>) -> Vec<String> {
    tree.enumerate()
        .enumerate()
        .map(|(index, (id, node))| format!("{index:>4} {:>2} {}", node.level(), label(tree, id)))
        .collect()
}
