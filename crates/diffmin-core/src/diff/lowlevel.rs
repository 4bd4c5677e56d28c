//! Low-level trees: the flattened view the matcher works on.
//!
//! A [`LowTree`] mirrors a [`Tree`] under an extra synthetic root that has no
//! back-reference. Nodes the matcher does not track (implicit nodes and fixed
//! punctuation) are left out; the correspondence resolver recovers them
//! later by sibling alignment.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::role::Role;
use crate::tree::{NodeId, NodeRef, Tree};

pub type LowId = usize;

/// Kind of the synthetic root every low-level tree is built under.
pub const SYNTHETIC_ROOT_KIND: &str = "root";

/// Punctuation that every node of the enclosing kind carries. `;` and `.`
/// are not in here: they come and go with an optional sibling (a method
/// body, an invocation's object, an import's `*`) and must be diffed.
const FIXED_PUNCTUATION: &[&str] = &["(", ")", "{", "}", "@", "::"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrdering {
    /// Position among siblings is significant.
    Ordered,
    /// Siblings form a set (modifiers, thrown types).
    Unordered,
}

#[derive(Debug, Clone)]
pub struct LowNode {
    pub kind: &'static str,
    pub label: String,
    pub role: Role,
    /// The typed node this low-level node stands for; `None` for the
    /// synthetic root.
    pub origin: Option<NodeRef>,
    pub parent: Option<LowId>,
    pub children: Vec<LowId>,
    pub ordering: ListOrdering,
    /// A token of the source text, as opposed to a construct that merely
    /// happens to have no children (an empty block).
    pub terminal: bool,
    hash: u64,
    size: usize,
}

#[derive(Debug, Clone)]
pub struct LowTree {
    nodes: Vec<LowNode>,
    by_origin: HashMap<NodeRef, LowId>,
}

/// Whether the matcher leaves `id` untracked.
pub fn is_ignored(tree: &Tree, id: NodeId) -> bool {
    tree.is_implicit(id)
        || (tree.role(id) == Role::Token && FIXED_PUNCTUATION.contains(&tree.label(id)))
}

fn ordering_of(kind: &str) -> ListOrdering {
    match kind {
        "modifiers" | "throws" => ListOrdering::Unordered,
        _ => ListOrdering::Ordered,
    }
}

impl LowTree {
    /// A low-level tree holding only the synthetic root.
    pub fn synthetic() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            by_origin: HashMap::new(),
        };
        tree.push(None, SYNTHETIC_ROOT_KIND, String::new(), Role::Root, None, false);
        tree.seal();
        tree
    }

    /// Project `tree` under a fresh synthetic root.
    pub fn project(tree: &Tree) -> Self {
        let mut low = Self {
            nodes: Vec::new(),
            by_origin: HashMap::new(),
        };
        let root = low.push(None, SYNTHETIC_ROOT_KIND, String::new(), Role::Root, None, false);
        low.project_node(tree, tree.root(), root);
        low.seal();
        low
    }

    fn project_node(&mut self, tree: &Tree, id: NodeId, parent: LowId) {
        let low = self.push(
            Some(parent),
            tree.kind(id),
            tree.label(id).to_string(),
            tree.role(id),
            Some(tree.node_ref(id)),
            tree.children(id).is_empty() && !tree.label(id).is_empty(),
        );
        for &child in tree.children(id) {
            if !is_ignored(tree, child) {
                self.project_node(tree, child, low);
            }
        }
    }

    fn push(
        &mut self,
        parent: Option<LowId>,
        kind: &'static str,
        label: String,
        role: Role,
        origin: Option<NodeRef>,
        terminal: bool,
    ) -> LowId {
        let id = self.nodes.len();
        self.nodes.push(LowNode {
            kind,
            label,
            role,
            origin,
            parent,
            children: Vec::new(),
            ordering: ordering_of(kind),
            terminal,
            hash: 0,
            size: 1,
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        if let Some(origin) = origin {
            self.by_origin.insert(origin, id);
        }
        id
    }

    /// Compute subtree hashes and sizes. Children always follow their
    /// parent in the arena, so a reverse sweep sees them first.
    fn seal(&mut self) {
        for id in (0..self.nodes.len()).rev() {
            let mut hasher = DefaultHasher::new();
            let node = &self.nodes[id];
            node.kind.hash(&mut hasher);
            node.label.hash(&mut hasher);
            let mut size = 1;
            for &child in &node.children {
                self.nodes[child].hash.hash(&mut hasher);
                size += self.nodes[child].size;
            }
            self.nodes[id].hash = hasher.finish();
            self.nodes[id].size = size;
        }
    }

    pub fn root(&self) -> LowId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: LowId) -> &LowNode {
        &self.nodes[id]
    }

    pub fn children(&self, id: LowId) -> &[LowId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: LowId) -> Option<LowId> {
        self.nodes[id].parent
    }

    pub fn is_terminal(&self, id: LowId) -> bool {
        self.nodes[id].terminal
    }

    /// Hash of kind, label and the hashes of all children, in order.
    pub fn structural_hash(&self, id: LowId) -> u64 {
        self.nodes[id].hash
    }

    pub fn size(&self, id: LowId) -> usize {
        self.nodes[id].size
    }

    pub fn find(&self, origin: NodeRef) -> Option<LowId> {
        self.by_origin.get(&origin).copied()
    }

    pub fn preorder(&self, from: LowId) -> Vec<LowId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        out
    }

    /// Labels of the terminals under `id`, left to right.
    pub fn leaf_labels(&self, id: LowId) -> Vec<&str> {
        self.preorder(id)
            .into_iter()
            .filter(|&n| self.is_terminal(n))
            .map(|n| self.nodes[n].label.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;

    #[test]
    fn test_projection_skips_fixed_punctuation() {
        let tree = parse_source("class C { int f(int a, int b) { return g(a); } }", Path::new("A.java")).unwrap();
        let low = LowTree::project(&tree);
        assert_eq!(low.node(low.root()).kind, SYNTHETIC_ROOT_KIND);
        assert!(low.node(low.root()).origin.is_none());
        let labels: Vec<&str> = low.preorder(low.root()).iter().map(|&n| low.node(n).label.as_str()).collect();
        assert!(labels.contains(&";"));
        assert!(!labels.contains(&"("));
        assert!(labels.contains(&"return"));
        let package = low.children(low.root())[0];
        assert_eq!(low.node(package).origin, Some(tree.node_ref(tree.root())));
        assert_eq!(low.find(tree.node_ref(tree.root())), Some(package));
    }

    #[test]
    fn test_equal_subtrees_share_hash() {
        let a = parse_source("class C { void f() { x(1); x(1); y(1); } }", Path::new("A.java")).unwrap();
        let low = LowTree::project(&a);
        let statements: Vec<LowId> = low
            .preorder(low.root())
            .into_iter()
            .filter(|&n| low.node(n).kind == "expression_statement")
            .collect();
        assert_eq!(statements.len(), 3);
        assert_eq!(low.structural_hash(statements[0]), low.structural_hash(statements[1]));
        assert_ne!(low.structural_hash(statements[0]), low.structural_hash(statements[2]));
        assert_eq!(low.size(statements[0]), low.size(statements[2]));
        assert_eq!(low.leaf_labels(statements[2]), vec!["y", "1", ";"]);
    }

    #[test]
    fn test_optional_punctuation_is_tracked() {
        let tree = parse_source("import java.util.*;\nclass C { abstract void f(); int g() { return (1); } }", Path::new("A.java")).unwrap();
        let tracked: Vec<NodeId> = tree
            .depth_first(tree.root())
            .into_iter()
            .filter(|&n| matches!(tree.label(n), "." | ";"))
            .collect();
        assert_eq!(tracked.len(), 5);
        assert!(tracked.iter().all(|&n| !is_ignored(&tree, n)));
        let paren = tree
            .depth_first(tree.root())
            .into_iter()
            .find(|&n| tree.label(n) == "(")
            .unwrap();
        assert!(is_ignored(&tree, paren));
    }

    #[test]
    fn test_modifier_lists_are_unordered() {
        let tree = parse_source("class C { public static void f() {} }", Path::new("A.java")).unwrap();
        let low = LowTree::project(&tree);
        let modifiers = low
            .preorder(low.root())
            .into_iter()
            .find(|&n| low.node(n).kind == "modifiers")
            .unwrap();
        assert_eq!(low.node(modifiers).ordering, ListOrdering::Unordered);
        assert_eq!(LowTree::synthetic().len(), 1);
    }
}
