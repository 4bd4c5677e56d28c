//! Arena-backed syntax tree.
//!
//! A [`Tree`] owns every node it was built with. Nodes are addressed by
//! [`NodeId`] inside one tree and by [`NodeRef`] across trees; identity, never
//! structural equality, is what the mapping and patch layers key on. Removing
//! a node detaches it from its parent but keeps its arena slot, so ids stay
//! valid for the lifetime of the tree.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::role::{Role, Slot};

/// Index of a node inside its owning tree.
pub type NodeId = usize;

/// Process-unique identifier of a tree.
pub type TreeId = usize;

static NEXT_TREE_ID: AtomicUsize = AtomicUsize::new(1);

fn fresh_tree_id() -> TreeId {
    NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Kind of the root node every tree is built under.
pub const PACKAGE_KIND: &str = "package";

/// A node address that is unambiguous across trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
    pub tree: TreeId,
    pub node: NodeId,
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}#{}", self.tree, self.node)
    }
}

/// Where a node came from in its source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub file: Arc<Path>,
    /// 1-based.
    pub line: usize,
    /// 1-based.
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: &'static str,
    /// Source text for leaves; a discriminating keyword for the few interior
    /// kinds that need one (switch labels); empty otherwise.
    pub label: String,
    pub role: Role,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub position: Option<Position>,
    /// Synthesized by the parser, not present in the source text.
    pub implicit: bool,
}

impl NodeData {
    pub fn new(kind: &'static str, label: impl Into<String>, role: Role) -> Self {
        Self {
            kind,
            label: label.into(),
            role,
            parent: None,
            children: Vec::new(),
            position: None,
            implicit: false,
        }
    }

    pub fn with_position(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }

    pub fn implicit(mut self, implicit: bool) -> Self {
        self.implicit = implicit;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// One parsed source file. `declared_types` is a second, ordered view of the
/// top-level types that the package root also owns as children.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub file: Option<Arc<Path>>,
    pub declared_types: Vec<NodeId>,
}

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("model should have exactly 1 compilation unit, but has {0}")]
    CompilationUnitCount(usize),
    #[error("node {0} is not attached to a parent")]
    Detached(NodeId),
    #[error("node {0} is already attached to a parent")]
    Attached(NodeId),
    #[error("index {index} out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },
}

#[derive(Debug)]
pub struct Tree {
    id: TreeId,
    nodes: Vec<NodeData>,
    root: NodeId,
    units: Vec<CompilationUnit>,
}

impl Tree {
    /// Create a tree holding only a package root.
    pub fn new() -> Self {
        let root = NodeData::new(PACKAGE_KIND, "", Role::Root);
        Self {
            id: fresh_tree_id(),
            nodes: vec![root],
            root: 0,
            units: Vec::new(),
        }
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[self.root].children.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id]
    }

    pub fn node_ref(&self, id: NodeId) -> NodeRef {
        NodeRef {
            tree: self.id,
            node: id,
        }
    }

    /// Whether `node` addresses a node of this tree.
    pub fn owns(&self, node: NodeRef) -> bool {
        node.tree == self.id && node.node < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> &'static str {
        self.nodes[id].kind
    }

    pub fn label(&self, id: NodeId) -> &str {
        &self.nodes[id].label
    }

    pub fn role(&self, id: NodeId) -> Role {
        self.nodes[id].role
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn is_implicit(&self, id: NodeId) -> bool {
        self.nodes[id].implicit
    }

    pub fn position(&self, id: NodeId) -> Option<&Position> {
        self.nodes[id].position.as_ref()
    }

    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) {
        self.nodes[id].label = label.into();
    }

    pub fn units(&self) -> &[CompilationUnit] {
        &self.units
    }

    pub fn add_unit(&mut self, unit: CompilationUnit) {
        self.units.push(unit);
    }

    pub fn only_unit(&self) -> Result<&CompilationUnit, TreeError> {
        match self.units.as_slice() {
            [unit] => Ok(unit),
            units => Err(TreeError::CompilationUnitCount(units.len())),
        }
    }

    pub fn only_unit_mut(&mut self) -> Result<&mut CompilationUnit, TreeError> {
        match self.units.as_mut_slice() {
            [unit] => Ok(unit),
            units => Err(TreeError::CompilationUnitCount(units.len())),
        }
    }

    /// Add a detached node to the arena.
    pub fn add_node(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            ..data
        });
        id
    }

    /// Add a node as the last child of `parent`.
    pub fn push_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.add_node(data);
        self.nodes[id].parent = Some(parent);
        self.nodes[parent].children.push(id);
        id
    }

    /// Children of `parent` that play `role`, in order.
    pub fn children_with_role(&self, parent: NodeId, role: Role) -> Vec<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .filter(|&c| self.nodes[c].role == role)
            .collect()
    }

    /// Position of `child` in its parent's children.
    pub fn child_position(&self, child: NodeId) -> Option<usize> {
        let parent = self.nodes[child].parent?;
        self.nodes[parent].children.iter().position(|&c| c == child)
    }

    /// The identifier of a declaration, if it has one.
    pub fn simple_name(&self, id: NodeId) -> Option<&str> {
        self.children_with_role(id, Role::Slot(Slot::Name))
            .first()
            .map(|&n| self.label(n))
    }

    pub fn name_node(&self, id: NodeId) -> Option<NodeId> {
        self.children_with_role(id, Role::Slot(Slot::Name))
            .first()
            .copied()
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes[node].parent;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.nodes[p].parent;
        }
        false
    }

    /// Whether `node` is reachable from the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        node == self.root || self.is_ancestor(self.root, node)
    }

    /// Pre-order traversal of the subtree under `from`.
    pub fn depth_first(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }

    /// Level-order traversal of the subtree under `from`.
    pub fn breadth_first(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([from]);
        while let Some(id) = queue.pop_front() {
            out.push(id);
            queue.extend(self.nodes[id].children.iter().copied());
        }
        out
    }

    /// Unlink `id` from its parent (and from the compilation unit view when it
    /// is a top-level type).
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.nodes[id].parent.ok_or(TreeError::Detached(id))?;
        self.nodes[parent].children.retain(|&c| c != id);
        self.nodes[id].parent = None;
        if self.nodes[id].role == Role::ContainedType {
            for unit in &mut self.units {
                unit.declared_types.retain(|&t| t != id);
            }
        }
        Ok(())
    }

    /// Link the detached node `child` under `parent` at `index`.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        if self.nodes[child].parent.is_some() {
            return Err(TreeError::Attached(child));
        }
        let len = self.nodes[parent].children.len();
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        self.nodes[parent].children.insert(index, child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let len = self.nodes[parent].children.len();
        self.insert_child(parent, len, child)
    }

    /// Put the detached node `new` where `old` is. `new` takes over `old`'s
    /// role; `old` ends up detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        if self.nodes[new].parent.is_some() {
            return Err(TreeError::Attached(new));
        }
        let parent = self.nodes[old].parent.ok_or(TreeError::Detached(old))?;
        let slot = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == old)
            .ok_or(TreeError::Detached(old))?;
        self.nodes[parent].children[slot] = new;
        self.nodes[new].parent = Some(parent);
        self.nodes[new].role = self.nodes[old].role;
        self.nodes[old].parent = None;
        if self.nodes[old].role == Role::ContainedType {
            for unit in &mut self.units {
                for t in unit.declared_types.iter_mut().filter(|t| **t == old) {
                    *t = new;
                }
            }
        }
        Ok(())
    }

    /// Deep-copy the subtree at `id` of `from` into this arena, returning the
    /// detached copy. Every copied pair is recorded in `copies`.
    pub fn graft(&mut self, from: &Tree, id: NodeId, copies: &mut HashMap<NodeId, NodeId>) -> NodeId {
        let source = from.node(id);
        let copy = self.add_node(NodeData {
            kind: source.kind,
            label: source.label.clone(),
            role: source.role,
            parent: None,
            children: Vec::new(),
            position: source.position.clone(),
            implicit: source.implicit,
        });
        copies.insert(id, copy);
        for &child in &source.children {
            let child_copy = self.graft(from, child, copies);
            self.nodes[child_copy].parent = Some(copy);
            self.nodes[copy].children.push(child_copy);
        }
        copy
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
