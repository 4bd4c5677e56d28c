//! Structural paths: position-independent node addresses.
//!
//! A path is the sequence of `(role, index)` steps from the package root to a
//! node. Collection roles are indexed by the node's position in its role
//! collection, repeatable roles by their ordinal among same-role siblings, and
//! single-slot roles carry no index.

use std::fmt;

use crate::role::{self, Role, RoleError};
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathStep {
    pub role: Role,
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StructuralPath {
    steps: Vec<PathStep>,
}

impl StructuralPath {
    /// Compute the path of `node` in `tree`.
    pub fn of(tree: &Tree, node: NodeId) -> Result<Self, RoleError> {
        let mut steps = Vec::new();
        let mut current = node;
        while let Some(parent) = tree.parent(current) {
            let role = tree.role(current);
            let index = if role.is_collection() {
                role::index_of(tree, current)?
            } else if role.is_repeatable() {
                tree.children_with_role(parent, role)
                    .iter()
                    .position(|&c| c == current)
            } else {
                None
            };
            steps.push(PathStep { role, index });
            current = parent;
        }
        if current != tree.root() {
            return Err(RoleError::NoParent(current));
        }
        steps.reverse();
        Ok(Self { steps })
    }

    /// Find the node this path addresses in `tree`.
    pub fn resolve(&self, tree: &Tree) -> Option<NodeId> {
        let mut current = tree.root();
        for step in &self.steps {
            let candidates = if step.role == Role::ContainedType {
                tree.only_unit().ok()?.declared_types.clone()
            } else {
                tree.children_with_role(current, step.role)
            };
            current = *candidates.get(step.index.unwrap_or(0))?;
        }
        Some(current)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("/");
        }
        for step in &self.steps {
            match step.index {
                Some(i) => write!(f, "/#{}[{}]", step.role, i)?,
                None => write!(f, "/#{}", step.role)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;

    const SOURCE: &str = "class C { void f() { int x = 1; g(x, 2); } }";

    #[test]
    fn test_path_resolves_in_independent_parse() {
        let first = parse_source(SOURCE, Path::new("A.java")).unwrap();
        let second = parse_source(SOURCE, Path::new("B.java")).unwrap();
        for node in first.depth_first(first.root()) {
            let path = StructuralPath::of(&first, node).unwrap();
            assert_eq!(path.resolve(&first), Some(node), "{path}");
            let other = path.resolve(&second).expect("same shape resolves");
            assert_eq!(second.kind(other), first.kind(node));
            assert_eq!(second.label(other), first.label(node));
        }
    }

    #[test]
    fn test_path_display() {
        let tree = parse_source(SOURCE, Path::new("A.java")).unwrap();
        let class = tree.only_unit().unwrap().declared_types[0];
        let path = StructuralPath::of(&tree, class).unwrap();
        assert_eq!(path.to_string(), "/#contained_type[0]");
        assert_eq!(StructuralPath::default().to_string(), "/");
        assert_eq!(StructuralPath::default().resolve(&tree), Some(tree.root()));
    }

    #[test]
    fn test_detached_node_has_no_path() {
        let mut tree = parse_source(SOURCE, Path::new("A.java")).unwrap();
        let class = tree.only_unit().unwrap().declared_types[0];
        let body = tree.children(class).last().copied().unwrap();
        tree.detach(body).unwrap();
        assert!(StructuralPath::of(&tree, body).is_err());
    }
}
