//! Patches: resolved, ready-to-apply mutations.
//!
//! Source-side nodes are addressed by [`StructuralPath`], so a patch set can
//! be replayed against any tree with the shape of the source tree.
//! Destination-side nodes (what gets inserted or swapped in) are ids into the
//! destination tree the set borrows.

mod apply;
mod generate;

use std::collections::HashSet;

use crate::diff::OperationKind;
use crate::mapping::MappingError;
use crate::path::StructuralPath;
use crate::role::{Role, RoleError};
use crate::tree::{NodeId, NodeRef, Tree, TreeError};

pub use apply::{apply, Stage};
pub use generate::generate;

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error(transparent)]
    Role(#[from] RoleError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("{0} operation without a destination node")]
    MissingDestination(OperationKind),
    #[error("{node} does not belong to the {expected} tree")]
    ForeignNode { node: NodeRef, expected: &'static str },
    #[error("no node at {0} in the tree being patched")]
    Unresolved(StructuralPath),
    #[error("parent {0} of an inserted node has no correspondent and was not inserted")]
    UnmappedParent(NodeId),
    #[error("anchor {0} was not inserted before its dependents")]
    UnresolvedAnchor(NodeId),
    #[error("no insertion semantics for role {0}")]
    UnsupportedRole(Role),
    #[error("insert with collection role {0} carries no index")]
    MissingIndex(Role),
    #[error("anchor is not a child of the insertion parent")]
    AnchorNotInParent,
}

/// Where an inserted node goes: a node of the tree being patched, or a
/// destination node that an earlier insertion of the same run materializes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentRef {
    Existing(StructuralPath),
    Inserted(NodeId),
}

/// The sibling an inserted node follows, for roles placed by position rather
/// than by collection index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Anchor {
    Start,
    After(StructuralPath),
    AfterInserted(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletePatch {
    pub target: StructuralPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdatePatch {
    pub target: StructuralPath,
    /// Destination node whose copy replaces the target.
    pub replacement: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InsertPatch {
    /// Position in the role collection; `None` for non-collection roles.
    pub index: Option<usize>,
    /// Destination node to copy in.
    pub node: NodeId,
    pub role: Role,
    pub parent: ParentRef,
    pub anchor: Anchor,
}

/// Always applied as its delete half, then its insert half.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MovePatch {
    pub delete: DeletePatch,
    pub insert: InsertPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Patch {
    Delete(DeletePatch),
    Update(UpdatePatch),
    Insert(InsertPatch),
    Move(MovePatch),
}

impl Patch {
    pub fn kind(&self) -> OperationKind {
        match self {
            Patch::Delete(_) => OperationKind::Delete,
            Patch::Update(_) => OperationKind::Update,
            Patch::Insert(_) => OperationKind::Insert,
            Patch::Move(_) => OperationKind::Move,
        }
    }
}

/// A duplicate-free collection of patches against one destination tree.
/// Iteration follows insertion order.
#[derive(Debug, Clone)]
pub struct PatchSet<'a> {
    destination: &'a Tree,
    patches: Vec<Patch>,
    seen: HashSet<Patch>,
}

impl<'a> PatchSet<'a> {
    pub fn new(destination: &'a Tree) -> Self {
        Self {
            destination,
            patches: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Add `patch`; returns false when an equal patch is already present.
    pub fn insert(&mut self, patch: Patch) -> bool {
        if !self.seen.insert(patch.clone()) {
            return false;
        }
        self.patches.push(patch);
        true
    }

    pub fn destination(&self) -> &'a Tree {
        self.destination
    }

    pub fn iter(&self) -> impl Iterator<Item = &Patch> {
        self.patches.iter()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn deletes(&self) -> impl Iterator<Item = &DeletePatch> {
        self.patches.iter().filter_map(|p| match p {
            Patch::Delete(d) => Some(d),
            _ => None,
        })
    }

    pub fn updates(&self) -> impl Iterator<Item = &UpdatePatch> {
        self.patches.iter().filter_map(|p| match p {
            Patch::Update(u) => Some(u),
            _ => None,
        })
    }

    pub fn inserts(&self) -> impl Iterator<Item = &InsertPatch> {
        self.patches.iter().filter_map(|p| match p {
            Patch::Insert(i) => Some(i),
            _ => None,
        })
    }

    pub fn moves(&self) -> impl Iterator<Item = &MovePatch> {
        self.patches.iter().filter_map(|p| match p {
            Patch::Move(m) => Some(m),
            _ => None,
        })
    }
}

impl PartialEq for PatchSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.destination.id() == other.destination.id() && self.seen == other.seen
    }
}

impl Eq for PatchSet<'_> {}
