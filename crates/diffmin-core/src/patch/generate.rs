use std::collections::HashSet;

use crate::diff::{Operation, OperationKind};
use crate::mapping::{Mapping, MappingError};
use crate::path::StructuralPath;
use crate::role::{self, RoleError};
use crate::tree::{NodeId, NodeRef, Tree};

use super::{
    Anchor, DeletePatch, InsertPatch, MovePatch, ParentRef, Patch, PatchError, PatchSet, UpdatePatch,
};

/// Turn raw operations into a patch set against `src`, drawing inserted and
/// replacement content from `dst`.
pub fn generate<'a>(
    operations: &[Operation],
    mapping: &Mapping,
    src: &Tree,
    dst: &'a Tree,
) -> Result<PatchSet<'a>, PatchError> {
    for op in operations {
        check_ownership(op, src, dst)?;
    }

    let operations = root_operations(operations, src);
    let generator = Generator {
        mapping,
        src,
        dst,
        replaced: operations
            .iter()
            .filter_map(|op| match op.kind {
                OperationKind::Insert => Some(op.src_node.node),
                _ => op.dst_node.map(|n| n.node),
            })
            .collect(),
    };

    let mut patches = PatchSet::new(dst);
    for op in &operations {
        if is_implicit(op, src, dst) {
            tracing::debug!(kind = %op.kind, node = %op.src_node, "skipping implicit node");
            continue;
        }
        let patch = generator.patch_for(op)?;
        if !patches.insert(patch) {
            tracing::debug!(kind = %op.kind, node = %op.src_node, "duplicate operation collapsed");
        }
    }
    tracing::info!(
        operations = operations.len(),
        patches = patches.len(),
        "generated patches"
    );
    Ok(patches)
}

fn check_ownership(op: &Operation, src: &Tree, dst: &Tree) -> Result<(), PatchError> {
    let (node, tree, expected) = match op.kind {
        OperationKind::Insert => (op.src_node, dst, "destination"),
        _ => (op.src_node, src, "source"),
    };
    if !tree.owns(node) {
        return Err(PatchError::ForeignNode { node, expected });
    }
    match (op.kind, op.dst_node) {
        (OperationKind::Update | OperationKind::Move, None) => {
            Err(PatchError::MissingDestination(op.kind))
        }
        (_, Some(node)) if !dst.owns(node) => Err(PatchError::ForeignNode {
            node,
            expected: "destination",
        }),
        _ => Ok(()),
    }
}

/// Drop updates nested inside another update's source subtree.
fn root_operations(operations: &[Operation], src: &Tree) -> Vec<Operation> {
    let updated: HashSet<NodeId> = operations
        .iter()
        .filter(|op| op.kind == OperationKind::Update)
        .map(|op| op.src_node.node)
        .collect();
    operations
        .iter()
        .filter(|op| {
            let nested = op.kind == OperationKind::Update
                && updated
                    .iter()
                    .any(|&other| src.is_ancestor(other, op.src_node.node));
            if nested {
                tracing::debug!(node = %op.src_node, "dropping update subsumed by an ancestor update");
            }
            !nested
        })
        .copied()
        .collect()
}

fn is_implicit(op: &Operation, src: &Tree, dst: &Tree) -> bool {
    let own = match op.kind {
        OperationKind::Insert => dst.is_implicit(op.src_node.node),
        _ => src.is_implicit(op.src_node.node),
    };
    own || op.dst_node.is_some_and(|n| dst.is_implicit(n.node))
}

struct Generator<'m, 't> {
    mapping: &'m Mapping,
    src: &'t Tree,
    dst: &'t Tree,
    /// Destination nodes an insert, move or update of this run brings in.
    replaced: HashSet<NodeId>,
}

impl Generator<'_, '_> {
    fn patch_for(&self, op: &Operation) -> Result<Patch, PatchError> {
        let patch = match (op.kind, op.dst_node) {
            (OperationKind::Delete, _) => Patch::Delete(self.delete_patch(op.src_node)?),
            (OperationKind::Update, Some(dst_node)) => Patch::Update(UpdatePatch {
                target: StructuralPath::of(self.src, op.src_node.node)?,
                replacement: dst_node.node,
            }),
            (OperationKind::Insert, _) => Patch::Insert(self.insert_patch(op.src_node.node)?),
            (OperationKind::Move, Some(dst_node)) => Patch::Move(MovePatch {
                delete: self.delete_patch(op.src_node)?,
                insert: self.insert_patch(dst_node.node)?,
            }),
            (kind, None) => return Err(PatchError::MissingDestination(kind)),
        };
        tracing::debug!(?patch, "generated");
        Ok(patch)
    }

    fn delete_patch(&self, node: NodeRef) -> Result<DeletePatch, PatchError> {
        Ok(DeletePatch {
            target: StructuralPath::of(self.src, node.node)?,
        })
    }

    fn insert_patch(&self, node: NodeId) -> Result<InsertPatch, PatchError> {
        let index = role::index_of(self.dst, node)?;
        let parent = self.dst.parent(node).ok_or(RoleError::NoParent(node))?;
        let parent = match self.counterpart(parent)? {
            Some(existing) => ParentRef::Existing(StructuralPath::of(self.src, existing)?),
            None => {
                tracing::warn!(
                    parent = %self.dst.node_ref(parent),
                    "inserted node's parent has no correspondent; deferring to an enclosing insert"
                );
                ParentRef::Inserted(parent)
            }
        };
        Ok(InsertPatch {
            index,
            node,
            role: self.dst.role(node),
            parent,
            anchor: self.anchor(node)?,
        })
    }

    /// Nearest preceding sibling with a known place in the patched tree.
    fn anchor(&self, node: NodeId) -> Result<Anchor, PatchError> {
        let Some(parent) = self.dst.parent(node) else {
            return Ok(Anchor::Start);
        };
        let siblings = self.dst.children(parent);
        let before = siblings.iter().position(|&c| c == node).unwrap_or(0);
        for &sibling in siblings[..before].iter().rev() {
            if self.replaced.contains(&sibling) {
                return Ok(Anchor::AfterInserted(sibling));
            }
            if let Some(existing) = self.counterpart(sibling)? {
                return Ok(Anchor::After(StructuralPath::of(self.src, existing)?));
            }
        }
        Ok(Anchor::Start)
    }

    fn counterpart(&self, dst_node: NodeId) -> Result<Option<NodeId>, PatchError> {
        match self.mapping.get(self.dst.node_ref(dst_node)) {
            Ok(found) => Ok(Some(found.node)),
            Err(MappingError::NotMapped(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
