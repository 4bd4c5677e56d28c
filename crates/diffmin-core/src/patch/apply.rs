use std::collections::HashMap;
use std::fmt;

use crate::parser::is_type_declaration;
use crate::path::StructuralPath;
use crate::role::Role;
use crate::tree::{NodeId, Tree};

use super::{Anchor, InsertPatch, ParentRef, Patch, PatchError, PatchSet};

/// Progress of one application run. Stages are entered strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Built,
    DeletionsApplied,
    UpdatesApplied,
    InsertionsApplied,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Built => "built",
            Stage::DeletionsApplied => "deletions-applied",
            Stage::UpdatesApplied => "updates-applied",
            Stage::InsertionsApplied => "insertions-applied",
            Stage::Done => "done",
        })
    }
}

/// Mutate `tree` in place: deletions, then updates, then insertions and
/// moves. A failure leaves earlier stages applied.
pub fn apply(tree: &mut Tree, patches: &PatchSet<'_>) -> Result<(), PatchError> {
    let mut run = Run::build(tree, patches)?;
    run.enter(Stage::Built);
    run.delete()?;
    run.enter(Stage::DeletionsApplied);
    run.update()?;
    run.enter(Stage::UpdatesApplied);
    run.insert()?;
    run.enter(Stage::InsertionsApplied);
    run.enter(Stage::Done);
    Ok(())
}

enum Placement {
    Insert(ResolvedInsert),
    Move { delete: NodeId, insert: ResolvedInsert },
}

struct ResolvedInsert {
    patch: InsertPatch,
    parent: Option<NodeId>,
    anchor: Option<NodeId>,
}

struct Run<'t, 'p> {
    tree: &'t mut Tree,
    destination: &'p Tree,
    stage: Stage,
    deletes: Vec<NodeId>,
    updates: Vec<(NodeId, NodeId)>,
    placements: Vec<Placement>,
    /// Destination node -> its copy in the tree being patched.
    clones: HashMap<NodeId, NodeId>,
}

impl<'t, 'p> Run<'t, 'p> {
    /// Resolve every structural path before anything moves.
    fn build(tree: &'t mut Tree, patches: &PatchSet<'p>) -> Result<Self, PatchError> {
        let resolve = |tree: &Tree, path: &StructuralPath| {
            path.resolve(tree)
                .ok_or_else(|| PatchError::Unresolved(path.clone()))
        };
        let resolve_insert = |tree: &Tree, patch: &InsertPatch| -> Result<ResolvedInsert, PatchError> {
            let parent = match &patch.parent {
                ParentRef::Existing(path) => Some(resolve(tree, path)?),
                ParentRef::Inserted(_) => None,
            };
            let anchor = match &patch.anchor {
                Anchor::After(path) => Some(resolve(tree, path)?),
                Anchor::Start | Anchor::AfterInserted(_) => None,
            };
            Ok(ResolvedInsert {
                patch: patch.clone(),
                parent,
                anchor,
            })
        };

        let view: &Tree = tree;
        let mut deletes = Vec::new();
        let mut updates = Vec::new();
        let mut placements = Vec::new();
        for patch in patches.iter() {
            match patch {
                Patch::Delete(d) => deletes.push(resolve(view, &d.target)?),
                Patch::Update(u) => updates.push((resolve(view, &u.target)?, u.replacement)),
                Patch::Insert(i) => placements.push(Placement::Insert(resolve_insert(view, i)?)),
                Patch::Move(m) => placements.push(Placement::Move {
                    delete: resolve(view, &m.delete.target)?,
                    insert: resolve_insert(view, &m.insert)?,
                }),
            }
        }

        Ok(Self {
            tree,
            destination: patches.destination(),
            stage: Stage::Built,
            deletes,
            updates,
            placements,
            clones: HashMap::new(),
        })
    }

    fn enter(&mut self, stage: Stage) {
        debug_assert!(stage >= self.stage);
        self.stage = stage;
        tracing::info!(%stage, "patch application");
    }

    fn delete(&mut self) -> Result<(), PatchError> {
        for i in 0..self.deletes.len() {
            let node = self.deletes[i];
            if !self.tree.is_attached(node) {
                tracing::debug!(node, "already removed with an ancestor");
                continue;
            }
            tracing::debug!(node, kind = self.tree.kind(node), "delete");
            self.tree.detach(node)?;
        }
        Ok(())
    }

    fn update(&mut self) -> Result<(), PatchError> {
        for i in 0..self.updates.len() {
            let (old, replacement) = self.updates[i];
            if !self.tree.is_attached(old) {
                tracing::debug!(node = old, "update target was removed");
                continue;
            }
            let clone = self.graft(replacement);
            if is_type_declaration(self.tree.kind(old)) {
                self.keep_declared_name(old, clone);
            }
            tracing::debug!(node = old, kind = self.tree.kind(old), "update");
            self.tree.replace(old, clone)?;
        }
        Ok(())
    }

    /// A structural replace must not rename the declaration as a side effect.
    fn keep_declared_name(&mut self, old: NodeId, clone: NodeId) {
        let original = self.tree.simple_name(old).map(str::to_string);
        if let (Some(name), Some(target)) = (original, self.tree.name_node(clone)) {
            self.tree.set_label(target, name);
        }
    }

    /// Remove every moved node first, then place inserts and move targets
    /// together in generation order. Generation follows the destination
    /// tree's preorder, so when a placement computes its index or anchor all
    /// of its earlier destination siblings are already in place.
    fn insert(&mut self) -> Result<(), PatchError> {
        let placements = std::mem::take(&mut self.placements);
        for placement in &placements {
            if let Placement::Move { delete, .. } = placement {
                if self.tree.is_attached(*delete) {
                    tracing::debug!(node = delete, "move: delete half");
                    self.tree.detach(*delete)?;
                }
            }
        }
        for placement in &placements {
            let resolved = match placement {
                Placement::Insert(resolved) => resolved,
                Placement::Move { insert, .. } => insert,
            };
            self.place(resolved)?;
        }
        Ok(())
    }

    fn graft(&mut self, node: NodeId) -> NodeId {
        let mut copies = HashMap::new();
        let clone = self.tree.graft(self.destination, node, &mut copies);
        self.clones.extend(copies);
        clone
    }

    fn place(&mut self, resolved: &ResolvedInsert) -> Result<(), PatchError> {
        let patch = &resolved.patch;
        if self.clones.contains_key(&patch.node) {
            tracing::debug!(node = patch.node, "already inserted with an enclosing node");
            return Ok(());
        }
        let parent = match (resolved.parent, &patch.parent) {
            (Some(parent), _) => parent,
            (None, ParentRef::Inserted(dst_parent)) => *self
                .clones
                .get(dst_parent)
                .ok_or(PatchError::UnmappedParent(*dst_parent))?,
            (None, ParentRef::Existing(path)) => return Err(PatchError::Unresolved(path.clone())),
        };

        let clone = self.graft(patch.node);
        tracing::debug!(
            node = patch.node,
            role = %patch.role,
            index = ?patch.index,
            parent,
            "insert"
        );
        match patch.role {
            Role::Statement
            | Role::Argument
            | Role::TypeMember
            | Role::TypeParameter
            | Role::Parameter
            | Role::Case
            | Role::Annotation
            | Role::Import => self.insert_at_index(parent, clone, resolved)?,
            Role::CaseExpression => {
                if self.tree.children_with_role(parent, Role::CaseExpression).is_empty() {
                    self.tree.append_child(parent, clone)?;
                } else {
                    self.insert_at_index(parent, clone, resolved)?;
                }
            }
            Role::Thrown => self.resync_thrown(parent, patch.node)?,
            Role::ContainedType => {
                self.insert_at_index(parent, clone, resolved)?;
                let unit = self.tree.only_unit_mut()?;
                let index = patch.index.unwrap_or(unit.declared_types.len());
                let index = index.min(unit.declared_types.len());
                unit.declared_types.insert(index, clone);
            }
            Role::Modifier if self.tree.kind(clone) == "modifiers" => {
                let existing = self
                    .tree
                    .children_with_role(parent, Role::Modifier)
                    .into_iter()
                    .find(|&c| self.tree.kind(c) == "modifiers");
                match existing {
                    Some(old) => self.tree.replace(old, clone)?,
                    None => self.insert_at_anchor(parent, clone, resolved)?,
                }
            }
            Role::Modifier
            | Role::PackageDeclaration
            | Role::CaseLabel
            | Role::Slot(_)
            | Role::Child
            | Role::Token => self.set_by_role(parent, clone, resolved)?,
            Role::Root => return Err(PatchError::UnsupportedRole(Role::Root)),
        }
        Ok(())
    }

    /// Splice `clone` in so that it becomes member `index` of its role
    /// collection under `parent`.
    fn insert_at_index(
        &mut self,
        parent: NodeId,
        clone: NodeId,
        resolved: &ResolvedInsert,
    ) -> Result<(), PatchError> {
        let role = resolved.patch.role;
        let index = resolved.patch.index.ok_or(PatchError::MissingIndex(role))?;
        let members = self.tree.children_with_role(parent, role);
        let position = match members.get(index) {
            Some(&next) => self.tree.child_position(next),
            None => members
                .last()
                .and_then(|&last| self.tree.child_position(last))
                .map(|p| p + 1),
        };
        match position {
            Some(position) => self.tree.insert_child(parent, position, clone)?,
            None => self.insert_at_anchor(parent, clone, resolved)?,
        }
        Ok(())
    }

    fn insert_at_anchor(
        &mut self,
        parent: NodeId,
        clone: NodeId,
        resolved: &ResolvedInsert,
    ) -> Result<(), PatchError> {
        let after = match (&resolved.patch.anchor, resolved.anchor) {
            (Anchor::Start, _) => None,
            (Anchor::After(_), Some(anchor)) => Some(anchor),
            (Anchor::AfterInserted(node), _) => Some(
                *self
                    .clones
                    .get(node)
                    .ok_or(PatchError::UnresolvedAnchor(*node))?,
            ),
            (Anchor::After(path), None) => return Err(PatchError::Unresolved(path.clone())),
        };
        let position = match after {
            None => 0,
            Some(anchor) if self.tree.parent(anchor) == Some(parent) => self
                .tree
                .child_position(anchor)
                .map(|p| p + 1)
                .ok_or(PatchError::AnchorNotInParent)?,
            Some(_) => return Err(PatchError::AnchorNotInParent),
        };
        self.tree.insert_child(parent, position, clone)?;
        Ok(())
    }

    /// Single-slot roles replace an occupant; everything else goes after its
    /// anchor.
    fn set_by_role(
        &mut self,
        parent: NodeId,
        clone: NodeId,
        resolved: &ResolvedInsert,
    ) -> Result<(), PatchError> {
        let role = resolved.patch.role;
        if role.is_single_slot() {
            if let Some(&occupant) = self.tree.children_with_role(parent, role).first() {
                self.tree.replace(occupant, clone)?;
                return Ok(());
            }
        }
        self.insert_at_anchor(parent, clone, resolved)
    }

    /// Thrown types are a set: rebuild the whole list from the destination.
    fn resync_thrown(&mut self, parent: NodeId, inserted: NodeId) -> Result<(), PatchError> {
        for old in self.tree.children_with_role(parent, Role::Thrown) {
            self.tree.detach(old)?;
        }
        let Some(source_parent) = self.destination.parent(inserted) else {
            return Ok(());
        };
        let thrown = self
            .destination
            .children_with_role(source_parent, Role::Thrown);
        for node in thrown {
            let copy = match self.clones.get(&node) {
                Some(&copy) if !self.tree.is_attached(copy) => copy,
                _ => self.graft(node),
            };
            self.tree.append_child(parent, copy)?;
        }
        Ok(())
    }
}
