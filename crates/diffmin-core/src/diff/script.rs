//! Edit-script generation from a low-level matching.

use std::collections::HashSet;

use super::lowlevel::{LowId, LowTree};
use super::matcher::{lcs_pairs, Matching};
use super::{Operation, OperationKind};

/// Destination nodes that were matched but no longer sit where their source
/// counterpart did: different parent, different role, or out of order with
/// respect to their matched siblings.
fn moved_nodes(src: &LowTree, dst: &LowTree, matching: &Matching) -> HashSet<LowId> {
    let mut moved = HashSet::new();
    for d in dst.preorder(dst.root()) {
        let Some(dst_parent) = dst.parent(d) else {
            continue;
        };
        let Some(s) = matching.src_of(d) else {
            continue;
        };
        let same_parent = src
            .parent(s)
            .and_then(|p| matching.dst_of(p))
            .is_some_and(|p| p == dst_parent);
        if !same_parent || src.node(s).role != dst.node(d).role {
            moved.insert(d);
        }
    }

    // Among siblings that stayed under the same parent, keep the longest
    // order-preserving run in place; the rest moved.
    for d in dst.preorder(dst.root()) {
        let Some(s) = matching.src_of(d) else {
            continue;
        };
        let stayed: Vec<LowId> = dst
            .children(d)
            .iter()
            .copied()
            .filter(|c| !moved.contains(c) && matching.src_of(*c).is_some())
            .collect();
        if stayed.len() < 2 {
            continue;
        }
        let src_order: Vec<LowId> = src
            .children(s)
            .iter()
            .copied()
            .filter_map(|c| matching.dst_of(c))
            .filter(|c| stayed.contains(c))
            .collect();
        let kept: HashSet<usize> = lcs_pairs(&stayed, &src_order, |a, b| a == b)
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        for (i, &c) in stayed.iter().enumerate() {
            if !kept.contains(&i) {
                moved.insert(c);
            }
        }
    }
    moved
}

/// Whether an ancestor of `node` is copied over wholesale (inserted, moved
/// or updated), which brings `node` along with it.
fn inside_copied_subtree(
    dst: &LowTree,
    matching: &Matching,
    copied: &HashSet<LowId>,
    node: LowId,
) -> bool {
    let mut current = dst.parent(node);
    while let Some(p) = current {
        if matching.src_of(p).is_none() || copied.contains(&p) {
            return true;
        }
        current = dst.parent(p);
    }
    false
}

/// Root operations turning `src` into `dst`: deletions in source order, then
/// moves, updates and insertions in destination order.
pub fn edit_script(src: &LowTree, dst: &LowTree, matching: &Matching) -> Vec<Operation> {
    let moved = moved_nodes(src, dst, matching);
    let updated: HashSet<LowId> = matching
        .pairs()
        .iter()
        .filter(|&&(s, d)| src.node(s).label != dst.node(d).label)
        .map(|&(_, d)| d)
        .collect();
    let copied: HashSet<LowId> = moved.union(&updated).copied().collect();

    let mut operations = Vec::new();

    let mut stack = vec![src.root()];
    while let Some(s) = stack.pop() {
        let delete = match matching.dst_of(s) {
            Some(d) if moved.contains(&d) => inside_copied_subtree(dst, matching, &copied, d),
            Some(d) if updated.contains(&d) => false,
            Some(_) => {
                stack.extend(src.children(s).iter().rev().copied());
                continue;
            }
            None => true,
        };
        if let (true, Some(origin)) = (delete, src.node(s).origin) {
            operations.push(Operation {
                kind: OperationKind::Delete,
                src_node: origin,
                dst_node: None,
            });
        }
    }

    let mut stack = vec![dst.root()];
    while let Some(d) = stack.pop() {
        let Some(origin) = dst.node(d).origin else {
            stack.extend(dst.children(d).iter().rev().copied());
            continue;
        };
        let counterpart = matching.src_of(d).and_then(|s| src.node(s).origin);
        let kind = match counterpart {
            None => OperationKind::Insert,
            Some(_) if moved.contains(&d) => OperationKind::Move,
            Some(_) if updated.contains(&d) => OperationKind::Update,
            Some(_) => {
                stack.extend(dst.children(d).iter().rev().copied());
                continue;
            }
        };
        operations.push(match counterpart {
            None => Operation {
                kind,
                src_node: origin,
                dst_node: None,
            },
            Some(source) => Operation {
                kind,
                src_node: source,
                dst_node: Some(origin),
            },
        });
    }
    operations
}
