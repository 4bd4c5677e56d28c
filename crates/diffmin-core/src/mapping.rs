//! Correspondence resolver.
//!
//! Turns the low-level correspondence table into a bidirectional mapping
//! between typed nodes of the source and destination trees, then closes it
//! under sibling alignment so that nodes the matcher never saw (implicit
//! nodes, fixed punctuation) are paired too.

use std::collections::HashMap;

use crate::diff::{is_ignored, Correspondence, SYNTHETIC_ROOT_KIND};
use crate::tree::{NodeId, NodeRef, Tree};

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("low-level pair has a typed node on one side only ({0})")]
    OneSided(NodeRef),
    #[error("low-level pair of {src_kind}/{dst_kind} has no typed node on either side")]
    Unbacked {
        src_kind: &'static str,
        dst_kind: &'static str,
    },
    #[error("{node} is proposed for both {existing} and {proposed}")]
    Conflict {
        node: NodeRef,
        existing: NodeRef,
        proposed: NodeRef,
    },
    #[error("{node} does not belong to the trees being mapped")]
    ForeignNode { node: NodeRef },
    #[error("{0} has no mapped counterpart")]
    NotMapped(NodeRef),
}

#[derive(Debug, Default, Clone)]
pub struct Mapping {
    src_to_dst: HashMap<NodeRef, NodeRef>,
    dst_to_src: HashMap<NodeRef, NodeRef>,
}

impl Mapping {
    /// Seed from `correspondence` and close under sibling alignment.
    pub fn resolve(
        correspondence: &Correspondence,
        src: &Tree,
        dst: &Tree,
    ) -> Result<Self, MappingError> {
        let mut mapping = Mapping::default();
        let mut confirmed = Vec::new();

        for &(s, d) in &correspondence.pairs {
            let src_node = correspondence.src.node(s);
            let dst_node = correspondence.dst.node(d);
            match (src_node.origin, dst_node.origin) {
                (Some(a), Some(b)) => {
                    if !src.owns(a) {
                        return Err(MappingError::ForeignNode { node: a });
                    }
                    if !dst.owns(b) {
                        return Err(MappingError::ForeignNode { node: b });
                    }
                    if mapping.put(a, b)? {
                        confirmed.push((a.node, b.node));
                    }
                }
                (None, None)
                    if src_node.kind == SYNTHETIC_ROOT_KIND
                        && dst_node.kind == SYNTHETIC_ROOT_KIND => {}
                (None, None) => {
                    return Err(MappingError::Unbacked {
                        src_kind: src_node.kind,
                        dst_kind: dst_node.kind,
                    })
                }
                (Some(node), None) | (None, Some(node)) => {
                    return Err(MappingError::OneSided(node))
                }
            }
        }
        let seeded = mapping.len();

        while !confirmed.is_empty() {
            let mut fresh = Vec::new();
            for (s, d) in confirmed {
                mapping.align_children(src, dst, s, d, &mut fresh)?;
            }
            confirmed = fresh;
        }

        tracing::debug!(seeded, inferred = mapping.len() - seeded, "resolved mapping");
        Ok(mapping)
    }

    /// Pair unmapped ignored children of `s` and `d` in lockstep.
    fn align_children(
        &mut self,
        src: &Tree,
        dst: &Tree,
        s: NodeId,
        d: NodeId,
        fresh: &mut Vec<(NodeId, NodeId)>,
    ) -> Result<(), MappingError> {
        let src_children = src.children(s);
        let dst_children = dst.children(d);
        let skip = |tree: &Tree, mapped: &HashMap<NodeRef, NodeRef>, id: NodeId| {
            mapped.contains_key(&tree.node_ref(id)) || !is_ignored(tree, id)
        };

        let (mut i, mut j) = (0, 0);
        while i < src_children.len() && j < dst_children.len() {
            if skip(src, &self.src_to_dst, src_children[i]) {
                i += 1;
            } else if skip(dst, &self.dst_to_src, dst_children[j]) {
                j += 1;
            } else {
                let (cs, cd) = (src_children[i], dst_children[j]);
                if self.put(src.node_ref(cs), dst.node_ref(cd))? {
                    fresh.push((cs, cd));
                }
                i += 1;
                j += 1;
            }
        }
        Ok(())
    }

    /// Record `src <-> dst`. Returns false when the pair was already known.
    fn put(&mut self, src: NodeRef, dst: NodeRef) -> Result<bool, MappingError> {
        if let Some(&existing) = self.src_to_dst.get(&src) {
            if existing == dst {
                return Ok(false);
            }
            return Err(MappingError::Conflict {
                node: src,
                existing,
                proposed: dst,
            });
        }
        if let Some(&existing) = self.dst_to_src.get(&dst) {
            return Err(MappingError::Conflict {
                node: dst,
                existing,
                proposed: src,
            });
        }
        self.src_to_dst.insert(src, dst);
        self.dst_to_src.insert(dst, src);
        Ok(true)
    }

    /// The counterpart of `node`, looked up in both directions.
    pub fn get(&self, node: NodeRef) -> Result<NodeRef, MappingError> {
        self.src_to_dst
            .get(&node)
            .or_else(|| self.dst_to_src.get(&node))
            .copied()
            .ok_or(MappingError::NotMapped(node))
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.src_to_dst.contains_key(&node) || self.dst_to_src.contains_key(&node)
    }

    /// Number of mapped pairs.
    pub fn len(&self) -> usize {
        self.src_to_dst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src_to_dst.is_empty()
    }

    /// Source/destination pairs in no particular order.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeRef, NodeRef)> + '_ {
        self.src_to_dst.iter().map(|(&s, &d)| (s, d))
    }
}
