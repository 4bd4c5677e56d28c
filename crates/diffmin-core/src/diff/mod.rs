//! Low-level tree diff.
//!
//! Produces the raw edit script ({insert, delete, update, move} operations)
//! and the node correspondence table the rest of the engine consumes. Both
//! refer to typed nodes through [`NodeRef`]s; the low-level trees themselves
//! are kept in the [`Correspondence`] so that the resolver can see which
//! pairs have no typed counterpart.

pub mod lowlevel;
pub mod matcher;
mod script;

use std::fmt;

use crate::config::MatchSettings;
use crate::tree::{NodeRef, Tree};

pub use lowlevel::{is_ignored, ListOrdering, LowId, LowNode, LowTree, SYNTHETIC_ROOT_KIND};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Delete,
    Update,
    Move,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Insert => "insert",
            OperationKind::Delete => "delete",
            OperationKind::Update => "update",
            OperationKind::Move => "move",
        })
    }
}

/// One raw edit. For inserts `src_node` is the inserted node of the
/// destination tree; for updates and moves `dst_node` is the counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    pub kind: OperationKind,
    pub src_node: NodeRef,
    pub dst_node: Option<NodeRef>,
}

/// The low-level correspondence table: matched pairs of low-level nodes,
/// including the pair of synthetic roots.
#[derive(Debug, Clone)]
pub struct Correspondence {
    pub src: LowTree,
    pub dst: LowTree,
    pub pairs: Vec<(LowId, LowId)>,
}

#[derive(Debug, Clone)]
pub struct Diff {
    pub operations: Vec<Operation>,
    pub correspondence: Correspondence,
}

/// Compute the edit script from `src` to `dst`.
pub fn diff(src: &Tree, dst: &Tree, settings: &MatchSettings) -> Diff {
    let low_src = LowTree::project(src);
    let low_dst = LowTree::project(dst);
    let matching = matcher::match_trees(&low_src, &low_dst, settings);
    let operations = script::edit_script(&low_src, &low_dst, &matching);
    tracing::info!(
        operations = operations.len(),
        matched = matching.len(),
        "computed tree diff"
    );
    Diff {
        operations,
        correspondence: Correspondence {
            pairs: matching.pairs().to_vec(),
            src: low_src,
            dst: low_dst,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;

    fn run(prev: &str, new: &str) -> (Tree, Tree, Diff) {
        let src = parse_source(prev, Path::new("Prev.java")).unwrap();
        let dst = parse_source(new, Path::new("New.java")).unwrap();
        let diff = diff(&src, &dst, &MatchSettings::default());
        (src, dst, diff)
    }

    fn kinds(diff: &Diff) -> Vec<OperationKind> {
        diff.operations.iter().map(|op| op.kind).collect()
    }

    #[test]
    fn test_identical_sources_have_no_operations() {
        let (_, _, diff) = run("class C { int x; }", "class C {\n  int x;\n}");
        assert!(diff.operations.is_empty());
        assert_eq!(diff.correspondence.pairs[0], (0, 0));
    }

    #[test]
    fn test_literal_edit_is_single_update() {
        let (src, dst, diff) = run(
            "class C { void f(){ System.out.println(1); } }",
            "class C { void f(){ System.out.println(2); } }",
        );
        assert_eq!(kinds(&diff), vec![OperationKind::Update]);
        let op = diff.operations[0];
        assert_eq!(src.label(op.src_node.node), "1");
        assert_eq!(dst.label(op.dst_node.unwrap().node), "2");
    }

    #[test]
    fn test_added_statement_is_single_insert() {
        let (_, dst, diff) = run(
            "class C { void f(){ int x = 1; System.out.println(x); } }",
            "class C { void f(){ int x = 1; int y = 2; System.out.println(x); } }",
        );
        assert_eq!(kinds(&diff), vec![OperationKind::Insert]);
        let inserted = diff.operations[0].src_node;
        assert!(dst.owns(inserted));
        assert_eq!(dst.kind(inserted.node), "local_variable_declaration");
    }

    #[test]
    fn test_removed_statements_are_root_deletes() {
        let (src, _, diff) = run(
            "class C { void f(){ int x=1; int y=2; } }",
            "class C { void f(){} }",
        );
        assert_eq!(kinds(&diff), vec![OperationKind::Delete, OperationKind::Delete]);
        assert!(diff
            .operations
            .iter()
            .all(|op| src.kind(op.src_node.node) == "local_variable_declaration"));
    }

    #[test]
    fn test_reordered_statement_is_single_move() {
        let (src, _, diff) = run(
            "class C { void f(){ a(1); b(2); c(3); } }",
            "class C { void f(){ b(2); c(3); a(1); } }",
        );
        assert_eq!(kinds(&diff), vec![OperationKind::Move]);
        let moved = diff.operations[0].src_node.node;
        assert_eq!(src.kind(moved), "expression_statement");
        assert!(diff.operations[0].dst_node.is_some());
    }

    #[test]
    fn test_statement_wrapped_into_new_block() {
        let (src, dst, diff) = run(
            "class C { void f(){ a(1); b(); } }",
            "class C { void f(){ if (x) { a(1); } b(); } }",
        );
        assert_eq!(kinds(&diff), vec![OperationKind::Delete, OperationKind::Insert]);
        assert_eq!(src.kind(diff.operations[0].src_node.node), "expression_statement");
        assert_eq!(dst.kind(diff.operations[1].src_node.node), "if_statement");
    }

    #[test]
    fn test_dropped_object_takes_its_dot_along() {
        let (src, _, diff) = run(
            "class C { void f(){ x.y(); } }",
            "class C { void f(){ y(); } }",
        );
        assert_eq!(kinds(&diff), vec![OperationKind::Delete, OperationKind::Delete]);
        let labels: Vec<&str> = diff.operations.iter().map(|op| src.label(op.src_node.node)).collect();
        assert_eq!(labels, vec!["x", "."]);
    }

    #[test]
    fn test_new_top_level_type_is_insert() {
        let (_, dst, diff) = run("", "class A { }");
        assert_eq!(kinds(&diff), vec![OperationKind::Insert]);
        assert_eq!(dst.kind(diff.operations[0].src_node.node), "class_declaration");
    }
}
