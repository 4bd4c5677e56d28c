//! Tree-sitter Java parser integration.
//!
//! Parses a Java source file with tree-sitter and converts the concrete
//! syntax tree into our arena [`Tree`]. Each converted node gets a [`Role`]
//! describing how it hangs off its parent:
//!
//! - members of list-like kinds (blocks, bodies, argument and parameter
//!   lists, switch blocks, throws clauses, modifier lists) get the matching
//!   collection role, and their punctuation is dropped because the printer
//!   re-synthesizes it;
//! - named tree-sitter fields become [`Role::Slot`]s;
//! - everything else keeps its tokens as [`Role::Token`] leaves.
//!
//! Top-level type declarations are owned by the package root and listed a
//! second time, in file order, in the tree's only [`CompilationUnit`].

use std::path::Path;
use std::sync::Arc;

use crate::role::{Role, Slot};
use crate::tree::{CompilationUnit, NodeData, NodeId, Position, Tree};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(std::path::PathBuf),
    #[error("could not read {}", .path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("language error: {0}")]
    Language(String),
    #[error("parse failed for {}", .0.display())]
    ParseFailed(std::path::PathBuf),
    #[error("syntax error in {} at {line}:{column}", .path.display())]
    Syntax {
        path: std::path::PathBuf,
        line: usize,
        column: usize,
    },
}

/// Read and parse `path` into a tree with exactly one compilation unit.
pub fn build_tree(path: &Path) -> Result<Tree, ParseError> {
    let source = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ParseError::FileNotFound(path.to_path_buf()),
        _ => ParseError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    parse_source(&source, path)
}

/// Parse in-memory source text; `file` is recorded in node positions.
pub fn parse_source(source: &str, file: &Path) -> Result<Tree, ParseError> {
    let mut parser = tree_sitter::Parser::new();
    let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|e| ParseError::Language(e.to_string()))?;

    let cst = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::ParseFailed(file.to_path_buf()))?;
    let root = cst.root_node();
    if let Some(error) = first_error(root) {
        let point = error.start_position();
        return Err(ParseError::Syntax {
            path: file.to_path_buf(),
            line: point.row + 1,
            column: point.column + 1,
        });
    }

    let mut builder = Builder {
        source: source.as_bytes(),
        file: Arc::from(file),
        tree: Tree::new(),
    };
    builder.convert_program(root);
    tracing::debug!(file = %file.display(), nodes = builder.tree.len(), "built tree");
    Ok(builder.tree)
}

fn first_error(node: tree_sitter::Node<'_>) -> Option<tree_sitter::Node<'_>> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Kinds whose text is kept whole instead of being split into tokens.
fn is_atomic(kind: &str) -> bool {
    matches!(kind, "string_literal" | "character_literal" | "text_block")
}

/// Kinds whose delimiters and separators are dropped and re-synthesized.
pub fn is_collection_kind(kind: &str) -> bool {
    matches!(
        kind,
        "class_body"
            | "interface_body"
            | "enum_body"
            | "enum_body_declarations"
            | "block"
            | "constructor_body"
            | "switch_block"
            | "switch_block_statement_group"
            | "switch_label"
            | "argument_list"
            | "formal_parameters"
            | "type_parameters"
            | "throws"
            | "modifiers"
    )
}

pub fn is_type_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration"
    )
}

fn is_annotation(kind: &str) -> bool {
    matches!(kind, "annotation" | "marker_annotation")
}

/// Role of a named child of a collection kind.
fn member_role(parent_kind: &str, child_kind: &str) -> Role {
    match parent_kind {
        "class_body" | "interface_body" | "enum_body_declarations" => Role::TypeMember,
        "enum_body" if child_kind == "enum_body_declarations" => Role::Slot(Slot::Body),
        "enum_body" => Role::TypeMember,
        "block" | "constructor_body" => Role::Statement,
        "switch_block" => Role::Case,
        "switch_block_statement_group" if child_kind == "switch_label" => Role::CaseLabel,
        "switch_block_statement_group" => Role::Statement,
        "switch_label" => Role::CaseExpression,
        "argument_list" => Role::Argument,
        "formal_parameters" => Role::Parameter,
        "type_parameters" => Role::TypeParameter,
        "throws" => Role::Thrown,
        "modifiers" if is_annotation(child_kind) => Role::Annotation,
        "modifiers" => Role::Modifier,
        _ => Role::Child,
    }
}

struct Builder<'s> {
    source: &'s [u8],
    file: Arc<Path>,
    tree: Tree,
}

impl Builder<'_> {
    fn position(&self, node: tree_sitter::Node<'_>) -> Option<Position> {
        let point = node.start_position();
        Some(Position {
            file: self.file.clone(),
            line: point.row + 1,
            column: point.column + 1,
        })
    }

    fn text(&self, node: tree_sitter::Node<'_>) -> String {
        node.utf8_text(self.source).unwrap_or("").to_string()
    }

    fn convert_program(&mut self, program: tree_sitter::Node<'_>) {
        let root = self.tree.root();
        let mut declared_types = Vec::new();
        let mut cursor = program.walk();
        let children: Vec<_> = program.children(&mut cursor).collect();
        for child in children {
            if child.is_extra() || !child.is_named() {
                continue;
            }
            let kind = child.kind();
            let role = if kind == "package_declaration" {
                Role::PackageDeclaration
            } else if kind == "import_declaration" {
                Role::Import
            } else if is_type_declaration(kind) {
                Role::ContainedType
            } else {
                Role::Child
            };
            let id = self.convert(child, root, role);
            if role == Role::ContainedType {
                declared_types.push(id);
            }
        }
        self.tree.add_unit(CompilationUnit {
            file: Some(self.file.clone()),
            declared_types,
        });
    }

    fn convert(&mut self, node: tree_sitter::Node<'_>, parent: NodeId, role: Role) -> NodeId {
        let kind = node.kind();
        let implicit = node.is_missing();

        if node.child_count() == 0 || is_atomic(kind) {
            let label = if implicit {
                kind.to_string()
            } else {
                self.text(node)
            };
            let data = NodeData::new(kind, label, role)
                .with_position(if implicit { None } else { self.position(node) })
                .implicit(implicit);
            return self.tree.push_child(parent, data);
        }

        let mut cursor = node.walk();
        let mut children = Vec::new();
        if cursor.goto_first_child() {
            loop {
                children.push((cursor.node(), cursor.field_name()));
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }

        let collection = is_collection_kind(kind);
        let label = if kind == "switch_label" {
            let is_default = children.iter().any(|(c, _)| c.kind() == "default");
            if is_default { "default" } else { "case" }.to_string()
        } else {
            String::new()
        };
        let data = NodeData::new(kind, label, role)
            .with_position(self.position(node))
            .implicit(implicit);
        let id = self.tree.push_child(parent, data);

        for (child, field) in children {
            if child.is_extra() {
                continue;
            }
            let child_role = if collection {
                if child.is_named() {
                    member_role(kind, child.kind())
                } else if kind == "modifiers" {
                    Role::Modifier
                } else {
                    continue;
                }
            } else if !child.is_named() {
                Role::Token
            } else if child.kind() == "modifiers" {
                Role::Modifier
            } else {
                field
                    .and_then(Slot::from_field)
                    .map(Role::Slot)
                    .unwrap_or(Role::Child)
            };
            self.convert(child, id, child_role);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Tree {
        parse_source(src, Path::new("Test.java")).unwrap()
    }

    fn find(tree: &Tree, kind: &str) -> NodeId {
        tree.depth_first(tree.root())
            .into_iter()
            .find(|&n| tree.kind(n) == kind)
            .unwrap_or_else(|| panic!("no {kind} node"))
    }

    #[test]
    fn test_top_level_types_in_both_views() {
        let tree = parse("import java.util.List;\nclass A {}\ninterface B {}\n");
        let unit = tree.only_unit().unwrap();
        assert_eq!(unit.declared_types.len(), 2);
        let root = tree.root();
        assert_eq!(tree.children_with_role(root, Role::ContainedType), unit.declared_types);
        assert_eq!(tree.children_with_role(root, Role::Import).len(), 1);
        assert_eq!(tree.simple_name(unit.declared_types[1]), Some("B"));
    }

    #[test]
    fn test_block_members_are_statements_without_braces() {
        let tree = parse("class C { void f() { int x = 1; g(x); } }");
        let block = find(&tree, "block");
        let children = tree.children(block);
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|&c| tree.role(c) == Role::Statement));
    }

    #[test]
    fn test_token_preserving_kinds_keep_tokens() {
        let tree = parse("class C { void f() { int x = 1; } }");
        let declarator = find(&tree, "variable_declarator");
        let roles: Vec<Role> = tree.children(declarator).iter().map(|&c| tree.role(c)).collect();
        assert_eq!(
            roles,
            vec![Role::Slot(Slot::Name), Role::Token, Role::Slot(Slot::Value)]
        );
    }

    #[test]
    fn test_modifiers_and_annotations() {
        let tree = parse("class C { @Override public static void f() {} }");
        let modifiers = find(&tree, "modifiers");
        assert_eq!(tree.role(modifiers), Role::Modifier);
        let roles: Vec<Role> = tree.children(modifiers).iter().map(|&c| tree.role(c)).collect();
        assert_eq!(roles, vec![Role::Annotation, Role::Modifier, Role::Modifier]);
    }

    #[test]
    fn test_switch_labels_and_literals() {
        let tree = parse(
            "class C { void f(int x) { switch (x) { case 1, 2: g(\"a b\"); break; default: h(); } } }",
        );
        let labels: Vec<NodeId> = tree
            .depth_first(tree.root())
            .into_iter()
            .filter(|&n| tree.kind(n) == "switch_label")
            .collect();
        assert_eq!(tree.label(labels[0]), "case");
        assert_eq!(tree.children_with_role(labels[0], Role::CaseExpression).len(), 2);
        assert_eq!(tree.label(labels[1]), "default");
        let string = find(&tree, "string_literal");
        assert_eq!(tree.label(string), "\"a b\"");
        assert!(tree.children(string).is_empty());
    }

    #[test]
    fn test_positions_are_one_based() {
        let tree = parse("class C {\n  int x;\n}\n");
        let field = find(&tree, "field_declaration");
        let position = tree.position(field).unwrap();
        assert_eq!((position.line, position.column), (2, 3));
        assert_eq!(&*position.file, Path::new("Test.java"));
    }

    #[test]
    fn test_syntax_error_and_missing_file() {
        assert!(matches!(
            parse_source("class C { ) ) ) }", Path::new("Bad.java")),
            Err(ParseError::Syntax { .. })
        ));
        assert!(matches!(
            build_tree(Path::new("wrong/path/to/prevFile")),
            Err(ParseError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_comments_are_dropped() {
        let tree = parse("class C { // note\n /* block */ int x; }");
        assert!(tree
            .depth_first(tree.root())
            .iter()
            .all(|&n| !tree.kind(n).ends_with("comment")));
    }
}
