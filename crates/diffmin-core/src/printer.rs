//! Deterministic pretty-printer.
//!
//! Renders the tree's single compilation unit back to Java source. Layout is
//! normalized (one member or statement per line, fixed indentation), so two
//! trees of the same shape always print identically regardless of how their
//! source files were formatted.

use crate::config::PrinterSettings;
use crate::role::Role;
use crate::tree::{NodeId, Tree, TreeError};

/// Keywords that are followed by a parenthesized clause.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "synchronized", "try", "return", "throw", "case",
    "assert", "yield",
];

/// Keywords that may directly precede a generic parameter list.
const MODIFIER_KEYWORDS: &[&str] = &[
    "public", "protected", "private", "static", "final", "abstract", "synchronized", "native",
    "default", "strictfp",
];

/// Render the only compilation unit of `tree`.
pub fn pretty_print(tree: &Tree, settings: &PrinterSettings) -> Result<String, TreeError> {
    let unit = tree.only_unit()?;
    let root = tree.root();
    let mut printer = Printer::new(tree, settings.indent_width);

    let header: Vec<NodeId> = tree
        .children_with_role(root, Role::PackageDeclaration)
        .into_iter()
        .chain(tree.children_with_role(root, Role::Import))
        .collect();
    for &id in &header {
        printer.node(id);
        printer.newline();
    }
    if !header.is_empty() && !unit.declared_types.is_empty() {
        printer.blank_line();
    }
    for (i, &ty) in unit.declared_types.iter().enumerate() {
        if i > 0 {
            printer.blank_line();
        }
        printer.node(ty);
        printer.newline();
    }
    Ok(printer.finish())
}

/// Render one subtree on its own, without a compilation unit around it.
pub fn render_node(tree: &Tree, id: NodeId, settings: &PrinterSettings) -> String {
    let mut printer = Printer::new(tree, settings.indent_width);
    printer.node(id);
    printer.finish().trim_end().to_string()
}

struct Printer<'t> {
    tree: &'t Tree,
    out: String,
    indent_width: usize,
    depth: usize,
    line_start: bool,
    last: Option<Emitted>,
}

/// The previously printed token. `generic` marks the angle brackets of a
/// type argument or type parameter list.
struct Emitted {
    text: String,
    generic: bool,
}

impl<'t> Printer<'t> {
    fn new(tree: &'t Tree, indent_width: usize) -> Self {
        Self {
            tree,
            out: String::new(),
            indent_width,
            depth: 0,
            line_start: true,
            last: None,
        }
    }

    fn finish(self) -> String {
        self.out
    }

    fn token(&mut self, text: &str) {
        self.emit(text, false, true);
    }

    fn angle(&mut self, text: &str) {
        self.emit(text, true, true);
    }

    /// Print `text` glued to the previous token.
    fn attach(&mut self, text: &str) {
        self.emit(text, false, false);
    }

    fn emit(&mut self, text: &str, generic: bool, spaced: bool) {
        if self.line_start {
            self.out.push_str(&" ".repeat(self.depth * self.indent_width));
            self.line_start = false;
        } else if let Some(prev) = &self.last {
            if spaced && needs_space(prev, text, generic) {
                self.out.push(' ');
            }
        }
        self.out.push_str(text);
        self.last = Some(Emitted {
            text: text.to_string(),
            generic,
        });
    }

    fn newline(&mut self) {
        if !self.line_start {
            self.out.push('\n');
            self.line_start = true;
        }
    }

    fn blank_line(&mut self) {
        self.newline();
        self.out.push('\n');
    }

    fn node(&mut self, id: NodeId) {
        let tree = self.tree;
        let children = tree.children(id);
        match tree.kind(id) {
            "class_body" | "interface_body" | "block" | "constructor_body" | "switch_block" => {
                self.braced(children);
            }
            "enum_body" => self.enum_body(id),
            "enum_body_declarations" => {
                self.token(";");
                self.newline();
                for &member in children {
                    self.node(member);
                    self.newline();
                }
            }
            "switch_block_statement_group" => {
                for &label in &tree.children_with_role(id, Role::CaseLabel) {
                    self.node(label);
                    self.attach(":");
                    self.newline();
                }
                self.depth += 1;
                for &stmt in &tree.children_with_role(id, Role::Statement) {
                    self.node(stmt);
                    self.newline();
                }
                self.depth -= 1;
            }
            "switch_label" => {
                if tree.label(id) == "default" {
                    self.token("default");
                } else {
                    self.token("case");
                    self.separated(children, ",");
                }
            }
            "argument_list" | "formal_parameters" => {
                self.token("(");
                self.separated(children, ",");
                self.token(")");
            }
            "type_parameters" => {
                self.angle("<");
                self.separated(children, ",");
                self.angle(">");
            }
            "throws" => {
                self.token("throws");
                self.separated(children, ",");
            }
            _ if children.is_empty() => {
                let text = tree.label(id);
                let in_type_arguments = tree
                    .parent(id)
                    .is_some_and(|parent| tree.kind(parent) == "type_arguments");
                if in_type_arguments && matches!(text, "<" | ">") {
                    self.angle(text);
                } else {
                    self.token(text);
                }
            }
            _ => {
                for &child in children {
                    self.node(child);
                }
            }
        }
    }

    fn braced(&mut self, members: &[NodeId]) {
        self.token("{");
        self.newline();
        self.depth += 1;
        for &member in members {
            self.node(member);
            self.newline();
        }
        self.depth -= 1;
        self.token("}");
    }

    fn enum_body(&mut self, id: NodeId) {
        let tree = self.tree;
        let constants = tree.children_with_role(id, Role::TypeMember);
        self.token("{");
        self.newline();
        self.depth += 1;
        for (i, &constant) in constants.iter().enumerate() {
            if i > 0 {
                self.token(",");
                self.newline();
            }
            self.node(constant);
        }
        for &rest in tree
            .children(id)
            .iter()
            .filter(|&&c| tree.role(c) != Role::TypeMember)
        {
            self.node(rest);
        }
        self.newline();
        self.depth -= 1;
        self.token("}");
    }

    fn separated(&mut self, items: &[NodeId], separator: &str) {
        for (i, &item) in items.iter().enumerate() {
            if i > 0 {
                self.token(separator);
            }
            self.node(item);
        }
    }
}

fn needs_space(prev: &Emitted, next: &str, next_generic: bool) -> bool {
    let text = prev.text.as_str();
    if next_generic {
        return next == "<"
            && (MODIFIER_KEYWORDS.contains(&text) || (!is_word(text) && !prev.generic));
    }
    if prev.generic {
        return text == ">" && !matches!(next, "(" | ")" | "," | "." | ";" | "[" | "::");
    }
    if matches!(next, "," | ";" | ")" | "]" | "." | "::") {
        return false;
    }
    if matches!(next, "++" | "--") && is_word(text) {
        return false;
    }
    if matches!(text, "(" | "[" | "." | "@" | "::" | "!" | "~") {
        return false;
    }
    if next == "(" || next == "[" {
        return !(is_word(text) && !CONTROL_KEYWORDS.contains(&text)) && text != ")" && text != "]";
    }
    true
}

fn is_word(token: &str) -> bool {
    token
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;

    fn print(src: &str) -> String {
        let tree = parse_source(src, Path::new("T.java")).unwrap();
        pretty_print(&tree, &PrinterSettings::default()).unwrap()
    }

    #[test]
    fn test_layout_is_normalized() {
        let compact = print("class C { void f(){ System.out.println(1); } }");
        let spread = print("class C\n{\n\n  void f ( )\n  {\n System.out.println( 1 ) ;\n }\n}\n");
        assert_eq!(compact, spread);
        assert_eq!(
            compact,
            "class C {\n    void f() {\n        System.out.println(1);\n    }\n}\n"
        );
    }

    #[test]
    fn test_header_and_types() {
        let out = print("package a.b;\nimport java.util.List;\nclass A {}\nclass B {}");
        assert_eq!(
            out,
            "package a.b;\nimport java.util.List;\n\nclass A {\n}\n\nclass B {\n}\n"
        );
    }

    #[test]
    fn test_lists_and_generics() {
        let out = print("class C<T, U> { <R> R g(List<T> a, int b) throws A, B { return h(a, b); } }");
        assert!(out.starts_with("class C<T, U> {\n"), "{out}");
        assert!(out.contains("<R> R g(List<T> a, int b) throws A, B {"), "{out}");
        assert!(out.contains("return h(a, b);"), "{out}");
    }

    #[test]
    fn test_switch_groups() {
        let out = print("class C { void f(int x) { switch (x) { case 1, 2: g(); break; default: h(); } } }");
        assert!(out.contains("switch (x) {\n"), "{out}");
        assert!(out.contains("case 1, 2:\n"), "{out}");
        assert!(out.contains("default:\n"), "{out}");
    }

    #[test]
    fn test_angle_brackets_versus_comparisons() {
        let out = print(
            "class C { public <T> void f() { Map<String, List<T>> m = new HashMap<>(); if (a < b) { i++; } } }",
        );
        assert!(out.contains("public <T> void f() {"), "{out}");
        assert!(out.contains("Map<String, List<T>> m = new HashMap<>();"), "{out}");
        assert!(out.contains("if (a < b) {"), "{out}");
        assert!(out.contains("i++;"), "{out}");
    }

    #[test]
    fn test_empty_file_prints_nothing() {
        assert_eq!(print(""), "");
    }

    #[test]
    fn test_requires_single_unit() {
        let tree = Tree::new();
        assert!(matches!(
            pretty_print(&tree, &PrinterSettings::default()),
            Err(TreeError::CompilationUnitCount(0))
        ));
    }
}
