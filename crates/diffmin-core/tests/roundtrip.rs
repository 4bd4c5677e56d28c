//! Whole-pipeline runs over files on disk: patching the older file must
//! render exactly like the newer file does.

use std::fs;
use std::path::PathBuf;

use diffmin_core::parser::build_tree;
use diffmin_core::printer::pretty_print;
use diffmin_core::{patch_and_build, patch_and_render, PipelineError, Settings};
use tempfile::TempDir;

struct Pair {
    _dir: TempDir,
    prev: PathBuf,
    new: PathBuf,
}

fn write_pair(prev: &str, new: &str) -> Pair {
    let dir = TempDir::new().unwrap();
    let prev_path = dir.path().join("Prev.java");
    let new_path = dir.path().join("New.java");
    fs::write(&prev_path, prev).unwrap();
    fs::write(&new_path, new).unwrap();
    Pair {
        _dir: dir,
        prev: prev_path,
        new: new_path,
    }
}

fn assert_round_trip(prev: &str, new: &str) {
    let pair = write_pair(prev, new);
    let settings = Settings::default();
    let patched = patch_and_render(&pair.prev, &pair.new, &settings).unwrap();
    let expected = pretty_print(&build_tree(&pair.new).unwrap(), &settings.printer).unwrap();
    assert_eq!(patched, expected);
}

#[test]
fn test_changed_field_type() {
    assert_round_trip("class C { int x; }", "class C { long x; }");
}

#[test]
fn test_added_modifier() {
    assert_round_trip(
        "class C { void f() { g(); } }",
        "class C { public void f() { g(); } }",
    );
}

#[test]
fn test_removed_method() {
    assert_round_trip(
        "class C { void f() { a(); } void g() { b(); } }",
        "class C { void g() { b(); } }",
    );
}

#[test]
fn test_added_import() {
    assert_round_trip(
        "import a.B;\nclass C { B b; }",
        "import a.B;\nimport c.D;\nclass C { B b; }",
    );
}

#[test]
fn test_added_package() {
    assert_round_trip("class C { int x; }", "package p.q;\nclass C { int x; }");
}

#[test]
fn test_renamed_method() {
    assert_round_trip(
        "class C { void run() { go(1); } }",
        "class C { void start() { go(1); } }",
    );
}

#[test]
fn test_swapped_arguments() {
    assert_round_trip(
        "class C { void f() { g(a, b); } }",
        "class C { void f() { g(b, a); } }",
    );
}

#[test]
fn test_if_gains_else_branch() {
    assert_round_trip(
        "class C { void f() { if (x) { a(); } } }",
        "class C { void f() { if (x) { a(); } else { b(); } } }",
    );
}

#[test]
fn test_added_switch_group() {
    assert_round_trip(
        "class C { void f(int x) { switch (x) { case 1: a(); break; } } }",
        "class C { void f(int x) { switch (x) { case 1: a(); break; default: b(); } } }",
    );
}

#[test]
fn test_added_enum_constant() {
    assert_round_trip("enum E { A, B }", "enum E { A, B, C }");
}

#[test]
fn test_second_top_level_type() {
    assert_round_trip("class A { }", "class A { }\nclass B { int y; }");
}

#[test]
fn test_extended_throws_clause() {
    assert_round_trip(
        "class C { void f() throws A { g(); } }",
        "class C { void f() throws A, B { g(); } }",
    );
}

#[test]
fn test_member_removed_and_reordered() {
    assert_round_trip(
        "class C { int a; int b; void f() { g(); } }",
        "class C { void f() { g(); } int a; }",
    );
}

#[test]
fn test_changed_comparison_operator() {
    assert_round_trip(
        "class C { int f(int n) { int s = 0; for (int i = 0; i < n; i++) { s += i; } return s; } }",
        "class C { int f(int n) { int s = 0; for (int i = 0; i <= n; i++) { s += i; } return s; } }",
    );
}

#[test]
fn test_statement_wrapped_in_if() {
    assert_round_trip(
        "class C { void f() { a(1); b(); } }",
        "class C { void f() { if (x) { a(1); } b(); } }",
    );
}

#[test]
fn test_invocation_loses_object() {
    assert_round_trip(
        "class C { void f() { x.y(); } }",
        "class C { void f() { y(); } }",
    );
}

#[test]
fn test_invocation_gains_object() {
    assert_round_trip(
        "class C { void f() { y(); } }",
        "class C { void f() { x.y(); } }",
    );
}

#[test]
fn test_qualified_call_replaced_by_plain_call() {
    assert_round_trip(
        "class C { void f() { System.out.println(1); } }",
        "class C { void f() { a(); } }",
    );
}

#[test]
fn test_wildcard_import_narrowed() {
    assert_round_trip(
        "import java.util.*;\nclass C { }",
        "import java.util.Queue;\nclass C { }",
    );
}

#[test]
fn test_single_import_widened_to_wildcard() {
    assert_round_trip(
        "import java.util.Queue;\nclass C { }",
        "import java.util.*;\nclass C { }",
    );
}

#[test]
fn test_method_body_dropped_for_abstract() {
    assert_round_trip(
        "abstract class C { void f() { } }",
        "abstract class C { abstract void f(); }",
    );
}

#[test]
fn test_abstract_method_gains_body() {
    assert_round_trip(
        "abstract class C { abstract void f(); }",
        "abstract class C { void f() { } }",
    );
}

#[test]
fn test_added_annotation() {
    assert_round_trip(
        "class C { @A void f() { } }",
        "class C { @A @B void f() { } }",
    );
}

#[test]
fn test_added_type_parameter() {
    assert_round_trip("class C<T> { }", "class C<T, U> { }");
}

#[test]
fn test_added_parameter() {
    assert_round_trip(
        "class C { void f(int a) { } }",
        "class C { void f(int a, int b) { } }",
    );
}

#[test]
fn test_added_argument() {
    assert_round_trip(
        "class C { void f() { g(a); } }",
        "class C { void f() { g(a, b); } }",
    );
}

#[test]
fn test_added_case_expression() {
    assert_round_trip(
        "class C { void f(int x) { switch (x) { case 1: a(); } } }",
        "class C { void f(int x) { switch (x) { case 1, 2: a(); } } }",
    );
}

#[test]
fn test_empty_files() {
    assert_round_trip("", "");
}

#[test]
fn test_whole_file_replaced() {
    assert_round_trip("", "package p;\nimport q.R;\nclass A { void f() { } }");
}

#[test]
fn test_patched_tree_keeps_prev_file_origin() {
    let pair = write_pair("class C { int x; }", "class C { int x; int y; }");
    let tree = patch_and_build(&pair.prev, &pair.new, &Settings::default()).unwrap();
    let unit = tree.only_unit().unwrap();
    assert_eq!(unit.file.as_deref(), Some(pair.prev.as_path()));
    assert_eq!(unit.declared_types.len(), 1);
}

#[test]
fn test_missing_prev_file_is_parse_error() {
    let pair = write_pair("class C { }", "class C { }");
    let missing = pair.prev.with_file_name("Gone.java");
    let err = patch_and_render(&missing, &pair.new, &Settings::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Parse(_)), "{err:?}");
}

#[test]
fn test_syntax_error_is_parse_error() {
    let pair = write_pair("class C { ) }", "class C { }");
    let err = patch_and_render(&pair.prev, &pair.new, &Settings::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Parse(_)), "{err:?}");
}
