//! CLI-level golden scenarios, run against the `lox` binary the way
//! `Luvion1-Fax/faxc`'s e2e suite drives its own compiler binary
//! (`examples/Luvion1-Fax/faxc/crates/faxc-drv/tests/e2e/cli_tests.rs`):
//! through `assert_cmd`, writing each source to a temp file rather than
//! feeding stdin, since `lox <path>` is the non-interactive entry point.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn lox_file(source: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".lox")
        .tempfile()
        .expect("failed to create temp file");
    write!(file, "{source}").expect("failed to write temp file");
    file
}

fn run(source: &str) -> assert_cmd::assert::Assert {
    let file = lox_file(source);
    Command::cargo_bin("lox")
        .expect("lox binary should build")
        .arg(file.path())
        .assert()
}

#[test]
fn arithmetic_and_print() {
    run("print 3 + 4 * 2;").success().stdout("11\n");
}

#[test]
fn closures_share_mutable_captured_state() {
    let source = r#"
        fun makeCounter() { var i = 0; fun c() { i = i + 1; print i; } return c; }
        var c = makeCounter(); c(); c();
    "#;
    run(source).success().stdout("1\n2\n");
}

#[test]
fn lexical_scope_resolves_at_definition_site_not_call_site() {
    let source = r#"var a = "global"; { fun f() { print a; } f(); var a = "local"; f(); }"#;
    run(source).success().stdout("global\nglobal\n");
}

#[test]
fn inheritance_with_super_dispatches_to_the_overridden_method_first() {
    let source = r#"
        class A { greet() { print "A"; } }
        class B < A { greet() { super.greet(); print "B"; } }
        B().greet();
    "#;
    run(source).success().stdout("A\nB\n");
}

#[test]
fn initializer_returns_the_constructed_instance() {
    run(r#"class P { init(n) { this.n = n; } } print P(5).n;"#)
        .success()
        .stdout("5\n");
}

#[test]
fn self_referential_initializer_is_a_static_error() {
    run("var a = a;")
        .code(65)
        .stderr(predicate::str::contains("Can't read local variable in its own initializer."));
}

#[test]
fn desugared_for_loop_prints_each_iteration() {
    run("for (var i = 0; i < 3; i = i + 1) print i;")
        .success()
        .stdout("0\n1\n2\n");
}

#[test]
fn for_loop_variable_is_not_visible_after_the_loop() {
    run("for (var i = 0; i < 3; i = i + 1) {} print i;")
        .code(70)
        .stderr(predicate::str::contains("Undefined variable 'i'."));
}

#[test]
fn runtime_error_exits_seventy() {
    run("print 1 + nil;").code(70).stderr(predicate::str::contains("[line 1]"));
}

#[test]
fn extra_command_line_arguments_are_a_usage_error() {
    Command::cargo_bin("lox")
        .unwrap()
        .arg("a.lox")
        .arg("b.lox")
        .assert()
        .code(64)
        .stdout(predicate::str::contains("usage: lox [script]"));
}
