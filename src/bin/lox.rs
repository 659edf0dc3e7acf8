//! The CLI entry point (spec.md §6). Hand-rolled argv handling rather than
//! `clap` — the derive macro's generated `--help`/usage text doesn't line up
//! with the exact `usage: lox [script]` / exit-code contract the spec
//! treats as an external interface, so this mirrors `golox`'s tiny
//! `cmd/golox/main.go` more closely than the teacher's own `bin/why.rs`.

use std::io::{self, BufRead, Write};

use rlox::Lox;

fn main() {
    simple_logger::init_with_level(log::Level::Warn).unwrap();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => run_prompt(),
        [path] => run_file(path),
        _ => {
            println!("usage: lox [script]");
            std::process::exit(64);
        }
    }
}

fn run_file(path: &str) {
    let source = std::fs::read_to_string(path).unwrap_or_else(|err| {
        eprintln!("failed to read '{path}': {err}");
        std::process::exit(74);
    });

    let mut lox = Lox::new();
    lox.run(&source);

    if lox.had_error() {
        std::process::exit(65);
    }
    if lox.had_runtime_error() {
        std::process::exit(70);
    }
}

fn run_prompt() {
    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().ok();

        match lines.next() {
            Some(Ok(line)) => {
                lox.run(&line);
                lox.reset();
            }
            _ => {
                println!();
                return;
            }
        }
    }
}
