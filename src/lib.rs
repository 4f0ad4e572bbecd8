//! A tree-walk interpreter for Lox, the scripting language from
//! [Crafting Interpreters](https://craftinginterpreters.com/). Lox is
//! dynamically typed and lexically scoped, with first-class functions,
//! closures, and classes with single inheritance.
//!
//! A program passes through four stages:
//!
//! 1. The [`scanner`] turns source text into a flat list of tokens,
//!    reporting stray characters and unterminated strings as it goes.
//! 2. The [`parser`] builds statement and expression trees by recursive
//!    descent, recovering at statement boundaries so several syntax errors
//!    can surface in one run.
//! 3. The [`resolver`] walks the finished trees and computes, for every
//!    local variable reference, how many environments separate the use from
//!    its definition. It also rejects programs that are grammatically fine
//!    but semantically meaningless, like `return` at the top level.
//! 4. The [`interpreter`] executes the trees directly, carrying a chain of
//!    [`environment`]s for lexical scope. Functions capture the environment
//!    where they were declared, which is all it takes for closures and
//!    method binding to work.
//!
//! Nothing runs if any of the first three stages reported an error, so the
//! interpreter can trust the shape of what it is given.

use std::io::Write;
use std::{fs, process};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub mod ast;
pub mod class;
pub mod environment;
pub mod error;
pub mod expr;
pub mod function;
pub mod interpreter;
pub mod literal;
pub mod object;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;

use error::Reporter;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// The driver: owns the interpreter, the diagnostic sink, and the node id
/// counter that ties successive parses together.
pub struct Lox<'w> {
    interpreter: Interpreter<'w>,
    reporter: Reporter,
    next_id: usize,
}

impl<'w> Lox<'w> {
    /// Creates a driver whose `print` output goes to `out`. The binary
    /// passes stdout; tests pass a buffer.
    pub fn new(out: &'w mut dyn Write) -> Self {
        Lox {
            interpreter: Interpreter::new(out),
            reporter: Reporter::new(),
            next_id: 0,
        }
    }

    /// Runs a script from disk. Exits the process with 65 on a static
    /// error, 70 on a runtime error, or 74 when the file cannot be read.
    pub fn run_file(&mut self, path: &str) {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(_) => {
                eprintln!("Could not open file '{path}'.");
                process::exit(74);
            },
        };

        self.run(&source);

        if self.reporter.had_error() {
            process::exit(65);
        }
        if self.reporter.had_runtime_error() {
            process::exit(70);
        }
    }

    /// The interactive loop. Globals persist from line to line; errors are
    /// reported and forgotten so the next line starts clean.
    pub fn run_prompt(&mut self) {
        let mut editor = DefaultEditor::new().expect("line editor to initialize");

        let history = home::home_dir().map(|dir| dir.join(".lox_history"));
        if let Some(path) = &history {
            let _ = editor.load_history(path);
        }

        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    self.run(&line);
                    self.reporter.reset();
                },
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(error) => {
                    eprintln!("{error}");
                    break;
                },
            }
        }

        if let Some(path) = &history {
            let _ = editor.save_history(path);
        }
    }

    fn run(&mut self, source: &str) {
        let scanner = Scanner::new(source, &mut self.reporter);
        let tokens = scanner.scan_tokens();
        if self.reporter.had_error() {
            return;
        }

        let mut parser = Parser::new(tokens, self.next_id, &mut self.reporter);
        let statements = parser.parse();
        self.next_id = parser.next_id();
        if self.reporter.had_error() {
            return;
        }

        let mut resolver = Resolver::new(&mut self.interpreter, &mut self.reporter);
        resolver.resolve(&statements);
        if self.reporter.had_error() {
            return;
        }

        self.interpreter.interpret(&statements, &mut self.reporter);
    }
}
