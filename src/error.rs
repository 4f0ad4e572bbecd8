use crate::object::Object;
use crate::token::{Token, TokenKind};

/// Shared sink for diagnostics. Every pass reports through a `Reporter` and
/// the driver queries the flags at phase boundaries, so no pass needs to halt
/// on its first error.
#[derive(Debug, Default)]
pub struct Reporter {
    had_error: bool,
    had_runtime_error: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a scan, parse or resolve error has been reported.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Returns whether a runtime error has been reported.
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clears both flags so the REPL can accept the next line.
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    /// Reports an error that has no token to point at (scanning).
    pub fn error(&mut self, line: usize, message: &str) {
        self.report(line, "", message);
    }

    /// Reports an error at a token (parsing and resolution).
    pub fn error_at(&mut self, token: &Token, message: &str) {
        if token.kind == TokenKind::Eof {
            self.report(token.line, " at end", message);
        } else {
            let location = format!(" at '{}'", token.lexeme);
            self.report(token.line, &location, message);
        }
    }

    /// Reports a runtime error caught at the top of the interpreter.
    pub fn runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("{}\n[line {}]", error.message, error.token.line);
        self.had_runtime_error = true;
    }

    fn report(&mut self, line: usize, location: &str, message: &str) {
        eprintln!("[line {line}] Error{location}: {message}");
        self.had_error = true;
    }
}

/// A grammar violation. Returned up through the parser's productions and
/// reported at the statement boundary where the parser synchronizes.
#[derive(Debug)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl ParseError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        ParseError { token: token.clone(), message: message.into() }
    }
}

/// An error raised during evaluation, attributed to the token that caused it.
#[derive(Debug)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        RuntimeError { token: token.clone(), message: message.into() }
    }
}

/// Non-local control flow during evaluation. A runtime error propagates to
/// the top of `interpret`; a `return` is caught by the function call
/// machinery and turned back into a plain value.
#[derive(Debug)]
pub enum Unwind {
    Return(Object),
    Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

/// Result of evaluating or executing a piece of the tree.
pub type RuntimeResult<T> = Result<T, Unwind>;
