//! Dabble - a small Lisp with quasiquote-style macros
//!
//! This crate provides a tree-walking interpreter for a tiny Lisp dialect built
//! around a handful of primitives. Every primitive, including `if`, `lambda` and
//! `macro`, is an ordinary binding in the environment that receives its
//! arguments unevaluated and decides for itself what to evaluate.
//!
//! ```text
//! (car '(1 2 3 4))                         ; => 1
//! (cons 1 '(2 3 4))                        ; => (1 2 3 4)
//! ((lambda (a b) (cons a b)) 1 '(2))       ; => (1 2)
//! ((macro (x y) '(`y `x)) 1 2)             ; => (2 1)
//! ```
//!
//! ## Quoting
//!
//! `'x` suppresses evaluation of `x`, and `` `x `` inside a quoted form escapes
//! back to normal evaluation. Macro bodies are quoted templates with unquoted
//! islands referring to the macro's parameters.
//!
//! ## Errors
//!
//! Evaluation never panics on bad programs. Every failure is an [`Error`] that
//! propagates to the top level, where it can be printed or reified as a
//! [`ast::Value::Error`].
//!
//! ## Modules
//!
//! - `ast`: the value model and its textual form
//! - `evaluator`: environments, the interpreter and the special forms
//! - `builtinops`: the primitive registry and the arithmetic host set
//! - `intooperation`: adapters turning typed Rust functions into builtins
//! - `parser`: S-expression reader (feature `parser`)
//! - `loader`: library directory loading (feature `parser`)

use std::fmt;

/// Maximum nesting accepted by the reader
pub const MAX_PARSE_DEPTH: usize = 128;

/// Evaluation depth used by [`evaluator::EvalConfig::bounded`]
pub const DEFAULT_MAX_EVAL_DEPTH: usize = 1_000;

/// Evaluation step budget used by [`evaluator::EvalConfig::bounded`]
pub const DEFAULT_MAX_EVAL_STEPS: u64 = 10_000_000;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad tokens, stray parens, malformed dotted pairs)
    InvalidSyntax,
    /// Input ended before the expression was complete
    Incomplete,
    /// Expression nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
    /// Extra input found after a complete expression
    TrailingContent,
    /// Integer literal out of range
    ImplementationLimit,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a ParseError with context extracted from input at a given byte offset
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        let error_offset = error_offset.min(input.len());

        // Show some context before the error, counted in chars
        let context_start = input[..error_offset].chars().count().saturating_sub(20);
        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.chars().count() < input.chars().count() {
            display_context.push_str("[...]");
        }
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        let found = input
            .get(error_offset..)
            .and_then(|rest| rest.chars().next())
            .map(String::from);

        Self::new(kind, message, Some(display_context), found)
    }
}

/// Number of arguments an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(&self, got: usize) -> bool {
        match self {
            Arity::Exact(n) => got == *n,
            Arity::AtLeast(n) => got >= *n,
            Arity::Any => true,
        }
    }

    /// Check an argument count, naming the operation in the error
    pub fn validate(&self, name: &str, got: usize) -> Result<(), Error> {
        if self.accepts(got) {
            Ok(())
        } else {
            Err(Error::arity_error(name, *self, got))
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ParseError(ParseError),
    ArityError {
        name: String,
        expected: Arity,
        got: usize,
    },
    SymbolNotBound(String),
    NotCallable(String),
    NonSymbolBinding(String),
    NonSymbolParam(String),
    TypeMismatch(String),
    NoCaller,
    /// Raised by the `error` primitive with the reason symbol's text
    User(String),
    /// A host function reported a failure
    EvalError(String),
    LimitExceeded(String),
    LoadError {
        path: String,
        message: String,
    },
}

impl Error {
    pub fn arity_error(name: impl Into<String>, expected: Arity, got: usize) -> Self {
        Error::ArityError {
            name: name.into(),
            expected,
            got,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "ParseError: {}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::ArityError {
                name,
                expected,
                got,
            } => write!(
                f,
                "ArityError: {name} wants {expected} arg(s), got {got}"
            ),
            Error::SymbolNotBound(name) => write!(f, "symbol not bound: {name}"),
            Error::NotCallable(value) => write!(f, "calling non-function: {value}"),
            Error::NonSymbolBinding(value) => write!(f, "label non-symbol binding: {value}"),
            Error::NonSymbolParam(value) => write!(f, "non-symbol parameter: {value}"),
            Error::TypeMismatch(msg) => write!(f, "Type error: {msg}"),
            Error::NoCaller => write!(f, "recur: no caller"),
            Error::User(reason) => write!(f, "{reason}"),
            Error::EvalError(msg) => write!(f, "EvaluationError: {msg}"),
            Error::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            Error::LoadError { path, message } => write!(f, "loading {path}: {message}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::ParseError(e)
    }
}

// Host functions may fail with a bare message
impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::EvalError(msg.to_owned())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::EvalError(msg)
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod intooperation;

#[cfg(feature = "parser")]
pub mod loader;

#[cfg(feature = "parser")]
pub mod parser;

pub use ast::Value;
pub use evaluator::{EvalConfig, Environment, Interpreter, eval};
