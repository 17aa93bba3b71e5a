//! Loading library definitions from a directory tree
//!
//! Every `*.lisp` file under the directory holds a single form. The form is
//! evaluated and its value bound under the file stem, so `lib/cadr.lisp`
//! defines `cadr`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::Error;
use crate::ast::{Function, Value};
use crate::evaluator::{Environment, Interpreter, create_standard_env};
use crate::parser::parse;

/// Extension of library source files
pub const LIBRARY_EXTENSION: &str = "lisp";

fn load_error(path: &Path, message: impl fmt::Display) -> Error {
    Error::LoadError {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

fn collect_library_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), Error> {
    let entries = fs::read_dir(dir).map_err(|e| load_error(dir, e))?;

    for entry in entries {
        let path = entry.map_err(|e| load_error(dir, e))?.path();
        if path.is_dir() {
            collect_library_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == LIBRARY_EXTENSION) {
            files.push(path);
        }
    }
    Ok(())
}

/// Closures take on the name they are bound under
fn name_value(value: Value, name: &str) -> Value {
    if let Value::Function(Function::Closure(closure)) = &value
        && closure.name.is_none()
    {
        return Value::Function(Function::Closure(Arc::new(closure.named(name))));
    }
    value
}

/// Evaluate every library file under `dir` in `env`.
///
/// Files are visited in sorted path order. The returned environment holds
/// only the library bindings; merge it with `env.extend_all(&library)`.
/// When two files share a stem, the later path shadows the earlier one.
pub fn load_library(dir: &Path, env: &Environment) -> Result<Environment, Error> {
    let mut files = Vec::new();
    collect_library_files(dir, &mut files)?;
    files.sort();

    let mut interpreter = Interpreter::new();
    let mut library = Environment::new();

    for path in &files {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| load_error(path, "file name is not valid UTF-8"))?;
        let source = fs::read_to_string(path).map_err(|e| load_error(path, e))?;
        let expr = parse(&source).map_err(|e| load_error(path, e))?;
        let value = interpreter
            .eval(&expr, env)
            .map_err(|e| load_error(path, e))?;

        tracing::debug!(target: "dabble::loader", name, path = %path.display(), "loaded {value}");
        library.define(name, name_value(value, name));
    }

    Ok(library)
}

/// The standard environment with the library under `dir` on top
pub fn load_standard_env(dir: &Path) -> Result<Environment, Error> {
    let env = create_standard_env();
    let library = load_library(dir, &env)?;
    Ok(env.extend_all(&library))
}
