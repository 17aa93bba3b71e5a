//! This module defines the value model of the interpreter. The main enum,
//! [`Value`], is a closed set of variants: numbers, symbols, nil, cons pairs,
//! functions, reified errors and the two quoting wrappers used by the evaluator.
//! Lists are right-nested chains of [`Value::Pair`] ending in [`Value::Nil`];
//! improper (dotted) tails are representable and print as `(a . b)`.
//!
//! Ergonomic helpers such as [`val`], [`sym`], [`nil`] and [`list`] are provided
//! for building trees in code and tests, together with `From` conversions from
//! Rust integers, arrays and vectors.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::{Arc, LazyLock};

use crate::builtinops::BuiltinOp;
use crate::evaluator::Environment;
use crate::intooperation::OperationFn;
use crate::{Arity, Error};

/// Type alias for number values in interpreter
pub type NumberType = i64;

/// The symbol returned by predicates for "true"
pub const TRUE_SYMBOL: &str = "t";

/// Core value type in interpreter
///
/// Values are immutable once built. Pairs and quoting wrappers share their
/// children through `Arc`, so cloning is cheap and structure is shared freely.
///
/// To build a tree, use the helper functions:
/// - `val(42)` for numbers, `sym("name")` for symbols, `nil()` for the empty list
/// - `val([1, 2, 3])` for homogeneous lists
/// - `list([sym("car"), val(1)])` for mixed lists
#[derive(Clone)]
pub enum Value {
    Number(NumberType),
    Symbol(String),
    /// The empty list, also the false value
    Nil,
    /// Cons cell (first, rest)
    Pair(Arc<Value>, Arc<Value>),
    Function(Function),
    /// A reified failure; evaluates to itself
    Error(Box<Error>),
    /// Suppresses evaluation of its payload except inside unquoted islands
    Quoted(Arc<Value>),
    /// Inside a quoted context, marks a sub-tree for normal evaluation
    Unquoted(Arc<Value>),
}

/// Placeholder left behind when [`Value`]'s drop detaches a child
static VACANT: LazyLock<Arc<Value>> = LazyLock::new(|| Arc::new(Value::Nil));

/// Move the `Arc` children of `value` onto `pending`
fn detach_children(value: &mut Value, pending: &mut Vec<Arc<Value>>) {
    match value {
        Value::Pair(first, rest) => {
            pending.push(std::mem::replace(first, Arc::clone(&*VACANT)));
            pending.push(std::mem::replace(rest, Arc::clone(&*VACANT)));
        }
        Value::Quoted(inner) | Value::Unquoted(inner) => {
            pending.push(std::mem::replace(inner, Arc::clone(&*VACANT)));
        }
        _ => {}
    }
}

// Drop long lists iteratively; the default glue recurses once per pair
impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(child) = pending.pop() {
            // Shared children are someone else's to free
            if let Ok(mut value) = Arc::try_unwrap(child) {
                detach_children(&mut value, &mut pending);
            }
        }
    }
}

/// Anything that can sit in call position
#[derive(Clone)]
pub enum Function {
    /// Entry of the static primitive registry
    Builtin(&'static BuiltinOp),
    /// Rust function registered at runtime, receives evaluated arguments
    Host(Arc<HostFunction>),
    /// Closure produced by `lambda` or `macro`
    Closure(Arc<Closure>),
}

pub struct HostFunction {
    pub id: String,
    pub arity: Arity,
    // Stored as an Arc so typed Rust functions and closures can be wrapped
    // into the canonical evaluator signature.
    pub func: Arc<OperationFn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    Lambda,
    Macro,
}

impl ClosureKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ClosureKind::Lambda => "lambda",
            ClosureKind::Macro => "macro",
        }
    }
}

/// User-defined function: parameters, body and the captured environment
#[derive(Clone)]
pub struct Closure {
    pub kind: ClosureKind,
    pub params: Vec<String>,
    /// The last parameter collects the trailing arguments, at least one
    /// (macros only)
    pub rest: bool,
    pub body: Value,
    pub env: Environment,
    /// Set by `label`; the body sees the closure under this name
    pub name: Option<String>,
}

impl Closure {
    /// Argument counts this closure accepts
    pub fn arity(&self) -> Arity {
        if self.rest {
            Arity::AtLeast(self.params.len())
        } else {
            Arity::Exact(self.params.len())
        }
    }

    /// Copy of this closure that knows itself as `name`
    pub fn named(&self, name: &str) -> Closure {
        Closure {
            name: Some(name.to_owned()),
            ..self.clone()
        }
    }
}

impl Function {
    /// Name used in error messages and traces
    pub fn name(&self) -> String {
        match self {
            Function::Builtin(op) => op.id.to_owned(),
            Function::Host(host) => host.id.clone(),
            Function::Closure(closure) => match &closure.name {
                Some(name) => name.clone(),
                None => closure.kind.keyword().to_owned(),
            },
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Compare builtins by registry id, not address
            (Function::Builtin(a), Function::Builtin(b)) => a.id == b.id,
            (Function::Host(a), Function::Host(b)) => Arc::ptr_eq(a, b),
            (Function::Closure(a), Function::Closure(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Builtin(op) => write!(f, "Builtin({})", op.id),
            Function::Host(host) => write!(f, "Host({})", host.id),
            Function::Closure(closure) => write!(
                f,
                "Closure({}, params={:?}, rest={}, body={:?})",
                closure.kind.keyword(),
                closure.params,
                closure.rest,
                closure.body
            ),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Builtin(op) => write!(f, "#<builtin:{}>", op.id),
            Function::Host(host) => write!(f, "#<builtin:{}>", host.id),
            Function::Closure(closure) => match &closure.name {
                Some(name) => write!(f, "#<{} {name}>", closure.kind.keyword()),
                None => write!(f, "#<{}>", closure.kind.keyword()),
            },
        }
    }
}

impl Value {
    pub fn cons(first: Value, rest: Value) -> Value {
        Value::Pair(Arc::new(first), Arc::new(rest))
    }

    pub fn quoted(value: Value) -> Value {
        Value::Quoted(Arc::new(value))
    }

    pub fn unquoted(value: Value) -> Value {
        Value::Unquoted(Arc::new(value))
    }

    /// The canonical truthy value, the symbol `t`
    pub fn truthy() -> Value {
        Value::Symbol(TRUE_SYMBOL.to_owned())
    }

    /// `t` for true, `()` for false
    pub fn from_bool(b: bool) -> Value {
        if b { Value::truthy() } else { Value::Nil }
    }

    /// Build a list from `items`, ending in `tail` (`Nil` for a proper list)
    pub fn list_with_tail(items: Vec<Value>, tail: Value) -> Value {
        items
            .into_iter()
            .rev()
            .fold(tail, |rest, item| Value::cons(item, rest))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Value::Pair(..))
    }

    /// Iterate over the elements of a list. Iteration stops at the first
    /// non-pair; [`ListIter::tail`] tells whether that was `Nil`.
    pub fn iter(&self) -> ListIter<'_> {
        ListIter { cursor: self }
    }

    /// Elements of a proper list, or `None` if the chain ends in anything but `Nil`
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        let mut iter = self.iter();
        let items: Vec<Value> = iter.by_ref().cloned().collect();
        iter.tail().is_nil().then_some(items)
    }

    /// Like [`Value::to_vec`], failing with a type error that names `what`
    pub fn expect_list(&self, what: &str) -> Result<Vec<Value>, Error> {
        self.to_vec().ok_or_else(|| {
            Error::TypeMismatch(format!("{what} must be a proper list, got {self}"))
        })
    }

    /// Name of the variant, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Symbol(_) => "symbol",
            Value::Nil => "nil",
            Value::Pair(..) => "pair",
            Value::Function(_) => "function",
            Value::Error(_) => "error",
            Value::Quoted(_) => "quoted",
            Value::Unquoted(_) => "unquoted",
        }
    }
}

/// Borrowing iterator over the spine of a list
#[derive(Debug, Clone, Copy)]
pub struct ListIter<'a> {
    cursor: &'a Value,
}

impl<'a> ListIter<'a> {
    /// What is left of the chain: `Nil` once a proper list is exhausted
    pub fn tail(&self) -> &'a Value {
        self.cursor
    }
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor {
            Value::Pair(first, rest) => {
                self.cursor = rest;
                Some(first)
            }
            _ => None,
        }
    }
}

impl FusedIterator for ListIter<'_> {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::Nil => write!(f, "Nil"),
            Value::Pair(..) => {
                // Along the spine iteratively, closing every pair at the end
                let mut iter = self.iter();
                let mut open = 0;
                for elem in iter.by_ref() {
                    write!(f, "Pair({elem:?}, ")?;
                    open += 1;
                }
                write!(f, "{:?}", iter.tail())?;
                for _ in 0..open {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Value::Function(func) => write!(f, "Function({func:?})"),
            Value::Error(e) => write!(f, "Error({e:?})"),
            Value::Quoted(v) => write!(f, "Quoted({v:?})"),
            Value::Unquoted(v) => write!(f, "Unquoted({v:?})"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Nil => write!(f, "()"),
            Value::Pair(..) => {
                write!(f, "(")?;
                let mut iter = self.iter();
                for (i, elem) in iter.by_ref().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                let tail = iter.tail();
                if !tail.is_nil() {
                    write!(f, " . {tail}")?;
                }
                write!(f, ")")
            }
            Value::Function(func) => write!(f, "{func}"),
            Value::Error(e) => write!(f, "<error: {e}>"),
            Value::Quoted(v) => write!(f, "'{v}"),
            Value::Unquoted(v) => write!(f, "`{v}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        // Walk list spines iteratively so long lists don't recurse per element
        let (mut a, mut b) = (self, other);
        loop {
            match (a, b) {
                (Value::Pair(f1, r1), Value::Pair(f2, r2)) => {
                    if f1 != f2 {
                        return false;
                    }
                    a = r1;
                    b = r2;
                }
                (Value::Number(x), Value::Number(y)) => return x == y,
                (Value::Symbol(x), Value::Symbol(y)) => return x == y,
                (Value::Nil, Value::Nil) => return true,
                (Value::Function(x), Value::Function(y)) => return x == y,
                (Value::Error(x), Value::Error(y)) => return x == y,
                (Value::Quoted(x), Value::Quoted(y)) => return x == y,
                (Value::Unquoted(x), Value::Unquoted(y)) => return x == y,
                _ => return false, // Different variants are never equal
            }
        }
    }
}

impl From<Error> for Value {
    fn from(e: Error) -> Self {
        Value::Error(Box::new(e))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(n as NumberType)
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(NumberType); // Special case - no casting
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list_with_tail(v.into_iter().map(Into::into).collect(), Value::Nil)
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::list_with_tail(arr.into_iter().map(Into::into).collect(), Value::Nil)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::list_with_tail(iter.into_iter().map(Into::into).collect(), Value::Nil)
    }
}

// Fallible conversions from `Value` back into primitive Rust types.

impl std::convert::TryInto<NumberType> for Value {
    type Error = Error;

    fn try_into(self) -> Result<NumberType, Error> {
        if let Value::Number(n) = &self {
            Ok(*n)
        } else {
            Err(Error::TypeMismatch(format!("expected number, got {self}")))
        }
    }
}

/// Helper function for creating symbols
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values from anything convertible
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for the empty list
pub fn nil() -> Value {
    Value::Nil
}

/// Helper function for proper lists of mixed values
pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Value {
    items.into_iter().collect()
}

#[cfg(test)]
mod helper_function_tests {
    use super::*;

    #[test]
    fn test_helper_functions_data_driven() {
        let test_cases = vec![
            (val(42), Value::Number(42)),
            (val(-17), Value::Number(-17)),
            (val(255u8), Value::Number(255)),
            (val(NumberType::MIN), Value::Number(NumberType::MIN)),
            (val(true), Value::Symbol("t".to_owned())),
            (val(false), Value::Nil),
            (sym("foo-bar?"), Value::Symbol("foo-bar?".to_owned())),
            (nil(), Value::Nil),
            (
                val([1, 2]),
                Value::cons(val(1), Value::cons(val(2), Value::Nil)),
            ),
            (
                list([sym("car"), val([1])]),
                Value::cons(
                    sym("car"),
                    Value::cons(Value::cons(val(1), Value::Nil), Value::Nil),
                ),
            ),
            (
                Value::list_with_tail(vec![val(1)], val(2)),
                Value::cons(val(1), val(2)),
            ),
        ];

        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            assert_eq!(
                actual,
                expected,
                "Test case {} failed:\n  Expected: {:?}\n  Got: {:?}",
                i + 1,
                expected,
                actual
            );
        }
    }

    #[test]
    fn test_display_textual_format() {
        let test_cases = vec![
            (nil(), "()"),
            (val(-12), "-12"),
            (sym("abc"), "abc"),
            (val([1, 2, 3]), "(1 2 3)"),
            (val(vec![val([1]), nil()]), "((1) ())"),
            (Value::cons(val(1), val(2)), "(1 . 2)"),
            (Value::list_with_tail(vec![val(1), val(2)], sym("c")), "(1 2 . c)"),
            (Value::quoted(val([1, 2])), "'(1 2)"),
            (Value::unquoted(sym("x")), "`x"),
            (list([val(1), Value::unquoted(sym("b"))]), "(1 `b)"),
            (Value::quoted(nil()), "'()"),
            (Value::from(Error::User("boom".into())), "<error: boom>"),
        ];

        for (value, expected) in test_cases {
            assert_eq!(format!("{value}"), expected, "display of {value:?}");
        }
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(val([1, 2]), val([1, 2]));
        assert_ne!(val([1, 2]), val([1, 2, 3]));
        assert_ne!(val([1, 2]), Value::list_with_tail(vec![val(1), val(2)], val(3)));
        assert_ne!(nil(), val([0]));
        assert_ne!(sym("a"), val(0));
        assert_eq!(Value::quoted(sym("a")), Value::quoted(sym("a")));
        assert_ne!(Value::quoted(sym("a")), Value::unquoted(sym("a")));
        assert_ne!(Value::quoted(sym("a")), sym("a"));
    }

    #[test]
    fn test_list_iteration_and_tail() {
        let proper = val([1, 2, 3]);
        assert_eq!(proper.to_vec(), Some(vec![val(1), val(2), val(3)]));
        assert_eq!(nil().to_vec(), Some(vec![]));

        let dotted = Value::cons(val(1), val(2));
        assert_eq!(dotted.to_vec(), None);
        let mut iter = dotted.iter();
        assert_eq!(iter.next(), Some(&val(1)));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.tail(), &val(2));

        assert!(dotted.expect_list("argument list").is_err());
        assert_eq!(sym("x").to_vec(), None);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(
            format!("{:?}", Value::cons(val(1), Value::cons(sym("a"), nil()))),
            "Pair(Number(1), Pair(Symbol(a), Nil))"
        );
        assert_eq!(
            format!("{:?}", Value::cons(val(1), val(2))),
            "Pair(Number(1), Number(2))"
        );
        assert_eq!(format!("{:?}", Value::quoted(val([1]))), "Quoted(Pair(Number(1), Nil))");
    }

    #[test]
    fn test_long_lists_drop_and_format_without_recursion() {
        let long: Value = (0..200_000).map(val::<i32>).collect();
        let debug = format!("{long:?}");
        assert!(debug.starts_with("Pair(Number(0), Pair(Number(1), "), "{}", &debug[..40]);
        assert!(debug.ends_with("Pair(Number(199999), Nil))))"));
        assert_eq!(debug.matches(')').count(), 2 * 200_000);
        drop(long);

        // Deep nesting through quoting wrappers and the first slot
        let mut nested = nil();
        for i in 0..200_000 {
            nested = if i % 2 == 0 {
                Value::quoted(nested)
            } else {
                Value::cons(nested, nil())
            };
        }
        drop(nested);

        // Shared tails outlive the list that dropped them
        let tail: Value = (0..1_000).map(val::<i32>).collect();
        let head = Value::cons(val(-1), tail.clone());
        drop(head);
        assert_eq!(tail.iter().count(), 1_000);
    }

    #[test]
    fn test_number_conversion() {
        let n: Result<NumberType, Error> = val(7).try_into();
        assert_eq!(n, Ok(7));
        let err: Result<NumberType, Error> = sym("x").try_into();
        assert!(matches!(err, Err(Error::TypeMismatch(_))));
    }
}
