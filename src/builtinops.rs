//! Registry of the primitive operations.
//!
//! Every primitive of the language is an entry in one static table and is
//! bound in the global environment under its id. There is no syntax for
//! special forms: `if`, `lambda` and friends are ordinary bindings whose
//! implementation happens to receive its arguments unevaluated.
//!
//! ## Functions vs Special Forms
//!
//! - **Functions** get every argument evaluated in the call-site
//!   environment, left to right, stopping at the first failure
//!   (`atom`, `car`, `cdr`, `cons`, `eq`).
//! - **Special forms** get the raw argument expressions, the call-site
//!   environment and the interpreter, and decide for themselves what to
//!   evaluate (`quote`, `unquote`, `if`, `label`, `lambda`, `macro`,
//!   `apply`, `error`, `recur`).
//!
//! Arity is validated by the evaluator before either kind runs.
//!
//! ## Arithmetic
//!
//! The core language has no arithmetic. [`register_arithmetic`] adds a small
//! checked-integer set (`+ - * < >`) as host functions, which is what
//! [`crate::evaluator::create_standard_env`] uses.

use crate::ast::{NumberType, Value};
use crate::evaluator::{
    Environment, Interpreter, eval_apply, eval_error, eval_if, eval_label, eval_lambda,
    eval_macro, eval_quote, eval_recur, eval_unquote,
};
use crate::intooperation::{IntoOperation, NumIterator, NumRest, OperationFn};
use crate::{Arity, Error};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Signature shared by all special forms: raw arguments, the call-site
/// environment and the running interpreter.
pub type SpecialFormFn = fn(&[Value], &Environment, &mut Interpreter) -> Result<Value, Error>;

/// Represents the implementation of a primitive (function or special form)
#[derive(Clone)]
pub enum OpKind {
    /// Takes evaluated arguments through the canonical erased signature
    Function(Arc<OperationFn>),
    /// Takes unevaluated arguments and controls evaluation itself
    SpecialForm(SpecialFormFn),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::SpecialForm(_) => write!(f, "SpecialForm(<fn>)"),
        }
    }
}

/// Definition of a primitive operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// Name the operation is bound under in the global environment
    pub id: &'static str,
    pub op_kind: OpKind,
    pub arity: Arity,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // ids are unique within the registry
        self.id == other.id
    }
}

impl BuiltinOp {
    pub fn is_special_form(&self) -> bool {
        matches!(self.op_kind, OpKind::SpecialForm(_))
    }

    pub(crate) fn validate_arity(&self, arg_count: usize) -> Result<(), Error> {
        self.arity.validate(self.id, arg_count)
    }
}

//
// Evaluating primitives
//

fn builtin_atom(value: Value) -> bool {
    !value.is_pair()
}

fn builtin_car(value: Value) -> Result<Value, Error> {
    match &value {
        Value::Pair(first, _) => Ok(Value::clone(first)),
        Value::Nil => Ok(Value::Nil),
        other => Err(Error::TypeMismatch(format!(
            "car wants a list, got {} {other}",
            other.kind_name()
        ))),
    }
}

fn builtin_cdr(value: Value) -> Result<Value, Error> {
    match &value {
        Value::Pair(_, rest) => Ok(Value::clone(rest)),
        Value::Nil => Ok(Value::Nil),
        other => Err(Error::TypeMismatch(format!(
            "cdr wants a list, got {} {other}",
            other.kind_name()
        ))),
    }
}

fn builtin_cons(first: Value, rest: Value) -> Value {
    Value::cons(first, rest)
}

fn builtin_eq(first: Value, second: Value) -> bool {
    first == second
}

//
// Arithmetic host set
//

fn builtin_add(args: NumIterator<'_>) -> Result<NumberType, Error> {
    let mut sum = 0 as NumberType;
    for arg in args {
        sum = sum
            .checked_add(arg)
            .ok_or_else(|| Error::EvalError("integer overflow in addition".into()))?;
    }
    Ok(sum)
}

fn builtin_sub(first: NumberType, rest: NumIterator<'_>) -> Result<NumberType, Error> {
    let mut iter = rest.peekable();

    if iter.peek().is_none() {
        return first
            .checked_neg()
            .ok_or_else(|| Error::EvalError("integer overflow in negation".into()));
    }

    let mut result = first;
    for n in iter {
        result = result
            .checked_sub(n)
            .ok_or_else(|| Error::EvalError("integer overflow in subtraction".into()))?;
    }
    Ok(result)
}

fn builtin_mul(first: NumberType, rest: NumIterator<'_>) -> Result<NumberType, Error> {
    let mut product = first;
    for n in rest {
        product = product
            .checked_mul(n)
            .ok_or_else(|| Error::EvalError("integer overflow in multiplication".into()))?;
    }
    Ok(product)
}

fn builtin_lt(a: NumberType, b: NumberType) -> bool {
    a < b
}

fn builtin_gt(a: NumberType, b: NumberType) -> bool {
    a > b
}

/// Register `+ - * < >` in `env` as checked-integer host functions
pub fn register_arithmetic(env: &mut Environment) {
    env.register_variadic_builtin_operation::<_, (NumRest,), NumberType>(
        "+",
        Arity::Any,
        builtin_add,
    );
    env.register_variadic_builtin_operation::<_, (NumberType, NumRest), NumberType>(
        "-",
        Arity::AtLeast(1),
        builtin_sub,
    );
    env.register_variadic_builtin_operation::<_, (NumberType, NumRest), NumberType>(
        "*",
        Arity::AtLeast(1),
        builtin_mul,
    );
    env.register_builtin_operation::<_, (NumberType, NumberType), bool>("<", builtin_lt);
    env.register_builtin_operation::<_, (NumberType, NumberType), bool>(">", builtin_gt);
}

/// Global registry of all primitives.
///
/// The evaluating primitives are wired through the same adapter layer used
/// for host registration, once, at initialization time.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    fn builtin_fixed<Args, R, F>(f: F) -> Arc<OperationFn>
    where
        F: IntoOperation<Args, R>,
    {
        <F as IntoOperation<Args, R>>::into_operation(f)
    }

    vec![
        // Quoting
        BuiltinOp {
            id: "quote",
            op_kind: OpKind::SpecialForm(eval_quote),
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "unquote",
            op_kind: OpKind::SpecialForm(eval_unquote),
            arity: Arity::Exact(1),
        },
        // Pair operations
        BuiltinOp {
            id: "atom",
            op_kind: OpKind::Function(builtin_fixed::<(Value,), bool, _>(builtin_atom)),
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "car",
            op_kind: OpKind::Function(builtin_fixed::<(Value,), Value, _>(builtin_car)),
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "cdr",
            op_kind: OpKind::Function(builtin_fixed::<(Value,), Value, _>(builtin_cdr)),
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "cons",
            op_kind: OpKind::Function(builtin_fixed::<(Value, Value), Value, _>(builtin_cons)),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "eq",
            op_kind: OpKind::Function(builtin_fixed::<(Value, Value), bool, _>(builtin_eq)),
            arity: Arity::Exact(2),
        },
        // Control flow and binding
        BuiltinOp {
            id: "if",
            op_kind: OpKind::SpecialForm(eval_if),
            arity: Arity::Exact(3),
        },
        BuiltinOp {
            id: "label",
            op_kind: OpKind::SpecialForm(eval_label),
            arity: Arity::Exact(3),
        },
        BuiltinOp {
            id: "lambda",
            op_kind: OpKind::SpecialForm(eval_lambda),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "macro",
            op_kind: OpKind::SpecialForm(eval_macro),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "apply",
            op_kind: OpKind::SpecialForm(eval_apply),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "error",
            op_kind: OpKind::SpecialForm(eval_error),
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "recur",
            op_kind: OpKind::SpecialForm(eval_recur),
            arity: Arity::Any,
        },
    ]
});

static BUILTIN_BY_ID: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().map(|op| (op.id, op)).collect()
});

/// All primitives, in registry order
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a primitive by the name it is bound under
pub fn find_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_BY_ID.get(id).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};

    /// Micro-helper for success cases in comprehensive tests
    fn success<T: Into<Value>>(value: T) -> Option<Value> {
        Some(val(value))
    }

    /// Invoke a function primitive through the registry using the canonical
    /// erased signature, so the adapter layer is exercised too.
    fn call_builtin(name: &str, args: &[Value]) -> Result<Value, Error> {
        let op = find_op(name).unwrap();
        match &op.op_kind {
            OpKind::Function(func) => func(args.to_vec()),
            OpKind::SpecialForm(_) => {
                panic!("expected function builtin in tests, got special form: {name}")
            }
        }
    }

    /// Invoke a host function registered by `register_arithmetic`
    fn call_arithmetic(name: &str, args: &[Value]) -> Result<Value, Error> {
        let mut env = Environment::new();
        register_arithmetic(&mut env);
        match &env.resolve(name).unwrap() {
            Value::Function(crate::ast::Function::Host(host)) => {
                host.arity.validate(&host.id, args.len())?;
                (host.func)(args.to_vec())
            }
            other => panic!("expected host function for {name}, got {other}"),
        }
    }

    #[test]
    fn test_builtin_ops_registry() {
        let car_op = find_op("car").unwrap();
        assert_eq!(car_op.arity, Arity::Exact(1));
        assert!(!car_op.is_special_form());

        let if_op = find_op("if").unwrap();
        assert!(if_op.is_special_form());
        assert_eq!(if_op.arity, Arity::Exact(3));

        let recur_op = find_op("recur").unwrap();
        assert_eq!(recur_op.arity, Arity::Any);

        let all_ops = get_builtin_ops();
        let mut ids: Vec<&str> = all_ops.iter().map(|op| op.id).collect();
        ids.sort_unstable();
        assert_eq!(
            ids,
            vec![
                "apply", "atom", "car", "cdr", "cons", "eq", "error", "if", "label", "lambda",
                "macro", "quote", "recur", "unquote"
            ]
        );

        let functions: Vec<&str> = all_ops
            .iter()
            .filter(|op| !op.is_special_form())
            .map(|op| op.id)
            .collect();
        assert_eq!(functions, vec!["atom", "car", "cdr", "cons", "eq"]);

        assert!(std::ptr::eq(find_op("car").unwrap(), car_op));
        assert!(find_op("+").is_none());
        assert!(find_op("unknown").is_none());
    }

    /// Macro to create test cases, invoking builtins via the registry.
    macro_rules! test {
        ($name:expr, $args:expr, $expected:expr) => {
            ($name, call_builtin($name, $args), $expected)
        };
    }

    macro_rules! arith {
        ($name:expr, $args:expr, $expected:expr) => {
            ($name, call_arithmetic($name, $args), $expected)
        };
    }

    #[test]
    fn test_builtin_function_implementations() {
        type TestCase = (&'static str, Result<Value, Error>, Option<Value>);

        let int_list = val([1, 2, 3]);
        let nested = val([val([val([1])])]);
        let dotted = Value::cons(val(1), val(2));
        let many_ones: Vec<Value> = (0..100).map(|_| val(1)).collect();

        let test_cases: Vec<TestCase> = vec![
            // =================================================================
            // ATOM
            // =================================================================
            test!("atom", &[val(1)], success(true)),
            test!("atom", &[sym("a")], success(true)),
            test!("atom", &[nil()], success(true)),
            test!("atom", &[int_list.clone()], success(false)),
            test!("atom", &[dotted.clone()], success(false)),
            test!("atom", &[Value::quoted(int_list.clone())], success(true)),
            // =================================================================
            // CAR / CDR
            // =================================================================
            test!("car", std::slice::from_ref(&int_list), success(1)),
            test!("cdr", std::slice::from_ref(&int_list), success([2, 3])),
            test!("car", &[val([1])], success(1)),
            test!("cdr", &[val([1])], Some(nil())),
            test!("car", &[nested], success([val([1])])),
            test!("car", &[nil()], Some(nil())),
            test!("cdr", &[nil()], Some(nil())),
            test!("car", std::slice::from_ref(&dotted), success(1)),
            test!("cdr", std::slice::from_ref(&dotted), success(2)),
            // Symbols are atomic
            test!("car", &[sym("abc")], None),
            test!("cdr", &[sym("abc")], None),
            test!("car", &[val(5)], None),
            test!("cdr", &[val(5)], None),
            // =================================================================
            // CONS
            // =================================================================
            test!("cons", &[val(1), val([2, 3, 4])], success([1, 2, 3, 4])),
            test!("cons", &[val(1), nil()], success([1])),
            test!("cons", &[nil(), nil()], success([nil()])),
            test!("cons", &[val(1), val(2)], Some(dotted.clone())),
            test!(
                "cons",
                &[sym("a"), sym("b")],
                Some(Value::cons(sym("a"), sym("b")))
            ),
            // =================================================================
            // EQ
            // =================================================================
            test!("eq", &[val(1), val(1)], success(true)),
            test!("eq", &[val(1), val(2)], success(false)),
            test!("eq", &[sym("a"), sym("a")], success(true)),
            test!("eq", &[sym("a"), sym("b")], success(false)),
            test!("eq", &[nil(), nil()], success(true)),
            test!("eq", &[val([1, 2]), val([1, 2])], success(true)),
            test!("eq", &[val([1, 2]), val([1, 2, 3])], success(false)),
            test!("eq", &[dotted.clone(), Value::cons(val(1), val(2))], success(true)),
            // Different kinds never compare equal
            test!("eq", &[val(0), nil()], success(false)),
            test!("eq", &[sym("1"), val(1)], success(false)),
            test!("eq", &[nil(), val([nil()])], success(false)),
            // =================================================================
            // ARITHMETIC HOST SET
            // =================================================================
            arith!("+", &[], success(0)),
            arith!("+", &[val(1), val(2), val(3)], success(6)),
            arith!("+", &many_ones, success(100)),
            arith!("-", &[val(10), val(3), val(2)], success(5)),
            arith!("-", &[val(10)], success(-10)),
            arith!("*", &[val(2), val(3), val(4)], success(24)),
            arith!("*", &[val(7)], success(7)),
            arith!("<", &[val(1), val(2)], success(true)),
            arith!("<", &[val(2), val(1)], success(false)),
            arith!(">", &[val(2), val(1)], success(true)),
            arith!(">", &[val(1), val(1)], success(false)),
            // Overflow and type errors
            arith!("+", &[val(NumberType::MAX), val(1)], None),
            arith!("-", &[val(NumberType::MIN)], None),
            arith!("-", &[val(NumberType::MIN), val(1)], None),
            arith!("*", &[val(NumberType::MAX), val(2)], None),
            arith!("+", &[val(1), sym("a")], None),
            arith!("<", &[val(1), nil()], None),
            // Arity
            arith!("-", &[], None),
            arith!("*", &[], None),
            arith!("<", &[val(1)], None),
            arith!(">", &[val(1), val(2), val(3)], None),
        ];

        for (test_expr, result, expected) in test_cases {
            match (result, expected) {
                (Ok(actual), Some(expected_val)) => {
                    assert_eq!(actual, expected_val, "Failed for test case: {test_expr}");
                }
                (Err(_), None) => {} // Expected error
                (actual, expected) => panic!(
                    "Unexpected result for test case: {test_expr}\nGot: {actual:?}, Expected: {expected:?}"
                ),
            }
        }
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            call_builtin("car", &[sym("abc")]),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            call_arithmetic("+", &[sym("x")]),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            call_arithmetic("+", &[val(NumberType::MAX), val(1)]),
            Err(Error::EvalError(_))
        ));
        match call_arithmetic("<", &[val(1)]).unwrap_err() {
            Error::ArityError {
                name,
                expected,
                got,
            } => {
                assert_eq!(name, "<");
                assert_eq!(expected, Arity::Exact(2));
                assert_eq!(got, 1);
            }
            other => panic!("Expected ArityError, got {other:?}"),
        }
    }

    #[test]
    fn test_arity_validation() {
        use Arity::*;

        Exact(2).validate("f", 2).unwrap();
        Exact(2).validate("f", 1).unwrap_err();
        Exact(2).validate("f", 3).unwrap_err();

        AtLeast(1).validate("f", 1).unwrap();
        AtLeast(1).validate("f", 2).unwrap();
        AtLeast(1).validate("f", 0).unwrap_err();

        Any.validate("f", 0).unwrap();
        Any.validate("f", 100).unwrap();

        let err = find_op("cons").unwrap().validate_arity(1).unwrap_err();
        assert_eq!(err, Error::arity_error("cons", Exact(2), 1));
        assert_eq!(format!("{err}"), "ArityError: cons wants 2 arg(s), got 1");
    }
}
