//! End-to-end programs run through the public API: read, evaluate, print.
#![expect(clippy::unwrap_used)] // test code OK

use dabble::ast::{nil, sym, val};
use dabble::evaluator::{create_global_env, create_standard_env};
use dabble::loader::load_standard_env;
use dabble::parser::{parse, parse_all};
use dabble::{Environment, Error, EvalConfig, Interpreter, Value, eval};
use std::path::Path;

fn run(source: &str, env: &Environment) -> Result<Value, Error> {
    let expr = parse(source).unwrap_or_else(|e| panic!("parse of {source:?} failed: {e}"));
    eval(&expr, env)
}

fn printed(source: &str, env: &Environment) -> String {
    match run(source, env) {
        Ok(value) => value.to_string(),
        Err(e) => Value::from(e).to_string(),
    }
}

#[test]
fn primitive_scenarios() {
    let env = create_standard_env();
    let scenarios = [
        ("(car '(1 2 3 4))", "1"),
        ("(cons 1 '(2 3 4))", "(1 2 3 4)"),
        ("(eq '(1 2) '(1 2))", "t"),
        ("((lambda (a b) (cons a b)) 1 '(2))", "(1 2)"),
        ("((macro (x y) '(`y `x)) 1 2)", "(2 1)"),
        (
            "((lambda (repeat n)
                (if (eq 0 n)
                    ()
                    (cons repeat (recur repeat (- n 1)))))
              3 9)",
            "(3 3 3 3 3 3 3 3 3)",
        ),
        (
            "(label repeat
               (lambda (x n) (if (eq 0 n) () (cons x (repeat x (- n 1)))))
               (repeat 3 9))",
            "(3 3 3 3 3 3 3 3 3)",
        ),
    ];

    for (source, expected) in scenarios {
        assert_eq!(printed(source, &env), expected, "{source}");
    }
}

#[test]
fn self_evaluation_and_quoting() {
    let env = create_global_env();

    for literal in ["42", "-7", "()", "t"] {
        assert_eq!(run(literal, &env).unwrap(), parse(literal).unwrap(), "{literal}");
    }

    // 'x yields x unevaluated, for atoms and lists alike
    assert_eq!(run("'undefined-symbol", &env).unwrap(), sym("undefined-symbol"));
    assert_eq!(
        run("'(car (1 2))", &env).unwrap().to_string(),
        "(car (1 2))"
    );

    // An unquote inside a quote evaluates its operand
    assert_eq!(run("'(a `(car '(1 2)))", &env).unwrap(), val([sym("a"), val(1)]));
    assert_eq!(run("'`(cdr '(1 2))", &env).unwrap(), val([2]));
}

#[test]
fn dotted_pairs_print_with_a_dot() {
    let env = create_global_env();
    assert_eq!(printed("(cons 1 2)", &env), "(1 . 2)");
    assert_eq!(printed("(cons 1 (cons 2 3))", &env), "(1 2 . 3)");
    assert_eq!(printed("(cdr '(1 . 2))", &env), "2");
    assert_eq!(printed("(cons 1 ())", &env), "(1)");
}

#[test]
fn closures_capture_their_definition_environment() {
    let env = create_standard_env();

    // The inner lambda keeps x = 1 even though the caller binds x = 5
    let source = "((lambda (f x) (f)) ((lambda (x) (lambda () x)) 1) 5)";
    assert_eq!(run(source, &env).unwrap(), val(1));

    // Shadowing is local to the body
    let source = "((lambda (x) (cons ((lambda (x) x) 2) x)) 1)";
    assert_eq!(run(source, &env).unwrap(), Value::cons(val(2), val(1)));
}

#[test]
fn environments_are_never_mutated_by_evaluation() {
    let env = create_standard_env().extend("x", val(1));
    let before = env.len();

    run("(label x 2 x)", &env).unwrap();
    run("((lambda (x) x) 3)", &env).unwrap();

    assert_eq!(env.len(), before);
    assert_eq!(run("x", &env).unwrap(), val(1));
}

#[test]
fn macros_with_rest_parameters() {
    let env = create_standard_env();
    let cases = [
        ("((macro (f (args)) '(`f . `args)) + 1 2 3)", "(+ 1 2 3)"),
        ("((macro ((xs)) xs) 1 2)", "(1 2)"),
        ("((macro (x (rest)) rest) 1 2)", "(2)"),
        (
            "((macro (x (rest)) rest) 1)",
            "<error: ArityError: macro wants at least 2 arg(s), got 1>",
        ),
        // Arguments reach the macro unevaluated
        (
            "(label swap (macro (x y) '(`y `x)) (swap 1 (swap 2 3)))",
            "((swap 2 3) 1)",
        ),
        ("((macro (x) x))", "<error: ArityError: macro wants 1 arg(s), got 0>"),
    ];
    for (source, expected) in cases {
        assert_eq!(printed(source, &env), expected, "{source}");
    }
}

#[test]
fn apply_calls_with_evaluated_arguments() {
    let env = create_standard_env();
    assert_eq!(run("(apply cons '(1 (2)))", &env).unwrap(), val([1, 2]));
    assert_eq!(run("(apply + '(1 2 3))", &env).unwrap(), val(6));
    assert_eq!(
        run("(apply (lambda (x) (cons x ())) '(a))", &env).unwrap(),
        val([sym("a")])
    );
    // Arguments are passed as data, so a symbol is not looked up again
    assert_eq!(run("(apply (lambda (x) x) '(nope))", &env).unwrap(), sym("nope"));
    assert_eq!(
        run("((lambda (x y) (if (eq y 'done) x (apply recur '(y done)))) 1 2)", &env).unwrap(),
        sym("y")
    );
}

#[test]
fn errors_propagate_to_the_top() {
    let env = create_standard_env();
    let cases = [
        ("(car (error boom))", "<error: boom>"),
        ("(cons 1 (undefined))", "<error: symbol not bound: undefined>"),
        ("(1 2)", "<error: calling non-function: 1>"),
        ("(recur 1)", "<error: recur: no caller>"),
        ("(label 1 2 3)", "<error: label non-symbol binding: 1>"),
        ("(lambda (1) 1)", "<error: non-symbol parameter: 1>"),
        ("(car 1 2)", "<error: ArityError: car wants 1 arg(s), got 2>"),
        (
            "((lambda (x y) x) 1)",
            "<error: ArityError: lambda wants 2 arg(s), got 1>",
        ),
        ("(if t (error yes) (error no))", "<error: yes>"),
        ("(if () (error yes) 'fine)", "fine"),
    ];
    for (source, expected) in cases {
        assert_eq!(printed(source, &env), expected, "{source}");
    }
}

#[test]
fn several_forms_on_one_line() {
    let env = create_standard_env();
    let forms = parse_all("(car '(1 2)) ; first\n(cdr '(1 2)) 'done").unwrap();
    let results: Vec<String> = forms
        .iter()
        .map(|form| eval(form, &env).unwrap().to_string())
        .collect();
    assert_eq!(results, ["1", "(2)", "done"]);
}

#[test]
fn bundled_library_programs() {
    let env = load_standard_env(&Path::new(env!("CARGO_MANIFEST_DIR")).join("lib")).unwrap();
    let cases = [
        ("(map cadr '((1 2) (3 4)))", val([2, 4])),
        ("(append (map not '(t ())) '(x))", val([nil(), sym("t"), sym("x")])),
        ("(null (cdr '(1)))", sym("t")),
        ("(apply append '((1) (2 3)))", val([1, 2, 3])),
    ];
    for (source, expected) in cases {
        assert_eq!(run(source, &env).unwrap(), expected, "{source}");
    }
}

#[test]
fn bounded_interpreter_stops_runaway_programs() {
    let env = create_standard_env();
    let mut interpreter = Interpreter::with_config(EvalConfig {
        max_depth: Some(100),
        ..EvalConfig::bounded()
    });

    let forever = parse("((lambda (n) (recur (+ n 1))) 0)").unwrap();
    let err = interpreter.eval(&forever, &env).unwrap_err();
    assert!(matches!(err, Error::LimitExceeded(_)), "{err}");

    // The interpreter is reusable after hitting a limit
    let fine = parse("(cons 1 '(2))").unwrap();
    assert_eq!(interpreter.eval(&fine, &env).unwrap(), val([1, 2]));
}

#[test]
fn trace_records_calls_and_recursion() {
    let env = create_standard_env();
    let mut interpreter = Interpreter::with_config(EvalConfig {
        trace: true,
        ..EvalConfig::default()
    });

    let expr = parse("((lambda (n) (if (eq n 0) 'done (recur (- n 1)))) 1)").unwrap();
    assert_eq!(interpreter.eval(&expr, &env).unwrap(), sym("done"));

    let trace = interpreter.take_trace().unwrap();
    let lines = trace.lines();
    assert!(lines[0].starts_with("call (lambda (n) (if"), "{trace}");
    assert_eq!(lines[1], "call (lambda 1)");
    assert!(lines.iter().any(|line| line.trim() == "recur lambda"), "{trace}");
    assert!(lines.iter().any(|line| line.trim() == "call (- 1 1)"), "{trace}");
    assert!(interpreter.take_trace().is_none());

    let quiet = Interpreter::new().take_trace();
    assert!(quiet.is_none());
}
