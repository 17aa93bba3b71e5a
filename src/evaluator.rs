use crate::ast::{Closure, ClosureKind, Function, HostFunction, Value, sym};
use crate::builtinops::{OpKind, find_op, get_builtin_ops, register_arithmetic};
use crate::intooperation::{IntoOperation, IntoVariadicOperation, OperationFn};
use crate::{Arity, DEFAULT_MAX_EVAL_DEPTH, DEFAULT_MAX_EVAL_STEPS, Error};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// One link of a binding chain. Never mutated once shared.
struct Binding {
    symbol: String,
    value: Value,
    parent: Option<Arc<Binding>>,
}

impl Drop for Binding {
    // Unlink uniquely-owned ancestors one at a time so that dropping a long
    // chain does not recurse once per node.
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut binding) => next = binding.parent.take(),
                Err(_) => break,
            }
        }
    }
}

/// Lexical environment: an immutable, shared chain of bindings.
///
/// Extending an environment yields a new head and leaves every existing
/// handle untouched, so closures can capture environments freely.
/// Lookup walks from the head to the root and the first match wins.
#[derive(Clone, Default)]
pub struct Environment {
    head: Option<Arc<Binding>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment { head: None }
    }

    /// New environment with `symbol` bound on top of this one
    pub fn extend(&self, symbol: impl Into<String>, value: Value) -> Environment {
        Environment {
            head: Some(Arc::new(Binding {
                symbol: symbol.into(),
                value,
                parent: self.head.clone(),
            })),
        }
    }

    /// Rebind this handle to `self.extend(symbol, value)`.
    ///
    /// Clones taken before the call still see the old chain.
    pub fn define(&mut self, symbol: impl Into<String>, value: Value) {
        *self = self.extend(symbol, value);
    }

    pub fn get(&self, symbol: &str) -> Option<&Value> {
        self.iter()
            .find(|(name, _)| *name == symbol)
            .map(|(_, value)| value)
    }

    /// Value bound to `symbol`, or `SymbolNotBound`
    pub fn resolve(&self, symbol: &str) -> Result<Value, Error> {
        self.get(symbol)
            .cloned()
            .ok_or_else(|| Error::SymbolNotBound(symbol.to_owned()))
    }

    /// Splice all of `other`'s bindings on top of this chain, keeping their
    /// relative shadowing order.
    pub fn extend_all(&self, other: &Environment) -> Environment {
        let pending: Vec<(&str, &Value)> = other.iter().collect();
        pending
            .into_iter()
            .rev()
            .fold(self.clone(), |env, (symbol, value)| {
                env.extend(symbol, value.clone())
            })
    }

    /// All bindings from head to root, shadowed ones included
    pub fn iter(&self) -> Bindings<'_> {
        Bindings {
            cursor: self.head.as_deref(),
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Visible bindings only, sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut seen = HashSet::new();
        let mut result: Vec<(String, Value)> = self
            .iter()
            .filter(|(name, _)| seen.insert(*name))
            .map(|(name, value)| (name.to_owned(), value.clone()))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    /// The whole chain, shadowed bindings included, as an association list
    /// `((sym . value) ...)`, head first
    pub fn to_alist(&self) -> Value {
        self.iter()
            .map(|(name, value)| Value::cons(sym(name), value.clone()))
            .collect()
    }

    fn bind_host(&mut self, name: &str, arity: Arity, func: Arc<OperationFn>) {
        let host = HostFunction {
            id: name.to_owned(),
            arity,
            func,
        };
        self.define(name, Value::Function(Function::Host(Arc::new(host))));
    }

    /// Register a raw host function that works on evaluated `&[Value]`
    /// arguments directly. It accepts any number of arguments.
    ///
    /// # Example
    /// ```
    /// use dabble::evaluator::{Environment, create_global_env};
    /// use dabble::ast::Value;
    /// use dabble::Error;
    ///
    /// fn count_args(args: &[Value]) -> Result<Value, Error> {
    ///     Ok(Value::Number(args.len() as i64))
    /// }
    ///
    /// let mut env = create_global_env();
    /// env.register_builtin_function("count-args", count_args);
    /// // Now (count-args 1 2 3) evaluates to 3
    /// ```
    pub fn register_builtin_function(
        &mut self,
        name: &str,
        func: fn(&[Value]) -> Result<Value, Error>,
    ) {
        let wrapped: Arc<OperationFn> = Arc::new(move |args: Vec<Value>| func(&args));
        self.bind_host(name, Arity::Any, wrapped);
    }

    /// Register a strongly-typed Rust function as a host function using
    /// automatic argument extraction and result conversion.
    ///
    /// ```rust,ignore
    /// fn add(a: i64, b: i64) -> i64 { a + b }
    /// let mut env = dabble::evaluator::create_global_env();
    /// env.register_builtin_operation::<_, (i64, i64), i64>("add", add);
    /// ```
    ///
    /// Supported parameter types:
    /// - `i64` (number)
    /// - `&str` (borrowed symbol name)
    /// - `Value` (owned access to the raw value)
    /// - `ValueListIterator<'_>` (elements of a proper-list argument)
    /// - `NumIterator<'_>` (numeric elements of a proper-list argument)
    ///
    /// Supported return types are any `R: Into<Value>` and `Result<R, E>`
    /// with `E: Into<Error>`; a plain `&str` or `String` error becomes
    /// `Error::EvalError`.
    ///
    /// Arity comes from the Rust signature and is checked before the
    /// arguments are evaluated.
    pub fn register_builtin_operation<F, Args, R>(&mut self, name: &str, func: F)
    where
        F: IntoOperation<Args, R> + 'static,
    {
        let wrapped = func.into_operation();
        self.bind_host(name, F::ARITY, wrapped);
    }

    /// Register a variadic host function with explicit arity metadata.
    ///
    /// For Rust signatures that end in a rest parameter:
    /// - all arguments as values: `fn(ValueListIterator<'_>) -> R`
    /// - numeric tail: `fn(NumIterator<'_>) -> R`
    /// - fixed prefix plus numeric tail: `fn(i64, NumIterator<'_>) -> R`
    ///
    /// The minimum argument count of a variadic function is not derivable
    /// from its type, hence the explicit [`Arity`].
    pub fn register_variadic_builtin_operation<F, Args, R>(
        &mut self,
        name: &str,
        arity: Arity,
        func: F,
    ) where
        F: IntoVariadicOperation<Args, R> + 'static,
    {
        let wrapped = func.into_variadic_operation();
        self.bind_host(name, arity, wrapped);
    }
}

impl PartialEq for Environment {
    /// Two handles are equal when they share the same head node
    fn eq(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<&str> = self.iter().map(|(name, _)| name).collect();
        f.debug_struct("Environment")
            .field("symbols", &symbols)
            .finish()
    }
}

/// Iterator over `(symbol, value)` pairs of an [`Environment`], head first
pub struct Bindings<'a> {
    cursor: Option<&'a Binding>,
}

impl<'a> Iterator for Bindings<'a> {
    type Item = (&'a str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor?;
        self.cursor = node.parent.as_deref();
        Some((node.symbol.as_str(), &node.value))
    }
}

/// Evaluation limits and tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalConfig {
    /// Maximum nesting of evaluation steps; `None` is unbounded
    pub max_depth: Option<usize>,
    /// Maximum number of evaluation steps per top-level `eval`
    pub max_steps: Option<u64>,
    /// Record a [`Trace`] of calls, expansions and recursions
    pub trace: bool,
}

impl EvalConfig {
    /// Limits suited to interactive use
    pub fn bounded() -> Self {
        EvalConfig {
            max_depth: Some(DEFAULT_MAX_EVAL_DEPTH),
            max_steps: Some(DEFAULT_MAX_EVAL_STEPS),
            trace: false,
        }
    }
}

/// Lines recorded while tracing, indented by active call frames
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    lines: Vec<String>,
}

impl Trace {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quoting {
    Off,
    On,
}

/// Whether the arguments handed to `invoke` still need evaluating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArgMode {
    Unevaluated,
    Evaluated,
}

/// Evaluator state for one top-level evaluation at a time.
///
/// Holds the stack of active closures used by `recur`, the optional trace
/// and the limit counters.
#[derive(Debug, Default)]
pub struct Interpreter {
    config: EvalConfig,
    frames: Vec<Function>,
    trace: Option<Trace>,
    depth: usize,
    steps: u64,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Interpreter {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EvalConfig) {
        self.config = config;
    }

    /// Evaluate `expr` in `env`.
    ///
    /// Starts from an empty call stack, and a fresh trace when tracing is on.
    pub fn eval(&mut self, expr: &Value, env: &Environment) -> Result<Value, Error> {
        self.frames.clear();
        self.depth = 0;
        self.steps = 0;
        self.trace = self.config.trace.then(Trace::default);
        self.eval_in(expr, env, Quoting::Off)
    }

    /// Like [`Interpreter::eval`], folding a failure into a [`Value::Error`]
    pub fn eval_to_value(&mut self, expr: &Value, env: &Environment) -> Value {
        self.eval(expr, env).unwrap_or_else(Value::from)
    }

    /// Trace of the last evaluation, if tracing was on
    pub fn take_trace(&mut self) -> Option<Trace> {
        self.trace.take()
    }

    fn eval_in(&mut self, expr: &Value, env: &Environment, quoting: Quoting) -> Result<Value, Error> {
        self.enter()?;
        let result = self.dispatch(expr, env, quoting);
        self.depth -= 1;
        result
    }

    fn enter(&mut self) -> Result<(), Error> {
        self.steps += 1;
        if let Some(max) = self.config.max_steps
            && self.steps > max
        {
            return Err(Error::LimitExceeded(format!(
                "evaluation step limit of {max} exceeded"
            )));
        }
        if let Some(max) = self.config.max_depth
            && self.depth >= max
        {
            return Err(Error::LimitExceeded(format!(
                "evaluation depth limit of {max} exceeded"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn dispatch(&mut self, expr: &Value, env: &Environment, quoting: Quoting) -> Result<Value, Error> {
        match expr {
            Value::Number(_) | Value::Nil | Value::Function(_) | Value::Error(_) => {
                Ok(expr.clone())
            }
            Value::Symbol(name) => match quoting {
                Quoting::On => Ok(expr.clone()),
                Quoting::Off => env.resolve(name),
            },
            Value::Pair(head, rest) => match quoting {
                Quoting::On => self.eval_quoted_list(expr, env),
                Quoting::Off => self.call(head, rest, env),
            },
            Value::Quoted(inner) => match quoting {
                Quoting::On => Ok(Value::quoted(self.eval_in(inner, env, Quoting::On)?)),
                Quoting::Off => self.eval_in(inner, env, Quoting::On),
            },
            Value::Unquoted(inner) => self.eval_in(inner, env, Quoting::Off),
        }
    }

    /// Rebuild a quoted list, evaluating only its unquoted islands
    fn eval_quoted_list(&mut self, list: &Value, env: &Environment) -> Result<Value, Error> {
        let mut items = Vec::new();
        let mut cursor = list;
        while let Value::Pair(first, rest) = cursor {
            items.push(self.eval_in(first, env, Quoting::On)?);
            cursor = rest;
        }
        let tail = self.eval_in(cursor, env, Quoting::On)?;
        Ok(Value::list_with_tail(items, tail))
    }

    /// Evaluate a sub-expression whose result is consumed by a form; an
    /// `Error` value stops the form like any other failure.
    fn eval_operand(&mut self, expr: &Value, env: &Environment) -> Result<Value, Error> {
        let value = self.eval_in(expr, env, Quoting::Off)?;
        if let Value::Error(e) = &value {
            return Err(Error::clone(e));
        }
        Ok(value)
    }

    fn operands(&mut self, args: &[Value], env: &Environment, mode: ArgMode) -> Result<Vec<Value>, Error> {
        match mode {
            ArgMode::Evaluated => Ok(args.to_vec()),
            ArgMode::Unevaluated => args.iter().map(|arg| self.eval_operand(arg, env)).collect(),
        }
    }

    /// Evaluate `expr` to something callable
    fn eval_callee(&mut self, expr: &Value, env: &Environment) -> Result<Function, Error> {
        match &self.eval_operand(expr, env)? {
            Value::Function(func) => Ok(func.clone()),
            other => Err(Error::NotCallable(other.to_string())),
        }
    }

    fn call(&mut self, head: &Value, rest: &Value, env: &Environment) -> Result<Value, Error> {
        let func = self.eval_callee(head, env)?;
        let args = rest.expect_list("argument list")?;
        self.invoke(&func, &args, env, ArgMode::Unevaluated)
    }

    /// The innermost active closure, which `recur` re-invokes
    fn recur_target(&mut self) -> Result<Function, Error> {
        let target = self.frames.last().cloned().ok_or(Error::NoCaller)?;
        self.note("recur", || target.name());
        Ok(target)
    }

    pub(crate) fn invoke(
        &mut self,
        func: &Function,
        args: &[Value],
        env: &Environment,
        mode: ArgMode,
    ) -> Result<Value, Error> {
        match func {
            Function::Builtin(op) => {
                op.validate_arity(args.len())?;
                match &op.op_kind {
                    OpKind::Function(f) => {
                        let values = self.operands(args, env, mode)?;
                        self.note("call", || call_text(op.id, &values));
                        f(values)
                    }
                    OpKind::SpecialForm(form) => {
                        self.note("call", || call_text(op.id, args));
                        form(args, env, self)
                    }
                }
            }
            Function::Host(host) => {
                host.arity.validate(&host.id, args.len())?;
                let values = self.operands(args, env, mode)?;
                self.note("call", || call_text(&host.id, &values));
                (host.func)(values)
            }
            Function::Closure(closure) => self.apply_closure(func, closure, args, env, mode),
        }
    }

    fn apply_closure(
        &mut self,
        func: &Function,
        closure: &Closure,
        args: &[Value],
        env: &Environment,
        mode: ArgMode,
    ) -> Result<Value, Error> {
        let name = func.name();
        closure.arity().validate(&name, args.len())?;

        let mut local = closure.env.clone();
        if let Some(own_name) = &closure.name {
            local.define(own_name.as_str(), Value::Function(func.clone()));
        }

        match closure.kind {
            ClosureKind::Lambda => {
                let values = self.operands(args, env, mode)?;
                self.note("call", || call_text(&name, &values));
                for (param, value) in closure.params.iter().zip(values) {
                    local.define(param.as_str(), value);
                }
                self.with_frame(func, |interp| {
                    interp.eval_in(&closure.body, &local, Quoting::Off)
                })
            }
            ClosureKind::Macro => {
                self.note("call", || call_text(&name, args));
                let fixed = if closure.rest {
                    closure.params.len().saturating_sub(1)
                } else {
                    closure.params.len()
                };
                for (param, arg) in closure.params.iter().take(fixed).zip(args) {
                    local.define(param.as_str(), arg.clone());
                }
                if let Some(rest_param) = closure.params.get(fixed) {
                    let rest: Value = args.get(fixed..).unwrap_or(&[]).iter().cloned().collect();
                    local.define(rest_param.as_str(), rest);
                }

                let expansion = self.with_frame(func, |interp| {
                    interp.eval_in(&closure.body, &local, Quoting::Off)
                })?;
                self.note("expand", || format!("{name} => {expansion}"));
                self.eval_in(&Value::quoted(expansion), env, Quoting::Off)
            }
        }
    }

    /// Run `body` with `func` as the innermost active closure
    fn with_frame<T>(
        &mut self,
        func: &Function,
        body: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.frames.push(func.clone());
        let result = body(self);
        self.frames.pop();
        result
    }

    fn note(&mut self, event: &str, text: impl FnOnce() -> String) {
        let enabled = tracing::enabled!(target: "dabble::eval", tracing::Level::TRACE);
        if !enabled && self.trace.is_none() {
            return;
        }
        let line = text();
        tracing::trace!(target: "dabble::eval", depth = self.depth, "{event} {line}");
        if let Some(trace) = &mut self.trace {
            let indent = self.frames.len() * 2;
            trace.lines.push(format!("{:indent$}{event} {line}", ""));
        }
    }
}

fn call_text(name: &str, args: &[Value]) -> String {
    let args: String = args.iter().map(|arg| format!(" {arg}")).collect();
    format!("({name}{args})")
}

/// Evaluate an expression with a fresh, unbounded interpreter
pub fn eval(expr: &Value, env: &Environment) -> Result<Value, Error> {
    Interpreter::new().eval(expr, env)
}

//
// Special forms
//

pub(crate) fn eval_quote(
    args: &[Value],
    _env: &Environment,
    _interp: &mut Interpreter,
) -> Result<Value, Error> {
    match args {
        [expr] => Ok(Value::quoted(expr.clone())),
        _ => Err(Error::arity_error("quote", Arity::Exact(1), args.len())),
    }
}

pub(crate) fn eval_unquote(
    args: &[Value],
    _env: &Environment,
    _interp: &mut Interpreter,
) -> Result<Value, Error> {
    match args {
        [expr] => Ok(Value::unquoted(expr.clone())),
        _ => Err(Error::arity_error("unquote", Arity::Exact(1), args.len())),
    }
}

/// Only the selected branch is evaluated; any non-nil condition is true
pub(crate) fn eval_if(
    args: &[Value],
    env: &Environment,
    interp: &mut Interpreter,
) -> Result<Value, Error> {
    match args {
        [condition_expr, then_expr, else_expr] => {
            let condition = interp.eval_operand(condition_expr, env)?;
            if condition.is_nil() {
                interp.eval_in(else_expr, env, Quoting::Off)
            } else {
                interp.eval_in(then_expr, env, Quoting::Off)
            }
        }
        _ => Err(Error::arity_error("if", Arity::Exact(3), args.len())),
    }
}

/// `(label name value body)`: evaluate `body` with `name` bound to `value`.
/// An anonymous closure takes on the name, so its body can call itself.
pub(crate) fn eval_label(
    args: &[Value],
    env: &Environment,
    interp: &mut Interpreter,
) -> Result<Value, Error> {
    match args {
        [Value::Symbol(name), value_expr, body] => {
            let mut value = interp.eval_operand(value_expr, env)?;
            if let Value::Function(Function::Closure(closure)) = &value
                && closure.name.is_none()
            {
                value = Value::Function(Function::Closure(Arc::new(closure.named(name))));
            }
            interp.eval_in(body, &env.extend(name.as_str(), value), Quoting::Off)
        }
        [other, _, _] => Err(Error::NonSymbolBinding(other.to_string())),
        _ => Err(Error::arity_error("label", Arity::Exact(3), args.len())),
    }
}

fn symbol_params(list: &Value) -> Result<Vec<String>, Error> {
    let items = list
        .to_vec()
        .ok_or_else(|| Error::NonSymbolParam(list.to_string()))?;
    items
        .iter()
        .map(|param| match param {
            Value::Symbol(name) => Ok(name.clone()),
            other => Err(Error::NonSymbolParam(other.to_string())),
        })
        .collect()
}

pub(crate) fn eval_lambda(
    args: &[Value],
    env: &Environment,
    _interp: &mut Interpreter,
) -> Result<Value, Error> {
    match args {
        [params, body] => {
            let params = symbol_params(params)?;
            Ok(Value::Function(Function::Closure(Arc::new(Closure {
                kind: ClosureKind::Lambda,
                params,
                rest: false,
                body: body.clone(),
                env: env.clone(),
                name: None,
            }))))
        }
        _ => Err(Error::arity_error("lambda", Arity::Exact(2), args.len())),
    }
}

/// `(macro (a b (rest)) body)`: the last parameter may be wrapped in a list
/// to collect the remaining arguments, of which there must be at least one.
pub(crate) fn eval_macro(
    args: &[Value],
    env: &Environment,
    _interp: &mut Interpreter,
) -> Result<Value, Error> {
    match args {
        [params, body] => {
            let items = params
                .to_vec()
                .ok_or_else(|| Error::NonSymbolParam(params.to_string()))?;
            if items.is_empty() {
                return Err(Error::arity_error("macro", Arity::AtLeast(1), 0));
            }

            let last = items.len() - 1;
            let mut names = Vec::with_capacity(items.len());
            let mut rest = false;
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Symbol(name) => names.push(name.clone()),
                    Value::Pair(first, tail) if i == last && tail.is_nil() => match first.as_ref() {
                        Value::Symbol(name) => {
                            names.push(name.clone());
                            rest = true;
                        }
                        other => return Err(Error::NonSymbolParam(other.to_string())),
                    },
                    other => return Err(Error::NonSymbolParam(other.to_string())),
                }
            }

            Ok(Value::Function(Function::Closure(Arc::new(Closure {
                kind: ClosureKind::Macro,
                params: names,
                rest,
                body: body.clone(),
                env: env.clone(),
                name: None,
            }))))
        }
        _ => Err(Error::arity_error("macro", Arity::Exact(2), args.len())),
    }
}

fn is_recur(func: &Function) -> bool {
    match func {
        Function::Builtin(op) => find_op("recur").is_some_and(|recur| std::ptr::eq(*op, recur)),
        _ => false,
    }
}

/// `(apply f args)`: call `f` with the elements of `args` as already
/// evaluated arguments. `(apply recur args)` hands them to the innermost
/// closure the same way.
pub(crate) fn eval_apply(
    args: &[Value],
    env: &Environment,
    interp: &mut Interpreter,
) -> Result<Value, Error> {
    match args {
        [func_expr, list_expr] => {
            let func = interp.eval_callee(func_expr, env)?;
            let values = interp
                .eval_operand(list_expr, env)?
                .expect_list("apply argument list")?;
            let target = if is_recur(&func) {
                interp.recur_target()?
            } else {
                func
            };
            interp.invoke(&target, &values, env, ArgMode::Evaluated)
        }
        _ => Err(Error::arity_error("apply", Arity::Exact(2), args.len())),
    }
}

pub(crate) fn eval_error(
    args: &[Value],
    _env: &Environment,
    _interp: &mut Interpreter,
) -> Result<Value, Error> {
    match args {
        [Value::Symbol(reason)] => Err(Error::User(reason.clone())),
        [other] => Err(Error::TypeMismatch(format!(
            "error wants a symbol, got {other}"
        ))),
        _ => Err(Error::arity_error("error", Arity::Exact(1), args.len())),
    }
}

/// Re-invoke the innermost active closure with new arguments
pub(crate) fn eval_recur(
    args: &[Value],
    env: &Environment,
    interp: &mut Interpreter,
) -> Result<Value, Error> {
    let target = interp.recur_target()?;
    interp.invoke(&target, args, env, ArgMode::Unevaluated)
}

/// Create a global environment: `t` plus every primitive under its id
pub fn create_global_env() -> Environment {
    let mut env = Environment::new();
    env.define("t", Value::truthy());
    for builtin_op in get_builtin_ops() {
        env.define(builtin_op.id, Value::Function(Function::Builtin(builtin_op)));
    }
    env
}

/// The global environment plus the arithmetic host set
pub fn create_standard_env() -> Environment {
    let mut env = create_global_env();
    register_arithmetic(&mut env);
    env
}
